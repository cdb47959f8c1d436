//! MCP (Model Context Protocol) client for the browser automation server.
//!
//! The Playwright server runs as a child process and is driven over stdio
//! with JSON-RPC 2.0. One session lives for the whole run: it is started
//! before the first attempt and shut down after the last.

mod client;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::McpClient;
pub use types::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpError {
    #[error("Failed to spawn MCP server '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("MCP I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MCP protocol error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("MCP server closed the connection")]
    Closed,

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i32, message: String },

    #[error("No result in response to {0}")]
    MissingResult(String),
}
