//! MCP client speaking newline-delimited JSON-RPC over a byte stream.
//!
//! Normally the stream is the stdio of a spawned tool server (see
//! [`McpClient::spawn_stdio`]); tests plug in an in-memory duplex pipe.

use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use super::types::*;
use super::McpError;
use crate::config::BrowserServerConfig;

/// MCP protocol version we support
const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// How long a server gets to exit after its stdin is closed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

type Reader = Box<dyn AsyncBufRead + Send + Unpin>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

struct Pipe {
    reader: Reader,
    writer: Writer,
}

/// A connected MCP server.
///
/// Requests are serialized through a single lock: one request is written and
/// its response read before the next request starts.
pub struct McpClient {
    name: String,
    pipe: Mutex<Option<Pipe>>,
    child: Mutex<Option<Child>>,
    request_id: AtomicU64,
}

impl McpClient {
    /// Wrap an existing reader/writer pair. No handshake is performed.
    pub fn new<R, W>(name: impl Into<String>, reader: R, writer: W) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            name: name.into(),
            pipe: Mutex::new(Some(Pipe {
                reader: Box::new(reader),
                writer: Box::new(writer),
            })),
            child: Mutex::new(None),
            request_id: AtomicU64::new(1),
        }
    }

    /// Spawn the tool server process and connect to its stdio.
    ///
    /// The child is killed if the client is dropped without `shutdown`.
    pub async fn spawn_stdio(config: &BrowserServerConfig) -> Result<Self, McpError> {
        let mut child = Command::new(&config.command)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| McpError::Spawn {
                command: config.command.clone(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or(McpError::Closed)?;
        let stdout = child.stdout.take().ok_or(McpError::Closed)?;

        tracing::info!(
            command = %config.command,
            args = ?config.args,
            pid = ?child.id(),
            "Spawned MCP server"
        );

        let client = Self::new(config.command.clone(), BufReader::new(stdout), stdin);
        *client.child.lock().await = Some(child);
        Ok(client)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn next_request_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    async fn write_line(writer: &mut Writer, value: &impl serde::Serialize) -> Result<(), McpError> {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Send a request and wait for the matching response.
    ///
    /// Notifications and stray responses are skipped; server-initiated
    /// requests get a minimal reply so the server does not stall.
    async fn send_request(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        let mut guard = self.pipe.lock().await;
        let pipe = guard.as_mut().ok_or(McpError::Closed)?;

        let id = self.next_request_id();
        Self::write_line(&mut pipe.writer, &JsonRpcRequest::new(id, method, params)).await?;

        let mut line = String::new();
        loop {
            line.clear();
            if pipe.reader.read_line(&mut line).await? == 0 {
                return Err(McpError::Closed);
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let message: JsonRpcMessage = match serde_json::from_str(trimmed) {
                Ok(message) => message,
                Err(e) => {
                    tracing::debug!(server = %self.name, "Skipping non-JSON-RPC line: {}", e);
                    continue;
                }
            };

            if message.answers(id) {
                if let Some(error) = message.error {
                    return Err(McpError::Rpc {
                        code: error.code,
                        message: error.message,
                    });
                }
                return message
                    .result
                    .ok_or_else(|| McpError::MissingResult(method.to_string()));
            }

            if message.is_server_request() {
                let reply = match message.method.as_deref() {
                    Some("ping") => json!({"jsonrpc": "2.0", "id": message.id, "result": {}}),
                    _ => json!({
                        "jsonrpc": "2.0",
                        "id": message.id,
                        "error": {"code": -32601, "message": "Method not found"}
                    }),
                };
                Self::write_line(&mut pipe.writer, &reply).await?;
                continue;
            }

            if let Some(method) = message.method.as_deref() {
                tracing::trace!(server = %self.name, method, "MCP notification");
            }
        }
    }

    async fn notify(&self, method: &str) -> Result<(), McpError> {
        let mut guard = self.pipe.lock().await;
        let pipe = guard.as_mut().ok_or(McpError::Closed)?;
        Self::write_line(&mut pipe.writer, &JsonRpcNotification::new(method)).await
    }

    /// Perform the MCP handshake.
    pub async fn initialize(&self) -> Result<InitializeResult, McpError> {
        let params = InitializeParams {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: json!({}),
            client_info: ClientInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        let result = self
            .send_request("initialize", Some(serde_json::to_value(params)?))
            .await?;
        let init: InitializeResult = serde_json::from_value(result)?;
        self.notify("notifications/initialized").await?;

        tracing::info!(
            server = init.server_info.as_ref().map(|s| s.name.as_str()).unwrap_or("unknown"),
            protocol = %init.protocol_version,
            "MCP server initialized"
        );
        Ok(init)
    }

    /// List every tool the server exposes, following pagination cursors.
    pub async fn list_tools(&self) -> Result<Vec<McpToolDescriptor>, McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let result = self.send_request("tools/list", params).await?;
            let page: McpToolsResponse = serde_json::from_value(result)?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        Ok(tools)
    }

    /// Call a tool and return its text output.
    ///
    /// A result flagged `isError` (element not found, navigation failed) is
    /// not a transport failure: it comes back as `Ok` text prefixed with
    /// `Error:` so the model can react to it.
    pub async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<String, McpError> {
        let params = json!({ "name": tool_name, "arguments": arguments });
        let result = self.send_request("tools/call", Some(params)).await?;
        let response: McpCallToolResponse = serde_json::from_value(result)?;

        if response.is_error {
            tracing::debug!(tool = tool_name, "MCP tool reported an error");
            return Ok(format!("Error: {}", response.text()));
        }
        Ok(response.text())
    }

    /// Close the pipe and stop the server process.
    ///
    /// Closing stdin asks the server to exit; it is killed if it has not
    /// exited within a few seconds. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.pipe.lock().await.take();

        let Some(mut child) = self.child.lock().await.take() else {
            return;
        };
        match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
            Ok(Ok(status)) => tracing::info!(server = %self.name, %status, "MCP server exited"),
            Ok(Err(e)) => tracing::warn!(server = %self.name, "Failed waiting for MCP server: {}", e),
            Err(_) => {
                tracing::warn!(server = %self.name, "MCP server did not exit, killing it");
                if let Err(e) = child.kill().await {
                    tracing::warn!(server = %self.name, "Failed to kill MCP server: {}", e);
                }
            }
        }
    }
}
