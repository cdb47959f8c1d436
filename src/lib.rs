//! # sura_certs
//!
//! LLM agent that logs into the Seguros SURA portal and downloads the ARL
//! and EPS affiliation certificates.
//!
//! ## Architecture
//!
//! ```text
//!   main ──► app::run ──► McpClient (Playwright over stdio)
//!                │
//!                ▼
//!          Orchestrator ── attempt 1..4, models A, B, A, B
//!                │
//!                ▼
//!           ToolAgent ──► OpenRouterClient (chat completions)
//!                │
//!                ▼
//!          ToolRegistry ── wait_0_1_seconds, download_file, browser_* (remote)
//! ```
//!
//! ## Modules
//! - `config`: environment-driven configuration
//! - `task`: prompt, success sentinel and success predicate
//! - `orchestrator`: alternating bounded retry
//! - `agent`: tool-calling loop
//! - `llm`: chat-completions client
//! - `mcp`: MCP stdio client for the browser tool server
//! - `tools`: local tools and MCP proxies

pub mod agent;
pub mod app;
pub mod config;
pub mod llm;
pub mod mcp;
pub mod orchestrator;
pub mod task;
pub mod tools;

pub use config::Config;
pub use orchestrator::{Orchestrator, RunOutcome};
