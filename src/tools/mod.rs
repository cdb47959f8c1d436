//! Tool system for the agent.
//!
//! Two local tools are always available (`wait_0_1_seconds` and
//! `download_file`); every tool the browser MCP server advertises is added
//! next to them through [`McpToolProxy`].

mod download;
mod mcp;
mod wait;

pub use download::{artifact_file_name, DateSource, DownloadFile};
pub use mcp::McpToolProxy;
pub use wait::{WaitBriefly, WAIT_DURATION};

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::llm::{FunctionDefinition, ToolDefinition};
use crate::mcp::McpClient;

/// Information about a tool for display purposes.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// Arguments the model sent do not fit the tool's schema.
///
/// The agent loop reports this back to the model instead of aborting the
/// attempt; any other tool error aborts it.
#[derive(Debug, thiserror::Error)]
#[error("Invalid arguments for {tool}: {reason}")]
pub struct InvalidArguments {
    pub tool: String,
    pub reason: String,
}

impl InvalidArguments {
    pub fn new(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            reason: reason.into(),
        }
    }
}

/// Trait for implementing tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool.
    fn name(&self) -> &str;

    /// A description of what this tool does.
    fn description(&self) -> &str;

    /// JSON schema for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: Value) -> anyhow::Result<String>;
}

/// Registry of available tools.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry (no built-in tools).
    pub fn empty() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registry with the local wait and download tools.
    pub fn with_local_tools(downloads_dir: &Path) -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(WaitBriefly));
        registry.register(Arc::new(DownloadFile::new(downloads_dir)));
        registry
    }

    /// Add a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Discover the server's tools and register a proxy for each.
    ///
    /// Local tools keep precedence over remote tools with the same name.
    /// Returns the number of remote tools registered.
    pub async fn register_mcp_tools(&mut self, client: Arc<McpClient>) -> anyhow::Result<usize> {
        let descriptors = client.list_tools().await?;
        let mut added = 0;
        for descriptor in descriptors {
            if self.has_tool(&descriptor.name) {
                tracing::warn!(
                    tool = %descriptor.name,
                    server = client.name(),
                    "Remote tool shadowed by a local tool"
                );
                continue;
            }
            self.register(Arc::new(McpToolProxy::new(Arc::clone(&client), descriptor)));
            added += 1;
        }
        tracing::info!(remote = added, total = self.tools.len(), "Tool registry ready");
        Ok(added)
    }

    /// List all available tools, sorted by name.
    pub fn list_tools(&self) -> Vec<ToolInfo> {
        let mut tools: Vec<_> = self
            .tools
            .values()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Check if a tool exists by name.
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Get tool schemas in LLM-compatible format, sorted by name so the
    /// request body is stable across runs.
    pub fn get_tool_schemas(&self) -> Vec<ToolDefinition> {
        let mut schemas: Vec<_> = self
            .tools
            .values()
            .map(|t| ToolDefinition {
                tool_type: "function".to_string(),
                function: FunctionDefinition {
                    name: t.name().to_string(),
                    description: t.description().to_string(),
                    parameters: t.parameters_schema(),
                },
            })
            .collect();
        schemas.sort_by(|a, b| a.function.name.cmp(&b.function.name));
        schemas
    }

    /// Execute a tool by name.
    pub async fn execute(&self, name: &str, args: Value) -> anyhow::Result<String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown tool: {}", name))?;

        tool.execute(args).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::empty()
    }
}
