//! Tools backed by the browser MCP server.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::Tool;
use crate::mcp::{McpClient, McpError, McpToolDescriptor};

/// Forwards calls for one remote tool to the MCP session.
pub struct McpToolProxy {
    client: Arc<McpClient>,
    descriptor: McpToolDescriptor,
}

impl McpToolProxy {
    pub fn new(client: Arc<McpClient>, descriptor: McpToolDescriptor) -> Self {
        Self { client, descriptor }
    }
}

#[async_trait]
impl Tool for McpToolProxy {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn description(&self) -> &str {
        &self.descriptor.description
    }

    fn parameters_schema(&self) -> Value {
        // Some servers omit the schema for argument-less tools; providers
        // reject a null `parameters`.
        if self.descriptor.input_schema.is_object() {
            self.descriptor.input_schema.clone()
        } else {
            json!({"type": "object", "properties": {}})
        }
    }

    async fn execute(&self, args: Value) -> anyhow::Result<String> {
        let args = if args.is_null() { json!({}) } else { args };
        match self.client.call_tool(&self.descriptor.name, args).await {
            Ok(output) => Ok(output),
            // The server rejected the call (bad params, unknown tool); the
            // session is still usable, so the model gets to try again.
            Err(e @ McpError::Rpc { .. }) => {
                tracing::debug!(tool = %self.descriptor.name, "MCP call rejected: {}", e);
                Ok(format!("Error: {}", e))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::testing::fake_server;

    fn descriptor(name: &str, schema: Value) -> McpToolDescriptor {
        McpToolDescriptor {
            name: name.to_string(),
            description: format!("{} tool", name),
            input_schema: schema,
        }
    }

    #[tokio::test]
    async fn forwards_to_server() {
        let client = Arc::new(fake_server());
        let proxy = McpToolProxy::new(
            client,
            descriptor("browser_click_and_extract_url", json!({"type": "object"})),
        );

        let output = proxy
            .execute(json!({"buttonText": "Descargar", "selector": "form > button"}))
            .await
            .unwrap();
        assert_eq!(output, "https://example.test/certificado.pdf");
    }

    #[tokio::test]
    async fn rejected_calls_come_back_as_text() {
        let client = Arc::new(fake_server());
        let proxy = McpToolProxy::new(client, descriptor("browser_type", json!({"type": "object"})));

        let output = proxy.execute(json!({"text": "hola"})).await.unwrap();
        assert_eq!(output, "Error: JSON-RPC error -32602: Unknown tool: browser_type");
    }

    #[tokio::test]
    async fn closed_session_is_still_an_error() {
        let client = Arc::new(fake_server());
        client.shutdown().await;
        let proxy = McpToolProxy::new(client, descriptor("browser_click", json!({"type": "object"})));

        let err = proxy.execute(json!({"selector": "#a"})).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<McpError>(), Some(McpError::Closed)));
    }

    #[test]
    fn missing_schema_falls_back_to_empty_object() {
        let client = Arc::new(McpClient::new(
            "unused",
            tokio::io::BufReader::new(tokio::io::empty()),
            tokio::io::sink(),
        ));
        let proxy = McpToolProxy::new(client, descriptor("browser_snapshot", Value::Null));
        assert_eq!(proxy.parameters_schema()["type"], "object");
        assert_eq!(proxy.name(), "browser_snapshot");
        assert_eq!(proxy.description(), "browser_snapshot tool");
    }
}
