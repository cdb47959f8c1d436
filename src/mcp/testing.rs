//! In-memory stand-in for the Playwright MCP server.

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::McpClient;

fn tool(name: &str, description: &str, properties: Value) -> Value {
    json!({
        "name": name,
        "description": description,
        "inputSchema": {"type": "object", "properties": properties}
    })
}

fn text_result(text: &str, is_error: bool) -> Value {
    json!({"content": [{"type": "text", "text": text}], "isError": is_error})
}

fn handle(method: &str, params: &Value) -> Result<Value, (i32, String)> {
    match method {
        "initialize" => Ok(json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {"tools": {}},
            "serverInfo": {"name": "fake-playwright", "version": "0.0.1"}
        })),
        "tools/list" => Ok(json!({
            "tools": [
                tool("browser_navigate", "Navigate to a URL", json!({"url": {"type": "string"}})),
                tool("browser_click", "Click an element", json!({"selector": {"type": "string"}})),
                tool(
                    "browser_click_and_extract_url",
                    "Click a button and return the URL it opens",
                    json!({"selector": {"type": "string"}, "buttonText": {"type": "string"}})
                ),
                tool(
                    "browser_click_and_download_authenticated",
                    "Click a button and save the authenticated download",
                    json!({"selector": {"type": "string"}, "buttonText": {"type": "string"}})
                ),
            ]
        })),
        "tools/call" => {
            let name = params["name"].as_str().unwrap_or_default();
            let args = &params["arguments"];
            match name {
                "browser_navigate" => Ok(text_result(
                    &format!("navigated to {}", args["url"].as_str().unwrap_or_default()),
                    false,
                )),
                "browser_click" => {
                    let selector = args["selector"].as_str().unwrap_or_default();
                    if selector == "#nope" {
                        Ok(text_result(&format!("element not found: {}", selector), true))
                    } else {
                        Ok(text_result(&format!("clicked {}", selector), false))
                    }
                }
                "browser_click_and_extract_url" => {
                    Ok(text_result("https://example.test/certificado.pdf", false))
                }
                "browser_click_and_download_authenticated" => {
                    Ok(text_result("saved eps_certificate.pdf", false))
                }
                other => Err((-32602, format!("Unknown tool: {}", other))),
            }
        }
        other => Err((-32601, format!("Method not found: {}", other))),
    }
}

/// Connect a client to a fake server running on an in-memory pipe.
///
/// Before answering `tools/list` the server emits a notification and a
/// `ping` request, so clients must skip and answer those.
pub(crate) fn fake_server() -> McpClient {
    let (client_side, server_side) = tokio::io::duplex(64 * 1024);
    let (server_read, mut server_write) = tokio::io::split(server_side);

    tokio::spawn(async move {
        let mut lines = BufReader::new(server_read).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let Ok(message) = serde_json::from_str::<Value>(&line) else {
                continue;
            };
            let (Some(id), Some(method)) = (message.get("id"), message["method"].as_str()) else {
                continue;
            };

            let mut out = String::new();
            if method == "tools/list" {
                out.push_str(
                    &json!({"jsonrpc": "2.0", "method": "notifications/message", "params": {"level": "info"}})
                        .to_string(),
                );
                out.push('\n');
                out.push_str(&json!({"jsonrpc": "2.0", "id": "srv-1", "method": "ping"}).to_string());
                out.push('\n');
            }

            let reply = match handle(method, &message["params"]) {
                Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
                Err((code, msg)) => {
                    json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": msg}})
                }
            };
            out.push_str(&reply.to_string());
            out.push('\n');

            if server_write.write_all(out.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let (client_read, client_write) = tokio::io::split(client_side);
    McpClient::new("fake-playwright", BufReader::new(client_read), client_write)
}
