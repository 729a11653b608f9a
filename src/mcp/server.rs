// MCP server implementation

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::indexer::Indexer;
use crate::mcp::tools;
use crate::query::engine::QueryEngine;

const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC message
#[derive(Debug, Serialize, Deserialize)]
struct JsonRpcMessage {
    jsonrpc: String,
    id: Option<Value>,
    method: Option<String>,
    params: Option<Value>,
}

/// MCP tool definition
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    name: String,
    description: String,
    input_schema: Value,
}

/// MCP server capabilities
#[derive(Debug, Serialize, Deserialize)]
struct ServerCapabilities {
    tools: Option<Value>,
}

/// MCP server info
#[derive(Debug, Serialize, Deserialize)]
struct ServerInfo {
    name: String,
    version: String,
}

/// MCP initialize result
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeResult {
    protocol_version: String,
    capabilities: ServerCapabilities,
    server_info: ServerInfo,
}

/// MCP server over stdio, one JSON-RPC message per line
pub struct McpServer {
    indexer: Arc<Indexer>,
    engine: QueryEngine,
}

impl McpServer {
    pub fn new(indexer: Arc<Indexer>, engine: QueryEngine) -> Self {
        Self { indexer, engine }
    }

    /// Serve requests until stdin closes or `shutdown` is received
    pub async fn run(self) -> Result<()> {
        info!("Starting MCP server");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            debug!("Received: {}", line);

            let response = match self.handle_message(&line).await {
                Ok(response) => response,
                Err(e) => {
                    error!("Error handling message: {}", e);
                    Some(json!({
                        "jsonrpc": "2.0",
                        "id": null,
                        "error": {
                            "code": -32700,
                            "message": format!("Parse error: {}", e)
                        }
                    }))
                }
            };

            if let Some(response) = response {
                let mut payload = serde_json::to_string(&response)?;
                payload.push('\n');
                stdout.write_all(payload.as_bytes()).await?;
                stdout.flush().await?;
            }

            if is_shutdown(&line) {
                break;
            }
        }

        info!("MCP server stopped");
        Ok(())
    }

    /// Handle a JSON-RPC message. Notifications get no response.
    async fn handle_message(&self, message: &str) -> Result<Option<Value>> {
        let msg: JsonRpcMessage = serde_json::from_str(message)?;

        let Some(method) = msg.method.as_deref() else {
            return Ok(Some(error_response(msg.id, -32600, "Invalid request")));
        };

        if msg.id.is_none() {
            debug!("Notification: {}", method);
            return Ok(None);
        }

        let response = match method {
            "initialize" => {
                let result = InitializeResult {
                    protocol_version: PROTOCOL_VERSION.to_string(),
                    capabilities: ServerCapabilities {
                        tools: Some(json!({})),
                    },
                    server_info: ServerInfo {
                        name: "cppscope".to_string(),
                        version: env!("CARGO_PKG_VERSION").to_string(),
                    },
                };

                json!({
                    "jsonrpc": "2.0",
                    "id": msg.id,
                    "result": result
                })
            }

            "tools/list" => json!({
                "jsonrpc": "2.0",
                "id": msg.id,
                "result": { "tools": self.list_tools() }
            }),

            "tools/call" => match &msg.params {
                Some(params) => match self.call_tool(params).await {
                    Ok(result) => json!({
                        "jsonrpc": "2.0",
                        "id": msg.id,
                        "result": result
                    }),
                    Err(e) => {
                        warn!("Tool call failed: {:#}", e);
                        json!({
                            "jsonrpc": "2.0",
                            "id": msg.id,
                            "result": {
                                "content": [{ "type": "text", "text": format!("{:#}", e) }],
                                "isError": true
                            }
                        })
                    }
                },
                None => error_response(msg.id, -32602, "Invalid params"),
            },

            "shutdown" => {
                info!("Received shutdown request");
                json!({
                    "jsonrpc": "2.0",
                    "id": msg.id,
                    "result": null
                })
            }

            _ => error_response(msg.id, -32601, "Method not found"),
        };

        Ok(Some(response))
    }

    /// List available tools
    fn list_tools(&self) -> Vec<Tool> {
        vec![
            Tool {
                name: "cppscope_update_file".to_string(),
                description: "Re-index one C/C++ file from the given content, or from disk".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "file": { "type": "string", "description": "Path relative to the project root" },
                        "content": { "type": "string", "description": "Current buffer content; read from disk when omitted" }
                    },
                    "required": ["file"]
                }),
            },
            Tool {
                name: "cppscope_remove_file".to_string(),
                description: "Drop a file and everything derived from it".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "file": { "type": "string", "description": "Path relative to the project root" }
                    },
                    "required": ["file"]
                }),
            },
            Tool {
                name: "cppscope_definition".to_string(),
                description: "Rank likely definitions of an identifier, or of the identifier under a cursor".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "identifier": { "type": "string", "description": "Plain or ::-qualified name; taken from the cursor when omitted" },
                        "file": { "type": "string", "description": "File the lookup happens from" },
                        "line": { "type": "integer", "description": "Zero-based line" },
                        "column": { "type": "integer", "description": "Zero-based column, required without identifier" },
                        "format": { "type": "string", "enum": ["text", "json"], "default": "text" }
                    },
                    "required": ["file", "line"]
                }),
            },
            Tool {
                name: "cppscope_scope".to_string(),
                description: "Innermost scope at a position".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "file": { "type": "string" },
                        "line": { "type": "integer", "description": "Zero-based line" },
                        "format": { "type": "string", "enum": ["text", "json"], "default": "text" }
                    },
                    "required": ["file", "line"]
                }),
            },
            Tool {
                name: "cppscope_search".to_string(),
                description: "Search for symbols by case-insensitive name substring".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "Search query" },
                        "kind": {
                            "type": "string",
                            "enum": ["function", "variable", "class", "struct", "namespace", "enum", "enum_value", "typedef"],
                            "description": "Filter by symbol kind"
                        },
                        "limit": { "type": "integer", "default": 10, "description": "Maximum number of results" }
                    },
                    "required": ["query"]
                }),
            },
            Tool {
                name: "cppscope_stats".to_string(),
                description: "Get index statistics".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {}
                }),
            },
        ]
    }

    /// Call a tool
    async fn call_tool(&self, params: &Value) -> Result<Value> {
        let tool_name = params["name"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing tool name"))?;
        let args: HashMap<String, Value> = match params.get("arguments") {
            Some(Value::Object(map)) => map.clone().into_iter().collect(),
            Some(Value::Null) | None => HashMap::new(),
            Some(_) => return Err(anyhow::anyhow!("Invalid arguments")),
        };

        match tool_name {
            "cppscope_update_file" => tools::update_file(&self.indexer, &args).await,
            "cppscope_remove_file" => tools::remove_file(&self.indexer, &args).await,
            "cppscope_definition" => tools::definition(&self.indexer, &self.engine, &args).await,
            "cppscope_scope" => tools::scope(&self.engine, &args).await,
            "cppscope_search" => tools::search(&self.engine, &args).await,
            "cppscope_stats" => tools::stats(&self.engine, &args).await,
            _ => Err(anyhow::anyhow!("Unknown tool: {}", tool_name)),
        }
    }
}

fn is_shutdown(message: &str) -> bool {
    serde_json::from_str::<JsonRpcMessage>(message)
        .map(|msg| msg.method.as_deref() == Some("shutdown"))
        .unwrap_or(false)
}

fn error_response(id: Option<Value>, code: i32, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::store::SymbolIndex;

    fn server() -> McpServer {
        let index = Arc::new(SymbolIndex::default());
        let indexer = Arc::new(Indexer::new(Arc::clone(&index), "."));
        McpServer::new(indexer, QueryEngine::new(index, 5))
    }

    async fn request(server: &McpServer, message: Value) -> Value {
        server
            .handle_message(&message.to_string())
            .await
            .unwrap()
            .expect("response")
    }

    #[tokio::test]
    async fn test_initialize_and_list() {
        let server = server();

        let response = request(&server, json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}})).await;
        assert_eq!(response["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(response["result"]["serverInfo"]["name"], "cppscope");

        let response = request(&server, json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})).await;
        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 6);
        assert!(tools.iter().all(|t| t["inputSchema"]["type"] == "object"));
    }

    #[tokio::test]
    async fn test_tool_call_round_trip() {
        let server = server();

        let response = request(
            &server,
            json!({
                "jsonrpc": "2.0", "id": 3, "method": "tools/call",
                "params": {
                    "name": "cppscope_update_file",
                    "arguments": { "file": "a.cpp", "content": "int helper() { return 1; }\nint main() { return helper(); }\n" }
                }
            }),
        )
        .await;
        assert!(response["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("Indexed a.cpp: 2 symbols"));

        let response = request(
            &server,
            json!({
                "jsonrpc": "2.0", "id": 4, "method": "tools/call",
                "params": {
                    "name": "cppscope_definition",
                    "arguments": { "identifier": "helper", "file": "a.cpp", "line": 1 }
                }
            }),
        )
        .await;
        assert!(response["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("a.cpp:0:4 - helper (function"));
    }

    #[tokio::test]
    async fn test_errors() {
        let server = server();

        let response = request(&server, json!({"jsonrpc": "2.0", "id": 5, "method": "resources/list"})).await;
        assert_eq!(response["error"]["code"], -32601);

        let response = request(&server, json!({"jsonrpc": "2.0", "id": 6, "method": "tools/call"})).await;
        assert_eq!(response["error"]["code"], -32602);

        let response = request(
            &server,
            json!({"jsonrpc": "2.0", "id": 7, "method": "tools/call", "params": {"name": "nope"}}),
        )
        .await;
        assert_eq!(response["result"]["isError"], true);

        let notification = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        assert!(server.handle_message(&notification.to_string()).await.unwrap().is_none());

        assert!(server.handle_message("not json").await.is_err());
        assert!(is_shutdown(r#"{"jsonrpc":"2.0","id":8,"method":"shutdown"}"#));
        assert!(!is_shutdown("not json"));
    }
}
