//! Mock MCP endpoint for integration tests

#![allow(dead_code)]

use mcp_chat_rust::{ChatConfig, McpHttpClient};
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const SESSION_ID: &str = "sess-test-1";

/// Test fixture that emulates the JSON-RPC surface of a tool endpoint.
pub struct McpMock {
    pub server: ServerGuard,
}

impl McpMock {
    pub async fn new() -> Self {
        Self {
            server: Server::new_async().await,
        }
    }

    pub fn mcp_url(&self) -> String {
        format!("{}/mcp", self.server.url())
    }

    pub fn config(&self) -> ChatConfig {
        ChatConfig::default().with_mcp_url(self.mcp_url())
    }

    pub fn client(&self) -> McpHttpClient {
        McpHttpClient::new(&self.config()).unwrap()
    }

    pub fn client_with_timeout(&self, timeout: Duration) -> McpHttpClient {
        McpHttpClient::new(&self.config().with_invoke_timeout(timeout)).unwrap()
    }

    fn rpc(&mut self, body: Value) -> mockito::Mock {
        self.server
            .mock("POST", "/mcp")
            .match_body(Matcher::PartialJson(body))
    }

    /// `initialize` plus the `initialized` notification. Expects exactly
    /// `times` handshakes.
    pub async fn mock_handshake(&mut self, times: usize) -> (Mock, Mock) {
        let init = self
            .rpc(json!({ "method": "initialize" }))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header("mcp-session-id", SESSION_ID)
            .with_body(
                json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "result": {
                        "protocolVersion": "2025-03-26",
                        "capabilities": { "tools": {} },
                        "serverInfo": { "name": "mock-tools", "version": "0.1.0" }
                    }
                })
                .to_string(),
            )
            .expect(times)
            .create_async()
            .await;
        let notify = self
            .rpc(json!({ "method": "notifications/initialized" }))
            .with_status(202)
            .expect(times)
            .create_async()
            .await;
        (init, notify)
    }

    /// `tools/list` answering with `tools`, requiring the session header.
    pub async fn mock_list_tools(&mut self, tools: Value) -> Mock {
        self.rpc(json!({ "method": "tools/list" }))
            .match_header("mcp-session-id", SESSION_ID)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "jsonrpc": "2.0", "id": 2, "result": { "tools": tools } }).to_string())
            .create_async()
            .await
    }

    /// `tools/call` for `name` answering with a single text content item.
    pub async fn mock_call_text(&mut self, name: &str, text: &str) -> Mock {
        self.mock_call_result(name, json!({ "content": [{ "type": "text", "text": text }] }))
            .await
    }

    pub async fn mock_call_result(&mut self, name: &str, result: Value) -> Mock {
        self.rpc(json!({ "method": "tools/call", "params": { "name": name } }))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "jsonrpc": "2.0", "id": 3, "result": result }).to_string())
            .create_async()
            .await
    }

    /// Same as [`Self::mock_call_text`] but replied as an event stream.
    pub async fn mock_call_sse(&mut self, name: &str, text: &str) -> Mock {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 3,
            "result": { "content": [{ "type": "text", "text": text }] }
        });
        self.rpc(json!({ "method": "tools/call", "params": { "name": name } }))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(format!("event: message\ndata: {}\n\n", payload))
            .create_async()
            .await
    }

    /// Every request fails with `status`.
    pub async fn mock_down(&mut self, status: usize) -> Mock {
        self.server
            .mock("POST", "/mcp")
            .with_status(status)
            .with_body("upstream unavailable")
            .create_async()
            .await
    }
}

pub fn reference_tools() -> Value {
    json!([
        { "name": "ping", "description": "Health check", "inputSchema": { "type": "object" } },
        { "name": "echo", "description": "Echo back a message", "inputSchema": { "type": "object" } },
        { "name": "math.add", "description": "Add two numbers", "inputSchema": { "type": "object" } },
        { "name": "time.now", "description": "Return current ISO timestamp", "inputSchema": { "type": "object" } },
        { "name": "http.getTitle", "description": "Fetch a URL and attempt to extract <title>", "inputSchema": { "type": "object" } }
    ])
}

/// An endpoint that accepts connections and never answers. Returns its MCP
/// URL; the listener lives as long as the returned task.
pub async fn silent_endpoint() -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    (format!("http://{}/mcp", addr), task)
}

pub fn silent_client(url: &str, timeout: Duration) -> McpHttpClient {
    let config = ChatConfig::default()
        .with_mcp_url(url)
        .with_invoke_timeout(timeout);
    McpHttpClient::new(&config).unwrap()
}
