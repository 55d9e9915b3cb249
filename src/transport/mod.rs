//! Tool endpoint transport.
//!
//! [`ToolTransport`] is the seam between the orchestrator and whatever
//! serves tools: [`McpHttpClient`] speaks MCP over streamable HTTP, and
//! [`crate::tools::BuiltinToolServer`] serves the reference tools in-process.
//!
//! Wire types follow the MCP JSON-RPC 2.0 surface (`initialize`,
//! `tools/list`, `tools/call`).

pub mod http;

pub use http::McpHttpClient;

use crate::types::{ToolArgs, ToolDescriptor};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Protocol version announced during `initialize`.
pub const PROTOCOL_VERSION: &str = "2025-03-26";

/// Header carrying the server-assigned session.
pub const SESSION_HEADER: &str = "mcp-session-id";

#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// Establish the connection, or reuse the one already established.
    async fn connect(&self) -> Result<()>;

    fn is_connected(&self) -> bool;

    /// Current catalog, in server order. Requires a prior `connect`.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>>;

    /// Run one tool and return its normalized result. Requires a prior
    /// `connect`. Never retries.
    async fn invoke(&self, name: &str, args: ToolArgs) -> Result<Value>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("{method} timed out after {millis} ms")]
    Timeout { method: String, millis: u128 },
}

/// JSON-RPC 2.0 Request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(Value::from(id)),
            method: method.into(),
            params: Some(params),
        }
    }

    /// A request without an id; the server sends no reply body.
    pub fn notification(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: method.into(),
            params: None,
        }
    }
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn into_result(self) -> std::result::Result<Value, TransportError> {
        if let Some(err) = self.error {
            return Err(TransportError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        self.result
            .ok_or_else(|| TransportError::Protocol("missing result in response".to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion", default)]
    pub protocol_version: String,
    #[serde(rename = "serverInfo", default)]
    pub server_info: Option<ServerInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
    #[serde(rename = "nextCursor", default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Content block within a tool result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpContent {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl McpContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content_type: "text".to_string(),
            text: Some(text.into()),
            extra: HashMap::new(),
        }
    }
}

/// `tools/call` result as sent by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<McpContent>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

/// Reduce a raw `tools/call` result to the value handed to callers.
///
/// When the first content item is text, it is parsed as JSON and falls back
/// to the raw string. Results without a leading text item are returned whole.
/// A result flagged `isError` becomes an invocation error carrying its text.
pub fn normalize_result(tool: &str, raw: Value) -> Result<Value> {
    let parsed: CallToolResult = match serde_json::from_value(raw.clone()) {
        Ok(r) => r,
        Err(_) => return Ok(raw),
    };

    if parsed.is_error {
        let message = parsed
            .content
            .iter()
            .filter_map(|c| c.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");
        let message = if message.is_empty() {
            "tool reported an error".to_string()
        } else {
            message
        };
        return Err(crate::Error::invocation(tool, message));
    }

    match parsed.content.first() {
        Some(McpContent {
            content_type,
            text: Some(text),
            ..
        }) if content_type == "text" => Ok(parse_text_payload(text)),
        _ => Ok(raw),
    }
}

/// Parse a text payload as JSON, keeping the raw string when it is not JSON.
pub fn parse_text_payload(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Pick the JSON-RPC response with `id` out of an SSE body.
///
/// Events are separated by blank lines; multi-line `data:` fields are joined
/// with `\n` as the SSE format prescribes.
pub fn parse_sse_response(body: &str, id: &Value) -> Option<JsonRpcResponse> {
    let mut fallback = None;
    for event in body.replace("\r\n", "\n").split("\n\n") {
        let data = event
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|d| d.strip_prefix(' ').unwrap_or(d))
            .collect::<Vec<_>>()
            .join("\n");
        if data.trim().is_empty() {
            continue;
        }
        let Ok(resp) = serde_json::from_str::<JsonRpcResponse>(&data) else {
            continue;
        };
        if &resp.id == id {
            return Some(resp);
        }
        if fallback.is_none() && (resp.result.is_some() || resp.error.is_some()) {
            fallback = Some(resp);
        }
    }
    fallback
}
