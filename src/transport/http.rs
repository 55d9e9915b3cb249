//! MCP client over streamable HTTP.

use super::{
    normalize_result, parse_sse_response, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, ServerInfo, ToolTransport, TransportError, PROTOCOL_VERSION, SESSION_HEADER,
};
use crate::config::ChatConfig;
use crate::types::{ToolArgs, ToolDescriptor};
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Cap on `tools/list` pages; guards against a server that never stops
/// returning a cursor.
const MAX_LIST_PAGES: usize = 64;

/// State captured by a successful handshake.
#[derive(Debug, Clone)]
struct McpSession {
    session_id: Option<String>,
    protocol_version: String,
    server_info: Option<ServerInfo>,
}

/// Client for one tool endpoint.
///
/// The handshake runs at most once per client: concurrent `connect` calls
/// wait on the same initialization and then share the resulting session.
/// A failed handshake leaves the client unconnected so a later call can try
/// again. The handshake, each `tools/list` page and each `tools/call` are
/// bounded by the configured invoke timeout.
pub struct McpHttpClient {
    http: reqwest::Client,
    endpoint: String,
    client_name: String,
    client_version: String,
    invoke_timeout: Duration,
    session: OnceCell<McpSession>,
    request_id: AtomicU64,
}

impl McpHttpClient {
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(TransportError::Http)?;
        Ok(Self {
            http,
            endpoint: config.mcp_url.clone(),
            client_name: config.client_name.clone(),
            client_version: config.client_version.clone(),
            invoke_timeout: config.invoke_timeout,
            session: OnceCell::new(),
            request_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.get().and_then(|s| s.session_id.as_deref())
    }

    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.session.get().and_then(|s| s.server_info.as_ref())
    }

    async fn handshake(&self) -> Result<McpSession> {
        info!(target: "mcp_client", endpoint = %self.endpoint, "Connecting to tool endpoint");

        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "clientInfo": { "name": self.client_name, "version": self.client_version },
        });
        let (result, session_id) = self
            .send_request("initialize", params, None)
            .await
            .map_err(|e| Error::connection(&self.endpoint, e.to_string()))?;
        let init: InitializeResult = serde_json::from_value(result).map_err(|e| {
            Error::connection(&self.endpoint, format!("invalid initialize result: {}", e))
        })?;

        let session = McpSession {
            session_id,
            protocol_version: if init.protocol_version.is_empty() {
                PROTOCOL_VERSION.to_string()
            } else {
                init.protocol_version
            },
            server_info: init.server_info,
        };

        if let Err(e) = self.send_notification("notifications/initialized", &session).await {
            warn!(target: "mcp_client", error = %e, "initialized notification was not accepted");
        }

        info!(
            target: "mcp_client",
            endpoint = %self.endpoint,
            server = session.server_info.as_ref().map(|s| s.name.as_str()).unwrap_or("unknown"),
            protocol = %session.protocol_version,
            "Tool endpoint connected"
        );
        Ok(session)
    }

    fn session(&self) -> Result<&McpSession> {
        self.session.get().ok_or(Error::NotConnected)
    }

    fn request_builder(&self, session: Option<&McpSession>) -> reqwest::RequestBuilder {
        let mut req = self
            .http
            .post(&self.endpoint)
            .header("accept", "application/json, text/event-stream");
        if let Some(session) = session {
            req = req.header("mcp-protocol-version", &session.protocol_version);
            if let Some(ref id) = session.session_id {
                req = req.header(SESSION_HEADER, id);
            }
        }
        req
    }

    /// Send one request; returns its result and any session id the server set.
    async fn send_request(
        &self,
        method: &str,
        params: Value,
        session: Option<&McpSession>,
    ) -> std::result::Result<(Value, Option<String>), TransportError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest::new(id, method, params);
        debug!(target: "mcp_client", method = %method, id = id, "JSON-RPC request");

        let resp = self.request_builder(session).json(&request).send().await?;
        let status = resp.status();
        let session_id = resp
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let is_sse = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("text/event-stream"))
            .unwrap_or(false);
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let rpc = if is_sse {
            parse_sse_response(&body, &Value::from(id)).ok_or_else(|| {
                TransportError::Protocol(format!("no response for request {} in event stream", id))
            })?
        } else {
            serde_json::from_str::<JsonRpcResponse>(&body)
                .map_err(|e| TransportError::Protocol(format!("invalid JSON-RPC response: {}", e)))?
        };

        Ok((rpc.into_result()?, session_id))
    }

    /// Bound a request by the configured timeout.
    async fn bounded<T>(
        &self,
        method: &str,
        fut: impl std::future::Future<Output = std::result::Result<T, TransportError>>,
    ) -> std::result::Result<T, TransportError> {
        tokio::time::timeout(self.invoke_timeout, fut)
            .await
            .unwrap_or_else(|_| {
                Err(TransportError::Timeout {
                    method: method.to_string(),
                    millis: self.invoke_timeout.as_millis(),
                })
            })
    }

    async fn send_notification(
        &self,
        method: &str,
        session: &McpSession,
    ) -> std::result::Result<(), TransportError> {
        let resp = self
            .request_builder(Some(session))
            .json(&JsonRpcRequest::notification(method))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ToolTransport for McpHttpClient {
    async fn connect(&self) -> Result<()> {
        self.session
            .get_or_try_init(|| async {
                match tokio::time::timeout(self.invoke_timeout, self.handshake()).await {
                    Ok(session) => session,
                    Err(_) => {
                        warn!(target: "mcp_client", endpoint = %self.endpoint, "Handshake timed out");
                        Err(Error::connection(
                            &self.endpoint,
                            format!("handshake timed out after {} ms", self.invoke_timeout.as_millis()),
                        ))
                    }
                }
            })
            .await
            .map(|_| ())
    }

    fn is_connected(&self) -> bool {
        self.session.initialized()
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let session = self.session()?;
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let params = match cursor {
                Some(ref c) => json!({ "cursor": c }),
                None => json!({}),
            };
            let (result, _) = self
                .bounded("tools/list", self.send_request("tools/list", params, Some(session)))
                .await?;
            let page: ListToolsResult = serde_json::from_value(result).map_err(|e| {
                TransportError::Protocol(format!("invalid tools/list result: {}", e))
            })?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        debug!(target: "mcp_client", count = tools.len(), "Listed tools");
        Ok(tools)
    }

    #[tracing::instrument(name = "mcp_client.invoke", skip(self, args), fields(tool = %name))]
    async fn invoke(&self, name: &str, args: ToolArgs) -> Result<Value> {
        let session = self.session()?;
        let params = json!({ "name": name, "arguments": args });

        let call = self.send_request("tools/call", params, Some(session));
        let raw = match tokio::time::timeout(self.invoke_timeout, call).await {
            Ok(Ok((result, _))) => result,
            Ok(Err(e)) => {
                warn!(target: "mcp_client", tool = %name, error = %e, "Tool call failed");
                return Err(Error::invocation(name, e.to_string()));
            }
            Err(_) => {
                warn!(target: "mcp_client", tool = %name, "Tool call timed out");
                return Err(Error::invocation(
                    name,
                    format!("timed out after {} ms", self.invoke_timeout.as_millis()),
                ));
            }
        };

        normalize_result(name, raw)
    }
}
