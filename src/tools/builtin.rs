//! Reference tool set served without a network hop.
//!
//! Mirrors the tools of the companion MCP server, so the CLI can run with
//! `--local` and tests can drive full turns without a live endpoint.

use crate::transport::{TransportError, ToolTransport};
use crate::types::{ToolArgs, ToolDescriptor};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<title[^>]*>([^<]*)</title>").expect("static regex"));

/// First `<title>` of an HTML document, trimmed.
pub fn extract_title(html: &str) -> Option<String> {
    TITLE_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

pub struct BuiltinToolServer {
    http: reqwest::Client,
    connected: AtomicBool,
}

impl BuiltinToolServer {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            http,
            connected: AtomicBool::new(false),
        }
    }

    pub fn catalog() -> Vec<ToolDescriptor> {
        let object = |props: Value, required: &[&str]| {
            json!({ "type": "object", "properties": props, "required": required })
        };
        vec![
            ToolDescriptor::new("ping", "Health check").with_input_schema(object(json!({}), &[])),
            ToolDescriptor::new("echo", "Echo back a message").with_input_schema(object(
                json!({ "message": { "type": "string" } }),
                &["message"],
            )),
            ToolDescriptor::new("math.add", "Add two numbers").with_input_schema(object(
                json!({ "a": { "type": "number" }, "b": { "type": "number" } }),
                &["a", "b"],
            )),
            ToolDescriptor::new("time.now", "Return current ISO timestamp")
                .with_input_schema(object(json!({}), &[])),
            ToolDescriptor::new("http.getTitle", "Fetch a URL and attempt to extract <title>")
                .with_input_schema(object(
                    json!({ "url": { "type": "string", "format": "uri" } }),
                    &["url"],
                )),
        ]
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }

    async fn get_title(&self, args: &ToolArgs) -> Result<Value> {
        let url = string_arg("http.getTitle", args, "url")?;
        url::Url::parse(url)
            .map_err(|e| Error::invocation("http.getTitle", format!("invalid url: {}", e)))?;

        let fetch_failed =
            |e: reqwest::Error| Error::invocation("http.getTitle", TransportError::Http(e).to_string());
        let resp = self.http.get(url).send().await.map_err(fetch_failed)?;
        let html = resp.text().await.map_err(fetch_failed)?;
        Ok(json!({ "url": url, "title": extract_title(&html) }))
    }
}

impl Default for BuiltinToolServer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolTransport for BuiltinToolServer {
    async fn connect(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        self.ensure_connected()?;
        Ok(Self::catalog())
    }

    async fn invoke(&self, name: &str, args: ToolArgs) -> Result<Value> {
        self.ensure_connected()?;
        debug!(target: "builtin_tools", tool = %name, "Invoking built-in tool");
        match name {
            "ping" => Ok(json!("pong")),
            "echo" => {
                let message = string_arg(name, &args, "message")?;
                Ok(json!({ "message": message }))
            }
            "math.add" => {
                let a = number_arg(name, &args, "a")?;
                let b = number_arg(name, &args, "b")?;
                Ok(json!({ "result": add(a, b) }))
            }
            "time.now" => Ok(json!({
                "now": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
            })),
            "http.getTitle" => self.get_title(&args).await,
            other => Err(Error::invocation(other, format!("Tool {} not found", other))),
        }
    }
}

fn string_arg<'a>(tool: &str, args: &'a ToolArgs, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::invocation(tool, format!("Invalid arguments: '{}' must be a string", key)))
}

fn number_arg<'a>(tool: &str, args: &'a ToolArgs, key: &str) -> Result<&'a serde_json::Number> {
    match args.get(key) {
        Some(Value::Number(n)) => Ok(n),
        _ => Err(Error::invocation(
            tool,
            format!("Invalid arguments: '{}' must be a number", key),
        )),
    }
}

/// Integer sum when both operands are integers and it fits; float otherwise.
fn add(a: &serde_json::Number, b: &serde_json::Number) -> Value {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(sum) = x.checked_add(y) {
            return json!(sum);
        }
    }
    let sum = a.as_f64().unwrap_or(0.0) + b.as_f64().unwrap_or(0.0);
    json!(sum)
}
