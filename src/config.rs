//! Runtime configuration.
//!
//! All knobs have env overrides so a deployment can be tuned without code
//! changes; the builder-style setters exist for tests and embedding.

use crate::{Error, ErrorContext, Result};
use std::env;
use std::time::Duration;

pub const DEFAULT_MCP_URL: &str = "http://localhost:5179/mcp";
pub const DEFAULT_INVOKE_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_LLM_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Tool endpoint (MCP streamable HTTP).
    pub mcp_url: String,
    /// Base URL for the companion `/llm/plan` and `/llm/summarize` routes.
    pub api_base: String,
    pub invoke_timeout: Duration,
    pub request_timeout: Duration,
    /// OpenAI-compatible backend, e.g. `http://localhost:8000/v1`.
    pub llm_base_url: Option<String>,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub auto_plan: bool,
    /// Route planning and summarizing through the companion API first.
    pub remote_llm: bool,
    pub client_name: String,
    pub client_version: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            mcp_url: DEFAULT_MCP_URL.to_string(),
            api_base: api_base_for(DEFAULT_MCP_URL),
            invoke_timeout: Duration::from_millis(DEFAULT_INVOKE_TIMEOUT_MS),
            request_timeout: Duration::from_millis(DEFAULT_LLM_TIMEOUT_MS),
            llm_base_url: None,
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_api_key: None,
            auto_plan: true,
            remote_llm: false,
            client_name: env!("CARGO_PKG_NAME").to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ChatConfig {
    /// Load from the environment, falling back to defaults for unset keys.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(url) = non_empty_var("MCP_HTTP_URL") {
            cfg = cfg.with_mcp_url(url);
        }
        if let Some(base) = non_empty_var("MCP_API_BASE") {
            cfg.api_base = base;
        }
        if let Some(ms) = non_empty_var("MCP_INVOKE_TIMEOUT_MS").and_then(|s| s.parse::<u64>().ok()) {
            cfg.invoke_timeout = Duration::from_millis(ms.max(1));
        }
        if let Some(ms) = non_empty_var("LLM_TIMEOUT_MS").and_then(|s| s.parse::<u64>().ok()) {
            cfg.request_timeout = Duration::from_millis(ms.max(1));
        }
        cfg.llm_base_url = non_empty_var("LLM_BASE_URL");
        if let Some(model) = non_empty_var("LLM_MODEL") {
            cfg.llm_model = model;
        }
        cfg.llm_api_key = non_empty_var("LLM_API_KEY");
        if let Some(flag) = non_empty_var("MCP_AUTO_PLAN") {
            cfg.auto_plan = parse_flag(&flag).unwrap_or(true);
        }
        if let Some(flag) = non_empty_var("MCP_REMOTE_LLM") {
            cfg.remote_llm = parse_flag(&flag).unwrap_or(false);
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Set the tool endpoint; the companion API base follows it.
    pub fn with_mcp_url(mut self, url: impl Into<String>) -> Self {
        self.mcp_url = url.into();
        self.api_base = api_base_for(&self.mcp_url);
        self
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn with_invoke_timeout(mut self, timeout: Duration) -> Self {
        self.invoke_timeout = timeout;
        self
    }

    pub fn with_llm(mut self, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        self.llm_base_url = Some(base_url.into());
        self.llm_model = model.into();
        self
    }

    pub fn with_auto_plan(mut self, enable: bool) -> Self {
        self.auto_plan = enable;
        self
    }

    pub fn with_remote_llm(mut self, enable: bool) -> Self {
        self.remote_llm = enable;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_url("mcp_url", &self.mcp_url)?;
        check_url("api_base", &self.api_base)?;
        if let Some(ref base) = self.llm_base_url {
            check_url("llm_base_url", base)?;
        }
        Ok(())
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn check_url(field: &str, value: &str) -> Result<()> {
    url::Url::parse(value).map(|_| ()).map_err(|e| {
        Error::configuration_with_context(
            format!("invalid URL '{}': {}", value, e),
            ErrorContext::new()
                .with_field_path(format!("config.{}", field))
                .with_source("config"),
        )
    })
}

/// `http://host:5179/mcp` -> `http://host:5179`
fn api_base_for(mcp_url: &str) -> String {
    let trimmed = mcp_url.trim_end_matches('/');
    trimmed.strip_suffix("/mcp").unwrap_or(trimmed).to_string()
}
