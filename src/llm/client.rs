use super::{CompletionRequest, LanguageModel};
use crate::config::ChatConfig;
use crate::transport::TransportError;
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// OpenAI-compatible Chat Completions backend.
#[derive(Clone)]
pub struct HttpLanguageModel {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpLanguageModel {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(
                crate::config::DEFAULT_LLM_TIMEOUT_MS,
            ))
            .build()
            .map_err(TransportError::Http)?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
        })
    }

    /// Build from config; `None` when no backend URL is configured.
    pub fn from_config(config: &ChatConfig) -> Result<Option<Self>> {
        let Some(ref base_url) = config.llm_base_url else {
            return Ok(None);
        };
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(TransportError::Http)?;
        Ok(Some(Self {
            http,
            base_url: base_url.clone(),
            model: config.llm_model.clone(),
            api_key: config.llm_api_key.clone(),
        }))
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    fn error(&self, msg: impl Into<String>) -> Error {
        Error::model(format!("http:{}", self.model), msg)
    }
}

#[async_trait]
impl LanguageModel for HttpLanguageModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!(target: "llm_client", url = %url, model = %self.model, "POST chat completion");

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        let mut req = self
            .http
            .post(&url)
            .header("content-type", "application/json");
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .json(&body)
            .send()
            .await
            .map_err(|e| self.error(format!("request failed: {}", e)))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            warn!(target: "llm_client", %status, body = %text, "Chat completion error");
            return Err(self.error(format!("status={} body={}", status, text)));
        }

        let val: Value = resp
            .json()
            .await
            .map_err(|e| self.error(format!("invalid JSON: {}", e)))?;
        extract_text(&val)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| self.error("missing choices[0].message.content"))
    }
}

/// Client for the companion `/llm/*` routes, bounded like the model backend.
pub(crate) fn remote_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_millis(
            crate::config::DEFAULT_LLM_TIMEOUT_MS,
        ))
        .build()
        .unwrap_or_default()
}

fn extract_text(v: &Value) -> Option<String> {
    v.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(|s| s.to_string())
}
