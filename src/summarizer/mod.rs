//! Natural-language explanations of tool results.
//!
//! Like planning, summarization walks an ordered provider list. The template
//! provider at the end cannot fail, so [`Summarizer::summarize`] always
//! returns text: a worse explanation, never an error.

mod template;

pub use template::template_summary;

use crate::llm::{remote_client, CompletionRequest, LanguageModel};
use crate::transport::TransportError;
use crate::types::ToolArgs;
use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

pub const SUMMARY_SYSTEM_PROMPT: &str = "You explain tool results to a user. \
In at most 4 sentences, say succinctly what the tool did and what the result means. \
When the result is JSON, interpret its keys rather than repeating them verbatim.";

/// The invocation being explained.
#[derive(Debug, Clone, Copy)]
pub struct SummaryInput<'a> {
    pub name: &'a str,
    pub args: &'a ToolArgs,
    pub result: &'a Value,
}

#[async_trait]
pub trait SummaryProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn summarize(&self, input: SummaryInput<'_>) -> Result<String>;
}

pub struct ModelSummaryProvider {
    model: Arc<dyn LanguageModel>,
}

impl ModelSummaryProvider {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl SummaryProvider for ModelSummaryProvider {
    fn name(&self) -> &str {
        "model"
    }

    async fn summarize(&self, input: SummaryInput<'_>) -> Result<String> {
        let user = format!(
            "Tool: {}\nArguments: {}\nResult: {}",
            input.name,
            Value::Object(input.args.clone()),
            input.result
        );
        let request = CompletionRequest::new(SUMMARY_SYSTEM_PROMPT, user)
            .temperature(0.2)
            .max_tokens(300);
        let text = self.model.complete(request).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::model(self.model.name(), "empty summary"));
        }
        Ok(text.to_string())
    }
}

/// Delegates to a companion `POST {api_base}/llm/summarize` route that
/// accepts `{name, args, result}` and answers `{text}`.
pub struct RemoteSummaryProvider {
    http: reqwest::Client,
    url: String,
}

impl RemoteSummaryProvider {
    pub fn new(api_base: &str) -> Self {
        Self {
            http: remote_client(),
            url: format!("{}/llm/summarize", api_base.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl SummaryProvider for RemoteSummaryProvider {
    fn name(&self) -> &str {
        "remote"
    }

    async fn summarize(&self, input: SummaryInput<'_>) -> Result<String> {
        let resp = self
            .http
            .post(&self.url)
            .json(&json!({ "name": input.name, "args": input.args, "result": input.result }))
            .send()
            .await
            .map_err(TransportError::Http)?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body }.into());
        }
        let value: Value = resp.json().await.map_err(TransportError::Http)?;
        value
            .get("text")
            .and_then(|t| t.as_str())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .ok_or_else(|| Error::model("remote", "response has no text"))
    }
}

pub struct TemplateSummaryProvider;

#[async_trait]
impl SummaryProvider for TemplateSummaryProvider {
    fn name(&self) -> &str {
        "template"
    }

    async fn summarize(&self, input: SummaryInput<'_>) -> Result<String> {
        Ok(template_summary(input.name, input.result))
    }
}

pub struct Summarizer {
    providers: Vec<Arc<dyn SummaryProvider>>,
}

impl Summarizer {
    /// Model first (when one is configured), template last.
    pub fn new(model: Option<Arc<dyn LanguageModel>>) -> Self {
        let mut providers: Vec<Arc<dyn SummaryProvider>> = Vec::new();
        if let Some(model) = model {
            providers.push(Arc::new(ModelSummaryProvider::new(model)));
        }
        Self::with_providers(providers)
    }

    /// Custom providers, followed by the template provider.
    pub fn with_providers(mut providers: Vec<Arc<dyn SummaryProvider>>) -> Self {
        providers.push(Arc::new(TemplateSummaryProvider));
        Self { providers }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub async fn summarize(&self, name: &str, args: &ToolArgs, result: &Value) -> String {
        let input = SummaryInput { name, args, result };
        for provider in &self.providers {
            match provider.summarize(input).await {
                Ok(text) => {
                    debug!(target: "summarizer", provider = provider.name(), "Summary produced");
                    return text;
                }
                Err(e) => {
                    warn!(target: "summarizer", provider = provider.name(), error = %e, "Summary provider failed; trying next");
                }
            }
        }
        // The template provider never fails; this only guards an empty list.
        template_summary(name, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::FnLanguageModel;
    use futures::FutureExt;

    fn model(m: FnLanguageModel) -> Option<Arc<dyn LanguageModel>> {
        Some(Arc::new(m))
    }

    #[tokio::test]
    async fn test_model_summary_is_trimmed() {
        let summarizer = Summarizer::new(model(FnLanguageModel::fixed("  The sum is 5.\n")));
        let text = summarizer
            .summarize("math.add", &ToolArgs::new(), &json!({"result": 5}))
            .await;
        assert_eq!(text, "The sum is 5.");
    }

    #[tokio::test]
    async fn test_model_sees_low_temperature_and_result() {
        let summarizer = Summarizer::new(model(FnLanguageModel::new("inspecting", |req: CompletionRequest| {
            async move {
                assert!(req.temperature > 0.0 && req.temperature < 0.5);
                assert!(req.user.contains("\"result\":5"));
                Ok("ok".to_string())
            }
            .boxed()
        })));
        let text = summarizer
            .summarize("math.add", &ToolArgs::new(), &json!({"result": 5}))
            .await;
        assert_eq!(text, "ok");
    }

    #[tokio::test]
    async fn test_backend_failure_lists_keys() {
        let summarizer = Summarizer::new(model(FnLanguageModel::unavailable()));
        let text = summarizer
            .summarize("demo", &ToolArgs::new(), &json!({"a": 1, "b": 2, "c": 3}))
            .await;
        assert!(text.contains("a, b, c"), "got: {}", text);
    }

    #[tokio::test]
    async fn test_empty_model_text_falls_back() {
        let summarizer = Summarizer::new(model(FnLanguageModel::fixed("   ")));
        let text = summarizer.summarize("ping", &ToolArgs::new(), &json!("pong")).await;
        assert!(text.contains("pong"));
    }

    #[tokio::test]
    async fn test_remote_provider_falls_back_on_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/llm/summarize")
            .with_status(500)
            .create_async()
            .await;

        let remote: Arc<dyn SummaryProvider> = Arc::new(RemoteSummaryProvider::new(&server.url()));
        let summarizer = Summarizer::with_providers(vec![remote]);
        let text = summarizer
            .summarize("echo", &ToolArgs::new(), &json!({"message": "x"}))
            .await;
        assert!(text.contains("message"));
    }

    #[tokio::test]
    async fn test_remote_provider_text() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/llm/summarize")
            .match_body(mockito::Matcher::PartialJson(json!({"name": "echo"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"text":"It echoed x."}"#)
            .create_async()
            .await;

        let remote: Arc<dyn SummaryProvider> = Arc::new(RemoteSummaryProvider::new(&server.url()));
        let text = Summarizer::with_providers(vec![remote])
            .summarize("echo", &ToolArgs::new(), &json!({"message": "x"}))
            .await;
        assert_eq!(text, "It echoed x.");
    }

    #[test]
    fn test_template_is_last_provider() {
        let summarizer = Summarizer::new(model(FnLanguageModel::unavailable()));
        assert_eq!(summarizer.provider_names(), vec!["model", "template"]);
        assert_eq!(Summarizer::new(None).provider_names(), vec!["template"]);

        let remote: Arc<dyn SummaryProvider> = Arc::new(RemoteSummaryProvider::new("http://localhost:1"));
        assert_eq!(
            Summarizer::with_providers(vec![remote]).provider_names(),
            vec!["remote", "template"]
        );
    }

    #[tokio::test]
    async fn test_template_provider_summarizes_strings() {
        let input = SummaryInput {
            name: "ping",
            args: &ToolArgs::new(),
            result: &json!("pong"),
        };
        let text = TemplateSummaryProvider.summarize(input).await.unwrap();
        assert_eq!(text, "ping returned: pong");
    }
}
