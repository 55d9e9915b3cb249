//! Tool planning: choose at most one tool and its arguments for an utterance.
//!
//! Planning is an ordered list of [`PlanProvider`]s tried in sequence. The
//! default list is a model-backed provider followed by the keyword
//! heuristic, so a broken or unreachable model degrades to the heuristic
//! instead of failing the turn.

mod heuristic;
mod parse;

pub use heuristic::heuristic_plan;
pub use parse::{build_plan_prompt, parse_plan_text, PLAN_SYSTEM_PROMPT};

use crate::llm::{remote_client, CompletionRequest, LanguageModel};
use crate::transport::TransportError;
use crate::types::{Plan, ToolDescriptor};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

#[async_trait]
pub trait PlanProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Produce a plan, or an error when this provider cannot decide.
    async fn plan(&self, tools: &[ToolDescriptor], utterance: &str) -> Result<Plan>;
}

/// Asks a language model for strict-JSON plan output.
pub struct ModelPlanProvider {
    model: Arc<dyn LanguageModel>,
}

impl ModelPlanProvider {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl PlanProvider for ModelPlanProvider {
    fn name(&self) -> &str {
        "model"
    }

    async fn plan(&self, tools: &[ToolDescriptor], utterance: &str) -> Result<Plan> {
        let request = CompletionRequest::new(PLAN_SYSTEM_PROMPT, build_plan_prompt(tools, utterance))
            .temperature(0.0)
            .max_tokens(400);
        let text = self.model.complete(request).await?;
        parse_plan_text(&text).ok_or_else(|| {
            Error::planning_with_context(
                "model output is not a plan",
                ErrorContext::new()
                    .with_details(truncate(&text, 200))
                    .with_source(self.model.name()),
            )
        })
    }
}

/// Delegates to a companion `POST {api_base}/llm/plan` route that accepts
/// `{tools, user}` and answers with plan JSON.
pub struct RemotePlanProvider {
    http: reqwest::Client,
    url: String,
}

impl RemotePlanProvider {
    pub fn new(api_base: &str) -> Self {
        Self {
            http: remote_client(),
            url: format!("{}/llm/plan", api_base.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl PlanProvider for RemotePlanProvider {
    fn name(&self) -> &str {
        "remote"
    }

    async fn plan(&self, tools: &[ToolDescriptor], utterance: &str) -> Result<Plan> {
        let resp = self
            .http
            .post(&self.url)
            .json(&json!({ "tools": tools, "user": utterance }))
            .send()
            .await
            .map_err(TransportError::Http)?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body }.into());
        }
        let value: Value = resp.json().await.map_err(TransportError::Http)?;
        Plan::from_value(&value).ok_or_else(|| {
            Error::planning_with_context(
                "remote planner returned no plan",
                ErrorContext::new()
                    .with_details(truncate(&value.to_string(), 200))
                    .with_source("remote"),
            )
        })
    }
}

/// Keyword rules over the lower-cased utterance; never fails.
pub struct HeuristicPlanProvider;

#[async_trait]
impl PlanProvider for HeuristicPlanProvider {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn plan(&self, tools: &[ToolDescriptor], utterance: &str) -> Result<Plan> {
        Ok(heuristic_plan(tools, utterance))
    }
}

pub struct Planner {
    providers: Vec<Arc<dyn PlanProvider>>,
}

impl Planner {
    /// Model first (when one is configured), heuristic last.
    pub fn new(model: Option<Arc<dyn LanguageModel>>) -> Self {
        let mut providers: Vec<Arc<dyn PlanProvider>> = Vec::new();
        if let Some(model) = model {
            providers.push(Arc::new(ModelPlanProvider::new(model)));
        }
        providers.push(Arc::new(HeuristicPlanProvider));
        Self { providers }
    }

    pub fn with_providers(providers: Vec<Arc<dyn PlanProvider>>) -> Self {
        Self { providers }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Try each provider in order and return the first usable plan.
    ///
    /// A plan naming a tool missing from a non-empty catalog counts as a
    /// provider failure. Fails with a planning error only when every
    /// provider failed.
    pub async fn plan(&self, tools: &[ToolDescriptor], utterance: &str) -> Result<Plan> {
        let mut failures = Vec::new();

        for provider in &self.providers {
            match provider.plan(tools, utterance).await {
                Ok(plan) => match plan.name {
                    Some(ref name) if !tools.is_empty() && !tools.iter().any(|t| &t.name == name) => {
                        warn!(target: "planner", provider = provider.name(), tool = %name, "Plan names an unknown tool");
                        failures.push(format!("{}: unknown tool '{}'", provider.name(), name));
                    }
                    _ => {
                        debug!(target: "planner", provider = provider.name(), tool = ?plan.name, "Plan chosen");
                        return Ok(plan);
                    }
                },
                Err(e) => {
                    warn!(target: "planner", provider = provider.name(), error = %e, "Plan provider failed; trying next");
                    failures.push(format!("{}: {}", provider.name(), e));
                }
            }
        }

        Err(Error::planning_with_context(
            "no provider produced a usable plan",
            ErrorContext::new()
                .with_details(failures.join("; "))
                .with_source("planner"),
        ))
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
