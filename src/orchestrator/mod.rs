//! Per-turn orchestration: detect → plan or execute → summarize.
//!
//! A turn moves through [`TurnState`]s:
//!
//! ```text
//! Idle -> Detecting -> Executing ---------> Summarizing -> Done
//!                   \-> Planning -> Executing /
//! ```
//!
//! `Planning` and `Executing` may end the turn early with a terminal
//! message. Every message a turn creates in the loading state is resolved
//! before the turn returns, whatever fails along the way.
//!
//! Turns are independent: [`Orchestrator::submit`] spawns one without
//! waiting for earlier turns, and each turn only touches its own messages.

mod directive;

pub use directive::{parse_directive, Directive};

use crate::config::ChatConfig;
use crate::conversation::Conversation;
use crate::llm::{HttpLanguageModel, LanguageModel};
use crate::planner::{HeuristicPlanProvider, ModelPlanProvider, PlanProvider, Planner, RemotePlanProvider};
use crate::summarizer::{ModelSummaryProvider, RemoteSummaryProvider, Summarizer, SummaryProvider};
use crate::transport::{McpHttpClient, ToolTransport};
use crate::types::{Invocation, Message, MessageId, MessagePatch, MessageRole, ToolDescriptor};
use crate::Result;
use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const GREETING: &str = "Connected UI. Use /tool <name> <jsonArgs> to call tools.";
pub const NO_TOOL_TEXT: &str =
    "I couldn't find a suitable tool for that. Use /tool <name> <jsonArgs> to call one explicitly.";
const STEP_PREVIEW_CHARS: usize = 500;

/// Where a turn is. Transitions are traced at debug level under the
/// `orchestrator` target; a failed turn reports the state it failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Detecting,
    Planning,
    Executing,
    Summarizing,
    Done,
}

/// How a turn ended. Failures are outcomes, not errors: the conversation
/// already carries a message describing them.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Blank input; nothing was recorded.
    Ignored,
    /// Auto-planning is off; the turn was acknowledged locally.
    Echoed { message: MessageId },
    /// The planner found no suitable tool.
    NoTool { message: MessageId },
    Completed {
        tool_message: MessageId,
        summary_message: MessageId,
        result: Value,
    },
    /// `at` is `Planning` or `Executing`.
    Failed {
        message: MessageId,
        error: String,
        at: TurnState,
    },
}

struct Inner {
    transport: Arc<dyn ToolTransport>,
    planner: Planner,
    summarizer: Summarizer,
    conversation: Conversation,
    auto_plan: bool,
    catalog: RwLock<Vec<ToolDescriptor>>,
}

/// Drives turns against a tool transport. Cheap to clone; clones share the
/// transport, the catalog and the conversation.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

pub struct OrchestratorBuilder {
    transport: Arc<dyn ToolTransport>,
    planner: Option<Planner>,
    summarizer: Option<Summarizer>,
    conversation: Option<Conversation>,
    auto_plan: bool,
}

impl OrchestratorBuilder {
    pub fn new(transport: Arc<dyn ToolTransport>) -> Self {
        Self {
            transport,
            planner: None,
            summarizer: None,
            conversation: None,
            auto_plan: true,
        }
    }

    pub fn planner(mut self, planner: Planner) -> Self {
        self.planner = Some(planner);
        self
    }

    pub fn summarizer(mut self, summarizer: Summarizer) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn conversation(mut self, conversation: Conversation) -> Self {
        self.conversation = Some(conversation);
        self
    }

    /// When off, non-directive turns get a local acknowledgement instead of
    /// a planned tool call.
    pub fn auto_plan(mut self, enable: bool) -> Self {
        self.auto_plan = enable;
        self
    }

    pub fn build(self) -> Orchestrator {
        Orchestrator {
            inner: Arc::new(Inner {
                transport: self.transport,
                planner: self.planner.unwrap_or_else(|| Planner::new(None)),
                summarizer: self.summarizer.unwrap_or_else(|| Summarizer::new(None)),
                conversation: self.conversation.unwrap_or_default(),
                auto_plan: self.auto_plan,
                catalog: RwLock::new(Vec::new()),
            }),
        }
    }
}

impl Orchestrator {
    /// Default planner and summarizer (heuristic and template only).
    pub fn new(transport: Arc<dyn ToolTransport>) -> Self {
        Self::builder(transport).build()
    }

    pub fn builder(transport: Arc<dyn ToolTransport>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(transport)
    }

    /// Wire the HTTP tool client and the configured model backends.
    ///
    /// Provider order is remote route (if enabled), model (if configured),
    /// then the deterministic fallback.
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        let transport: Arc<dyn ToolTransport> = Arc::new(McpHttpClient::new(config)?);
        Self::from_config_with_transport(config, transport)
    }

    /// Same provider wiring as [`Self::from_config`] over any transport.
    pub fn from_config_with_transport(
        config: &ChatConfig,
        transport: Arc<dyn ToolTransport>,
    ) -> Result<Self> {
        let model: Option<Arc<dyn LanguageModel>> = match HttpLanguageModel::from_config(config)? {
            Some(m) => Some(Arc::new(m)),
            None => None,
        };

        let mut plan_providers: Vec<Arc<dyn PlanProvider>> = Vec::new();
        let mut summary_providers: Vec<Arc<dyn SummaryProvider>> = Vec::new();
        if config.remote_llm {
            plan_providers.push(Arc::new(RemotePlanProvider::new(&config.api_base)));
            summary_providers.push(Arc::new(RemoteSummaryProvider::new(&config.api_base)));
        }
        if let Some(model) = model {
            plan_providers.push(Arc::new(ModelPlanProvider::new(model.clone())));
            summary_providers.push(Arc::new(ModelSummaryProvider::new(model)));
        }
        plan_providers.push(Arc::new(HeuristicPlanProvider));

        Ok(Self::builder(transport)
            .planner(Planner::with_providers(plan_providers))
            .summarizer(Summarizer::with_providers(summary_providers))
            .auto_plan(config.auto_plan)
            .build())
    }

    pub fn conversation(&self) -> &Conversation {
        &self.inner.conversation
    }

    pub fn auto_plan(&self) -> bool {
        self.inner.auto_plan
    }

    /// Greet and connect. A failed connection is recorded as a system
    /// message; later turns connect lazily.
    pub async fn start(&self) -> Result<()> {
        self.inner.conversation.append(Message::system(GREETING));
        match self.inner.transport.connect().await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(target: "orchestrator", error = %e, "Initial connect failed");
                self.inner
                    .conversation
                    .append(Message::system(format!("Failed to connect MCP: {}", e)));
                Err(e)
            }
        }
    }

    /// Run `op`, connecting first if needed. A not-connected failure is
    /// repaired by connecting and retrying once; other errors pass through.
    async fn connected<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let transport = &self.inner.transport;
        if !transport.is_connected() {
            transport.connect().await?;
        }
        match op().await {
            Err(e) if e.is_not_connected() => {
                debug!(target: "orchestrator", "Transport reported not connected; reconnecting once");
                transport.connect().await?;
                op().await
            }
            other => other,
        }
    }

    async fn fetch_catalog(&self) -> Result<Vec<ToolDescriptor>> {
        let transport = &self.inner.transport;
        let tools = self.connected(move || transport.list_tools()).await?;
        *self.inner.catalog.write().unwrap_or_else(|e| e.into_inner()) = tools.clone();
        Ok(tools)
    }

    /// Last fetched catalog.
    pub fn tools(&self) -> Vec<ToolDescriptor> {
        self.inner
            .catalog
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Re-fetch the catalog, replacing the cached one, and report it in the
    /// conversation.
    pub async fn refresh_tools(&self) -> Result<Vec<ToolDescriptor>> {
        match self.fetch_catalog().await {
            Ok(tools) => {
                let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
                self.inner
                    .conversation
                    .append(Message::assistant(format!("Tools: {}", names.join(", "))));
                Ok(tools)
            }
            Err(e) => {
                self.inner
                    .conversation
                    .append(Message::assistant(format!("List tools failed: {}", e)));
                Err(e)
            }
        }
    }

    /// `- name: description` lines for the cached catalog.
    pub fn tool_hint(&self) -> String {
        self.tools()
            .iter()
            .map(|t| {
                if t.description.is_empty() {
                    format!("- {}", t.name)
                } else {
                    format!("- {}: {}", t.name, t.description)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Run a turn in the background.
    pub fn submit(&self, text: impl Into<String>) -> JoinHandle<TurnOutcome> {
        let this = self.clone();
        let text = text.into();
        tokio::spawn(async move { this.handle_turn(&text).await })
    }

    /// Run one turn to completion.
    #[tracing::instrument(name = "orchestrator.turn", skip(self, text))]
    pub async fn handle_turn(&self, text: &str) -> TurnOutcome {
        let text = text.trim();
        if text.is_empty() {
            return TurnOutcome::Ignored;
        }
        let conv = &self.inner.conversation;

        transition(TurnState::Idle, TurnState::Detecting);
        conv.append(Message::user(text));

        if let Some(directive) = parse_directive(text) {
            if !directive.args_parsed {
                debug!(target: "orchestrator", raw = %directive.raw_args, "Directive arguments are not a JSON object; sending {{}}");
            }
            let invocation = directive.into_invocation();
            let message = conv.append(
                Message::pending(MessageRole::Assistant)
                    .with_step(format!("Calling tool: {}", invocation.name)),
            );
            transition(TurnState::Detecting, TurnState::Executing);
            return self.execute(message, invocation).await;
        }

        if !self.inner.auto_plan {
            let message = conv.append(Message::assistant(format!("(local) You said: {}", text)));
            transition(TurnState::Detecting, TurnState::Done);
            return TurnOutcome::Echoed { message };
        }

        transition(TurnState::Detecting, TurnState::Planning);
        let message = conv.append(Message::pending(MessageRole::Assistant).with_step("Planning tool call"));

        let catalog = match self.fetch_catalog().await {
            Ok(tools) => tools,
            Err(e) => return self.fail(message, TurnState::Planning, format!("Error: {}", e)),
        };
        let plan = match self.inner.planner.plan(&catalog, text).await {
            Ok(plan) => plan,
            Err(e) => {
                return self.fail(
                    message,
                    TurnState::Planning,
                    format!("Sorry, I couldn't work out which tool to call: {}", e),
                )
            }
        };

        let Some(invocation) = plan.into_invocation() else {
            conv.update_by_id(
                message,
                MessagePatch::new().step("No suitable tool").text(NO_TOOL_TEXT).done(),
            );
            transition(TurnState::Planning, TurnState::Done);
            return TurnOutcome::NoTool { message };
        };

        conv.update_by_id(
            message,
            MessagePatch::new().step(format!("Calling tool: {}", invocation.name)),
        );
        transition(TurnState::Planning, TurnState::Executing);
        self.execute(message, invocation).await
    }

    async fn execute(&self, message: MessageId, invocation: Invocation) -> TurnOutcome {
        let conv = &self.inner.conversation;
        let Invocation { name, args } = invocation;
        conv.update_by_id(
            message,
            MessagePatch::new().step(format!("Args: {}", Value::Object(args.clone()))),
        );

        let transport = &self.inner.transport;
        let (tool, tool_args) = (name.as_str(), &args);
        let result = self
            .connected(move || transport.invoke(tool, tool_args.clone()))
            .await;
        let result = match result {
            Ok(v) => v,
            Err(e) => return self.fail(message, TurnState::Executing, format!("Error: {}", e)),
        };

        info!(target: "orchestrator", tool = %name, "Tool call finished");
        conv.update_by_id(
            message,
            MessagePatch::new()
                .step(format!("Result: {}", preview(&result)))
                .text(serde_json::to_string_pretty(&result).unwrap_or_else(|_| result.to_string()))
                .done(),
        );

        transition(TurnState::Executing, TurnState::Summarizing);
        let summary_message = conv.append(Message::pending(MessageRole::Assistant));
        let summary = self.inner.summarizer.summarize(&name, &args, &result).await;
        conv.update_by_id(summary_message, MessagePatch::new().text(summary).done());
        transition(TurnState::Summarizing, TurnState::Done);

        TurnOutcome::Completed {
            tool_message: message,
            summary_message,
            result,
        }
    }

    fn fail(&self, message: MessageId, from: TurnState, error: String) -> TurnOutcome {
        warn!(target: "orchestrator", state = ?from, error = %error, "Turn failed");
        self.inner
            .conversation
            .update_by_id(message, MessagePatch::failed(error.clone()));
        transition(from, TurnState::Done);
        TurnOutcome::Failed {
            message,
            error,
            at: from,
        }
    }
}

fn transition(from: TurnState, to: TurnState) {
    debug!(target: "orchestrator", ?from, ?to, "Turn state");
}

fn preview(value: &Value) -> String {
    let s = value.to_string();
    match s.char_indices().nth(STEP_PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s,
    }
}
