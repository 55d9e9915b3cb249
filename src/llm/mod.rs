//! Language-model backends.
//!
//! The pipeline only needs "system + user prompt in, text out". Two
//! providers implement that:
//! - [`HttpLanguageModel`]: a server-hosted OpenAI-compatible backend
//! - [`FnLanguageModel`]: an in-process completion function

mod client;

pub use client::HttpLanguageModel;
pub(crate) use client::remote_client;

use crate::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: 0.0,
            max_tokens: 512,
        }
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = n;
        self
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Short provider label used in logs and errors.
    fn name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

type CompletionFn = dyn Fn(CompletionRequest) -> BoxFuture<'static, Result<String>> + Send + Sync;

/// In-process backend wrapping a completion function.
#[derive(Clone)]
pub struct FnLanguageModel {
    name: String,
    f: Arc<CompletionFn>,
}

impl FnLanguageModel {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(CompletionRequest) -> BoxFuture<'static, Result<String>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            f: Arc::new(f),
        }
    }

    /// A backend that always answers with `text`.
    pub fn fixed(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new("fixed", move |_| {
            let text = text.clone();
            async move { Ok(text) }.boxed()
        })
    }

    /// A backend that always fails, as an unreachable server would.
    pub fn unavailable() -> Self {
        Self::new("unavailable", |_| {
            async { Err(crate::Error::model("unavailable", "backend unreachable")) }.boxed()
        })
    }
}

#[async_trait]
impl LanguageModel for FnLanguageModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        (self.f)(request).await
    }
}
