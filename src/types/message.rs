//! Conversation message with an asynchronous lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique, never-reused message identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        })
    }
}

/// A single conversation entry.
///
/// Messages start either terminal (synchronous echoes) or with
/// `loading == true`; a loading message is resolved exactly once, with
/// `text` or `error`. `steps` only ever grows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: MessageRole,
    pub text: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub loading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Message {
    fn terminal(role: MessageRole, text: String) -> Self {
        Self {
            id: MessageId::new(),
            role,
            text,
            steps: Vec::new(),
            loading: false,
            error: None,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::terminal(MessageRole::System, text.into())
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::terminal(MessageRole::User, text.into())
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::terminal(MessageRole::Assistant, text.into())
    }

    /// A message whose content is still being produced.
    pub fn pending(role: MessageRole) -> Self {
        Self {
            loading: true,
            ..Self::terminal(role, String::new())
        }
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.steps.push(step.into());
        self
    }

    pub fn is_terminal(&self) -> bool {
        !self.loading
    }

    /// Text to show: the error when one is set, else the body.
    pub fn display_text(&self) -> &str {
        self.error.as_deref().unwrap_or(&self.text)
    }

    pub(crate) fn apply(&mut self, patch: MessagePatch) {
        if let Some(text) = patch.text {
            self.text = text;
        }
        self.steps.extend(patch.steps);
        if let Some(loading) = patch.loading {
            self.loading = loading;
        }
        if let Some(error) = patch.error {
            self.error = Some(error);
        }
    }
}

/// Partial update merged into a message. `steps` are appended, never
/// replacing what is already there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessagePatch {
    pub text: Option<String>,
    pub steps: Vec<String>,
    pub loading: Option<bool>,
    pub error: Option<String>,
}

impl MessagePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn step(mut self, step: impl Into<String>) -> Self {
        self.steps.push(step.into());
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Mark the message terminal.
    pub fn done(mut self) -> Self {
        self.loading = Some(false);
        self
    }

    /// Terminal failure carrying `error`.
    pub fn failed(error: impl Into<String>) -> Self {
        Self::new().error(error).done()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = Message::user("hi");
        let b = Message::user("hi");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_patch_appends_steps() {
        let mut msg = Message::pending(MessageRole::Assistant).with_step("Calling tool: ping");
        msg.apply(MessagePatch::new().step("Args: {}"));
        msg.apply(MessagePatch::new().step("Result: \"pong\"").text("\"pong\"").done());
        assert_eq!(
            msg.steps,
            vec!["Calling tool: ping", "Args: {}", "Result: \"pong\""]
        );
        assert_eq!(msg.text, "\"pong\"");
        assert!(msg.is_terminal());
    }

    #[test]
    fn test_failed_patch_sets_error_and_terminates() {
        let mut msg = Message::pending(MessageRole::Assistant);
        msg.apply(MessagePatch::failed("Error: boom"));
        assert!(!msg.loading);
        assert_eq!(msg.display_text(), "Error: boom");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_value(Message::system("x")).unwrap();
        assert_eq!(json["role"], "system");
        assert!(json.get("error").is_none());
    }
}
