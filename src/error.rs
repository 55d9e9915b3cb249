use crate::transport::TransportError;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "config.mcp_url", "plan.name")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., the raw model output)
    pub details: Option<String>,
    /// Source of the error (e.g., "planner", "config")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the tool-call pipeline.
///
/// Every failure a turn can hit lands in one of these categories; the
/// orchestrator renders them as assistant messages, never as panics.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Connection error ({endpoint}): {message}")]
    Connection { endpoint: String, message: String },

    #[error("Tool endpoint not connected")]
    NotConnected,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Tool '{tool}' failed: {message}")]
    Invocation { tool: String, message: String },

    #[error("Planning error: {message}{}", format_context(.context))]
    Planning {
        message: String,
        context: ErrorContext,
    },

    #[error("Language model error ({provider}): {message}")]
    Model { provider: String, message: String },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    pub fn connection(endpoint: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::Connection {
            endpoint: endpoint.into(),
            message: msg.into(),
        }
    }

    pub fn invocation(tool: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::Invocation {
            tool: tool.into(),
            message: msg.into(),
        }
    }

    pub fn model(provider: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::Model {
            provider: provider.into(),
            message: msg.into(),
        }
    }

    /// Create a new planning error with structured context
    pub fn planning_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Planning {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn is_not_connected(&self) -> bool {
        matches!(self, Error::NotConnected)
    }

    /// Stable error code string for diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Connection { .. } => "CONNECTION_ERROR",
            Error::NotConnected => "NOT_CONNECTED",
            Error::Transport(_) => "TRANSPORT_ERROR",
            Error::Invocation { .. } => "INVOCATION_ERROR",
            Error::Planning { .. } => "PLANNING_ERROR",
            Error::Model { .. } => "MODEL_ERROR",
            Error::Configuration { .. } => "CONFIG_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::Io(_) => "IO_ERROR",
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Planning { context, .. } | Error::Configuration { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::NotConnected.code(), "NOT_CONNECTED");
        assert_eq!(Error::invocation("ping", "boom").code(), "INVOCATION_ERROR");
        assert_eq!(
            Error::connection("http://x", "refused").code(),
            "CONNECTION_ERROR"
        );
    }

    #[test]
    fn test_invocation_error_names_tool() {
        let err = Error::invocation("math.add", "timed out after 60000 ms");
        let text = err.to_string();
        assert!(text.contains("math.add"));
        assert!(text.contains("timed out"));
    }

    #[test]
    fn test_planning_context_formatting() {
        let err = Error::planning_with_context(
            "no provider produced a plan",
            ErrorContext::new().with_source("planner"),
        );
        assert_eq!(
            err.to_string(),
            "Planning error: no provider produced a plan (source: planner)"
        );
        assert_eq!(err.context().and_then(|c| c.source.as_deref()), Some("planner"));
    }
}
