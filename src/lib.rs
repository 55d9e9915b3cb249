//! # mcp-chat-rust
//!
//! Conversational client for tool servers speaking MCP over streamable HTTP.
//!
//! ## Overview
//!
//! Each user turn is either an explicit `/tool <name> <jsonArgs>` directive
//! or free text. Free text is planned into at most one tool call, by a
//! language model when one is configured and by keyword heuristics
//! otherwise. The tool result is shown verbatim and then summarized in a
//! follow-up message. Turns run concurrently and never leave a message in
//! the loading state.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mcp_chat_rust::{ChatConfig, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> mcp_chat_rust::Result<()> {
//!     let orchestrator = Orchestrator::from_config(&ChatConfig::from_env()?)?;
//!     let _ = orchestrator.start().await;
//!
//!     orchestrator.handle_turn(r#"/tool math.add {"a": 2, "b": 3}"#).await;
//!     for msg in orchestrator.conversation().messages() {
//!         println!("{}: {}", msg.role, msg.display_text());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`transport`] | `ToolTransport` seam and the MCP HTTP client |
//! | [`tools`] | In-process reference tools |
//! | [`llm`] | Language model seam and the OpenAI-compatible backend |
//! | [`planner`] | Utterance to tool-call planning with fallbacks |
//! | [`summarizer`] | Natural-language summaries of tool results |
//! | [`conversation`] | Shared, id-addressed message store |
//! | [`orchestrator`] | Per-turn state machine |
//! | [`types`] | Messages, tool descriptors, plans |

pub mod config;
pub mod conversation;
pub mod llm;
pub mod orchestrator;
pub mod planner;
pub mod summarizer;
pub mod tools;
pub mod transport;
pub mod types;

pub use config::ChatConfig;
pub use conversation::Conversation;
pub use orchestrator::{Orchestrator, OrchestratorBuilder, TurnOutcome, TurnState};
pub use transport::{McpHttpClient, ToolTransport};
pub use types::{Message, MessageId, MessagePatch, MessageRole, Plan, ToolArgs, ToolDescriptor};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
