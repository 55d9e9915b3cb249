//! Core data types shared by the pipeline stages.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ToolDescriptor`] | A tool as advertised by the endpoint's catalog |
//! | [`Invocation`] | A tool name plus its argument object |
//! | [`Plan`] | The planner's decision: at most one tool and its arguments |
//! | [`Message`] | A conversation entry with an asynchronous lifecycle |
//! | [`MessagePatch`] | A partial update applied to a message by identifier |

pub mod message;
pub mod tool;

pub use message::{Message, MessageId, MessagePatch, MessageRole};
pub use tool::{Invocation, Plan, ToolArgs, ToolDescriptor};
