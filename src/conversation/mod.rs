//! Conversation state: messages keyed by id, displayed in insertion order.
//!
//! The orchestrator is the only writer. Turns run concurrently and each one
//! mutates its own messages by id, so completion order never affects display
//! order.

use crate::types::{Message, MessageId, MessagePatch};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

#[derive(Default)]
struct State {
    by_id: HashMap<MessageId, Message>,
    order: Vec<MessageId>,
}

/// Shared handle; clones observe the same conversation.
#[derive(Clone, Default)]
pub struct Conversation {
    state: Arc<RwLock<State>>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return its id.
    pub fn append(&self, message: Message) -> MessageId {
        let id = message.id;
        let mut st = self.state.write().unwrap_or_else(|e| e.into_inner());
        if st.by_id.insert(id, message).is_none() {
            st.order.push(id);
        } else {
            warn!(target: "conversation", %id, "Duplicate message id replaced in place");
        }
        id
    }

    /// Merge `patch` into the message with `id`. Returns false when no such
    /// message exists (e.g. after a reset).
    pub fn update_by_id(&self, id: MessageId, patch: MessagePatch) -> bool {
        let mut st = self.state.write().unwrap_or_else(|e| e.into_inner());
        match st.by_id.get_mut(&id) {
            Some(message) => {
                message.apply(patch);
                true
            }
            None => {
                debug!(target: "conversation", %id, "Update for unknown message dropped");
                false
            }
        }
    }

    pub fn get(&self, id: MessageId) -> Option<Message> {
        let st = self.state.read().unwrap_or_else(|e| e.into_inner());
        st.by_id.get(&id).cloned()
    }

    /// Snapshot of all messages in insertion order.
    pub fn messages(&self) -> Vec<Message> {
        let st = self.state.read().unwrap_or_else(|e| e.into_inner());
        st.order
            .iter()
            .filter_map(|id| st.by_id.get(id).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().unwrap_or_else(|e| e.into_inner()).order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of messages still loading.
    pub fn pending(&self) -> usize {
        let st = self.state.read().unwrap_or_else(|e| e.into_inner());
        st.by_id.values().filter(|m| m.loading).count()
    }

    /// Drop every message.
    pub fn reset(&self) {
        let mut st = self.state.write().unwrap_or_else(|e| e.into_inner());
        st.by_id.clear();
        st.order.clear();
    }
}
