//! Conversation state
//!
//! The ordered message history handed from turn to turn. A state value is
//! never edited during a graph execution: handlers produce messages and the
//! graph returns a new state with those messages appended.

use crate::models::Message;
use serde::{Deserialize, Serialize};

/// Append-only conversation history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    messages: Vec<Message>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    // =============================
    // Iterators (ZERO ALLOCATION)
    // =============================

    /// Iterate over all messages in chronological order
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Messages at or after `offset`
    pub fn since(&self, offset: usize) -> &[Message] {
        self.messages.get(offset..).unwrap_or(&[])
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn latest(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Copy of this state with `message` appended
    pub fn with_message(&self, message: Message) -> Self {
        self.with_messages(std::iter::once(message))
    }

    /// Copy of this state with `messages` appended in order
    pub fn with_messages<I>(&self, messages: I) -> Self
    where
        I: IntoIterator<Item = Message>,
    {
        let mut next = self.messages.clone();
        next.extend(messages);
        Self { messages: next }
    }
}
