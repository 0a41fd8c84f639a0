//! Per-session conversation history
//!
//! A bounded, ordered message log kept next to the behavior summary so the
//! inference request can carry recent dialogue. Oldest messages are dropped
//! first once the capacity is reached.

use crate::clock::{Clock, SystemClock};
use crate::config::DEFAULT_HISTORY_CAPACITY;
use crate::storage::Storage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// One message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Message stamped with the current wall-clock time
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self::at(role, content, Utc::now())
    }

    pub fn at(role: MessageRole, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp,
        }
    }
}

fn default_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

/// Ordered message log for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationHistory {
    pub session_id: String,
    pub messages: Vec<ChatMessage>,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "default_capacity")]
    capacity: usize,
}

impl ConversationHistory {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self::with_capacity(session_id, DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(session_id: impl Into<String>, capacity: usize) -> Self {
        Self {
            session_id: session_id.into(),
            messages: Vec::new(),
            updated_at: Utc::now(),
            capacity: capacity.max(1),
        }
    }

    /// Append a message, dropping the oldest ones beyond capacity
    pub fn push(&mut self, message: ChatMessage) {
        self.updated_at = message.timestamp;
        self.messages.push(message);
        self.truncate();
    }

    /// Up to `n` most recent messages, oldest first
    pub fn recent(&self, n: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    fn truncate(&mut self) {
        let capacity = self.capacity.max(1);
        if self.messages.len() > capacity {
            let excess = self.messages.len() - capacity;
            self.messages.drain(..excess);
        }
    }
}

/// Conversation persistence with storage failures degraded to empty history
pub struct ConversationStore<S: Storage, C: Clock = SystemClock> {
    storage: S,
    clock: C,
    capacity: usize,
}

impl<S: Storage> ConversationStore<S> {
    pub fn new(storage: S) -> Self {
        Self::with_clock(storage, SystemClock)
    }
}

impl<S: Storage, C: Clock> ConversationStore<S, C> {
    pub fn with_clock(storage: S, clock: C) -> Self {
        Self {
            storage,
            clock,
            capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Stored history, or an empty one if absent or unreadable
    pub fn get(&self, session_id: &str) -> ConversationHistory {
        match self.storage.load_conversation(session_id) {
            Ok(Some(mut history)) => {
                history.capacity = self.capacity;
                history.truncate();
                history
            }
            Ok(None) => self.empty(session_id),
            Err(e) => {
                warn!(session_id, error = %e, "failed to load conversation, starting empty");
                self.empty(session_id)
            }
        }
    }

    /// Load, append, truncate and persist. Returns the updated history even
    /// when the write fails.
    pub fn append(&self, session_id: &str, message: ChatMessage) -> ConversationHistory {
        let mut history = self.get(session_id);
        history.push(message);
        self.save(&history);
        history
    }

    /// Empty the stored history for a session
    pub fn clear(&self, session_id: &str) -> ConversationHistory {
        let history = self.empty(session_id);
        self.save(&history);
        history
    }

    fn empty(&self, session_id: &str) -> ConversationHistory {
        let mut history = ConversationHistory::with_capacity(session_id, self.capacity);
        history.updated_at = self.clock.now();
        history
    }

    fn save(&self, history: &ConversationHistory) {
        match self.storage.save_conversation(history) {
            Ok(()) => debug!(session_id = %history.session_id, messages = history.len(), "conversation saved"),
            Err(e) => warn!(session_id = %history.session_id, error = %e, "failed to save conversation"),
        }
    }
}
