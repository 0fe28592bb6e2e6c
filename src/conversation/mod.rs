//! Conversation types and session state
//!
//! Each chat session owns an ordered message log whose first entry is always
//! the fixed system prompt. Logs are bounded: after every push the log is
//! trimmed to `limit` messages, keeping the system prompt and the most recent
//! exchanges. Sessions are keyed by a client-supplied (or server-generated)
//! id and locked independently, so concurrent requests on different sessions
//! never interleave their appends. Two requests racing on the *same* session
//! id can still interleave between the user push and the assistant push;
//! callers that need strict alternation must serialize their own requests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Ordered message log for one session, bounded to `limit` entries.
#[derive(Debug)]
pub struct ConversationLog {
    messages: Vec<Message>,
    limit: usize,
}

impl ConversationLog {
    pub fn new(limit: usize) -> Self {
        Self {
            messages: vec![Message {
                role: Role::System,
                content: SYSTEM_PROMPT.to_string(),
            }],
            // A limit of 0 would evict the system prompt itself.
            limit: limit.max(1),
        }
    }

    pub fn push_user(&mut self, content: &str) {
        self.push(Role::User, content);
    }

    pub fn push_assistant(&mut self, content: &str) {
        self.push(Role::Assistant, content);
    }

    fn push(&mut self, role: Role, content: &str) {
        self.messages.push(Message {
            role,
            content: content.to_string(),
        });
        self.trim();
    }

    /// Full ordered log, system prompt first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Drop the oldest non-system messages until the log fits the limit.
    fn trim(&mut self) {
        if self.messages.len() > self.limit {
            let excess = self.messages.len() - self.limit;
            self.messages.drain(1..1 + excess);
        }
    }
}

/// Session-keyed conversation logs, each behind its own lock.
pub struct SessionStore {
    limit: usize,
    sessions: RwLock<HashMap<String, Arc<Mutex<ConversationLog>>>>,
}

impl SessionStore {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Get or create the log for `id`.
    pub fn log(&self, id: &str) -> Arc<Mutex<ConversationLog>> {
        if let Some(log) = self.sessions.read().unwrap().get(id) {
            return Arc::clone(log);
        }
        let mut sessions = self.sessions.write().unwrap();
        Arc::clone(
            sessions
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(ConversationLog::new(self.limit)))),
        )
    }

    pub fn new_session_id() -> String {
        Uuid::new_v4().to_string()
    }
}
