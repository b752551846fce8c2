//! Session types.

use serde::{Deserialize, Serialize};

/// Message role in a conversation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message
    User,
    /// Assistant (AI) response
    Assistant,
    /// System message (optional prompt preamble)
    System,
}

impl MessageRole {
    /// Convert to the wire-format string.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }

    /// Parse from the wire-format string.
    pub fn parse(s: &str) -> Self {
        match s {
            "assistant" => Self::Assistant,
            "system" => Self::System,
            _ => Self::User,
        }
    }
}

/// A single message in a conversation session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role (user/assistant/system)
    pub role: MessageRole,
    /// Message content
    pub content: String,
}

/// Per-user conversation state.
///
/// A session exists only between its creation (first non-reset message) and
/// its deletion (reset keyword or idle expiry). `username` is fixed at
/// creation; `messages` preserves conversation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Display name captured from the first message.
    pub username: String,
    /// Ordered conversation history.
    pub messages: Vec<ChatMessage>,
    /// Unix timestamp (seconds) of the most recent inbound message.
    pub last_activity: i64,
}

impl Session {
    /// Create an empty session.
    pub fn new(username: impl Into<String>, now: i64) -> Self {
        Self {
            username: username.into(),
            messages: Vec::new(),
            last_activity: now,
        }
    }

    /// Record inbound activity.
    pub fn touch(&mut self, now: i64) {
        self.last_activity = now;
    }

    /// Append a message, preserving order.
    pub fn push(&mut self, role: MessageRole, content: impl Into<String>) {
        self.messages.push(ChatMessage {
            role,
            content: content.into(),
        });
    }

    /// Seconds since the last inbound message.
    pub fn idle_secs(&self, now: i64) -> i64 {
        now - self.last_activity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [MessageRole::User, MessageRole::Assistant, MessageRole::System] {
            assert_eq!(MessageRole::parse(role.as_str()), role);
        }
        // Unknown roles fall back to user.
        assert_eq!(MessageRole::parse("tool"), MessageRole::User);
    }

    #[test]
    fn test_push_preserves_order() {
        let mut session = Session::new("alice", 100);
        session.push(MessageRole::User, "hi");
        session.push(MessageRole::Assistant, "hello");
        session.push(MessageRole::User, "bye");

        let contents: Vec<&str> = session.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hi", "hello", "bye"]);
    }

    #[test]
    fn test_idle_secs() {
        let mut session = Session::new("alice", 100);
        assert_eq!(session.idle_secs(160), 60);
        session.touch(200);
        assert_eq!(session.idle_secs(200), 0);
    }
}
