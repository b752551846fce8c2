//! Session lifecycle rules: reset keywords, idle expiry, history truncation.

use super::types::Session;
use chatrelay_common::config::SessionConfig;

/// Decides, for an incoming message, whether a session resets, expires, or
/// continues, and bounds its retained history.
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    /// Maximum prior entries retained before the new message is appended.
    max_conversation_length: usize,
    /// Idle gap in seconds after which a session expires.
    max_time_gap_secs: i64,
    /// Normalized (lowercased) reset keywords.
    reset_keywords: Vec<String>,
}

impl SessionPolicy {
    /// Build a policy from configuration.
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            max_conversation_length: config.max_conversation_length,
            max_time_gap_secs: config.max_time_gap_minutes * 60,
            reset_keywords: config
                .reset_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
        }
    }

    /// Whether the entire message is a reset keyword.
    ///
    /// The text is trimmed and lowercased before comparison; a keyword inside
    /// a longer sentence does not match.
    pub fn matches_reset(&self, text: &str) -> bool {
        let normalized = text.trim().to_lowercase();
        self.reset_keywords.iter().any(|k| *k == normalized)
    }

    /// Whether the session has been idle for at least the configured gap.
    pub fn is_expired(&self, session: &Session, now: i64) -> bool {
        session.idle_secs(now) >= self.max_time_gap_secs
    }

    /// Bound retained history to the last `max_conversation_length` entries.
    ///
    /// Applied before the new incoming message is appended, so the list may
    /// transiently hold `max_conversation_length + 1` entries after the
    /// append. That off-by-one is the retained historical behavior.
    pub fn truncate(&self, session: &mut Session) {
        let len = session.messages.len();
        if len > self.max_conversation_length {
            session.messages.drain(..len - self.max_conversation_length);
        }
    }
}

impl From<&SessionConfig> for SessionPolicy {
    fn from(config: &SessionConfig) -> Self {
        Self::new(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::types::MessageRole;

    fn policy() -> SessionPolicy {
        SessionPolicy::new(&SessionConfig::default())
    }

    #[test]
    fn test_reset_matches_normalized() {
        let policy = policy();
        assert!(policy.matches_reset("restart"));
        assert!(policy.matches_reset("  Restart  "));
        assert!(policy.matches_reset("NEW"));
        assert!(policy.matches_reset("刷新"));
        assert!(policy.matches_reset("00"));
    }

    #[test]
    fn test_reset_requires_full_match() {
        let policy = policy();
        assert!(!policy.matches_reset("please restart the conversation"));
        assert!(!policy.matches_reset("renewal"));
        assert!(!policy.matches_reset(""));
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let policy = policy(); // 30 minutes
        let session = Session::new("alice", 1000);

        assert!(!policy.is_expired(&session, 1000 + 1799));
        assert!(policy.is_expired(&session, 1000 + 1800));
        assert!(policy.is_expired(&session, 1000 + 1860));
    }

    #[test]
    fn test_truncate_keeps_newest() {
        let policy = policy(); // limit 10
        let mut session = Session::new("alice", 0);
        for i in 0..12 {
            session.push(MessageRole::User, format!("m{i}"));
        }

        policy.truncate(&mut session);

        assert_eq!(session.messages.len(), 10);
        assert_eq!(session.messages[0].content, "m2");
        assert_eq!(session.messages[9].content, "m11");
    }

    #[test]
    fn test_truncate_below_limit_is_noop() {
        let policy = policy();
        let mut session = Session::new("alice", 0);
        for i in 0..10 {
            session.push(MessageRole::User, format!("m{i}"));
        }

        policy.truncate(&mut session);
        assert_eq!(session.messages.len(), 10);
        assert_eq!(session.messages[0].content, "m0");
    }
}
