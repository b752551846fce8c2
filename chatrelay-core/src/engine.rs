//! Conversation engine: the single entry point invoked per incoming message.
//!
//! Orchestrates session policy, history, prompt assembly, and the completion
//! call. All provider failures degrade to an empty reply; nothing here
//! propagates as a fault to the webhook layer.

use crate::prompt::PromptAssembler;
use crate::provider::{ChatRequest, Provider, Usage};
use crate::session::policy::SessionPolicy;
use crate::session::store::SessionStore;
use crate::session::types::{MessageRole, Session};
use chatrelay_common::config::Config;
use chrono::Utc;
use std::sync::Arc;

/// Engine knobs taken from configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Model identifier passed to the provider.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Optional generation cap.
    pub max_tokens: Option<i64>,
    /// Text echoed back on a reset keyword.
    pub reset_echo: String,
}

impl EngineSettings {
    /// Extract engine settings from the root config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.openai.model.clone(),
            temperature: config.openai.temperature,
            max_tokens: config.openai.max_tokens,
            reset_echo: config.session.reset_echo.clone(),
        }
    }
}

/// Outcome of handling one inbound message.
///
/// A tagged outcome rather than a bare string pair, so callers and tests can
/// tell "no reply needed" from "failed to reply". [`Reply::into_parts`]
/// collapses it back to the `(text, usage)` pair the channel sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Session cleared by a reset keyword; echo the separator, no model call.
    Reset { echo: String },
    /// Normal completion.
    Answer { text: String, usage: String },
    /// Provider finished for an abnormal reason (length, content filter, ...).
    AbnormalFinish { reason: String },
    /// Provider call failed outright.
    Failed,
}

impl Reply {
    /// Collapse to the `(text, usage)` pair delivered to the user. Both
    /// degraded variants yield empty strings.
    pub fn into_parts(self) -> (String, String) {
        match self {
            Self::Reset { echo } => (echo, String::new()),
            Self::Answer { text, usage } => (text, usage),
            Self::AbnormalFinish { .. } | Self::Failed => (String::new(), String::new()),
        }
    }
}

/// Per-message orchestrator over store, policy, assembler, and provider.
pub struct ConversationEngine {
    store: Arc<dyn SessionStore>,
    policy: SessionPolicy,
    assembler: PromptAssembler,
    provider: Arc<dyn Provider>,
    settings: EngineSettings,
}

impl ConversationEngine {
    /// Create an engine from its collaborators.
    pub fn new(
        store: Arc<dyn SessionStore>,
        policy: SessionPolicy,
        assembler: PromptAssembler,
        provider: Arc<dyn Provider>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            policy,
            assembler,
            provider,
            settings,
        }
    }

    /// Handle one inbound message for a user.
    ///
    /// `username` is only consulted when a new session is created.
    pub async fn handle(&self, user_id: &str, username: &str, text: &str) -> Reply {
        if self.policy.matches_reset(text) {
            if self.store.get(user_id).is_some() {
                self.store.delete(user_id);
                tracing::info!(user_id, "Session reset by keyword");
            }
            return Reply::Reset {
                echo: self.settings.reset_echo.clone(),
            };
        }

        let now = Utc::now().timestamp();
        let mut session = match self.store.get(user_id) {
            Some(existing) if self.policy.is_expired(&existing, now) => {
                self.store.delete(user_id);
                tracing::info!(
                    user_id,
                    idle_secs = existing.idle_secs(now),
                    "Session expired, starting fresh"
                );
                Session::new(username, now)
            }
            Some(mut existing) => {
                existing.touch(now);
                self.policy.truncate(&mut existing);
                existing
            }
            None => Session::new(username, now),
        };

        session.push(MessageRole::User, text);
        // Persist before the provider call: a hard failure must still leave
        // the user message in history.
        self.store.put(user_id, session.clone());

        let request = ChatRequest {
            model: self.settings.model.clone(),
            messages: self.assembler.assemble(&session),
            max_tokens: self.settings.max_tokens,
            temperature: Some(self.settings.temperature),
        };

        tracing::debug!(
            user_id,
            history_len = session.messages.len(),
            "Requesting completion"
        );

        match self.provider.chat(request).await {
            Ok(response) => match response.finish_reason.as_deref() {
                Some("stop") => {
                    session.push(MessageRole::Assistant, response.content.as_str());
                    self.store.put(user_id, session);
                    Reply::Answer {
                        text: response.content,
                        usage: format_usage(&response.usage),
                    }
                }
                reason => {
                    let reason = reason.unwrap_or("unknown").to_string();
                    tracing::warn!(user_id, %reason, "Abnormal finish reason");
                    session.push(
                        MessageRole::Assistant,
                        format!("error: stop reason - {reason}"),
                    );
                    self.store.put(user_id, session);
                    Reply::AbnormalFinish { reason }
                }
            },
            Err(e) => {
                tracing::error!(user_id, error = %e, "Completion call failed");
                Reply::Failed
            }
        }
    }
}

/// Format token-usage counts as the block appended to the reply.
fn format_usage(usage: &Usage) -> String {
    format!(
        "---Tokens usage---\n    prompt_tokens: {},\n    completion_tokens: {},\n    total_tokens: {}",
        usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ChatResponse, ProviderError};
    use crate::session::store::MemoryStore;
    use async_trait::async_trait;
    use chatrelay_common::config::SessionConfig;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Provider that replays scripted outcomes and records requests.
    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<ChatResponse, ProviderError>>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<ChatResponse, ProviderError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn recorded_requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
            self.requests.lock().unwrap().push(request);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("script exhausted")
        }
    }

    fn answer(content: &str) -> Result<ChatResponse, ProviderError> {
        Ok(ChatResponse {
            model: "gpt-3.5-turbo".into(),
            content: content.into(),
            finish_reason: Some("stop".into()),
            usage: Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
            latency_ms: 1,
        })
    }

    fn failure() -> Result<ChatResponse, ProviderError> {
        Err(ProviderError {
            provider: "scripted".into(),
            model: "gpt-3.5-turbo".into(),
            message: "connection refused".into(),
            status_code: None,
        })
    }

    fn build_engine(
        script: Vec<Result<ChatResponse, ProviderError>>,
    ) -> (ConversationEngine, Arc<MemoryStore>, Arc<ScriptedProvider>) {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(ScriptedProvider::new(script));
        let engine = ConversationEngine::new(
            store.clone(),
            SessionPolicy::new(&SessionConfig::default()),
            PromptAssembler::default(),
            provider.clone(),
            EngineSettings {
                model: "gpt-3.5-turbo".into(),
                temperature: 0.7,
                max_tokens: None,
                reset_echo: "----------------------------".into(),
            },
        );
        (engine, store, provider)
    }

    #[tokio::test]
    async fn test_fresh_user_first_message() {
        // Scenario A: session created, request carries exactly the new message.
        let (engine, store, provider) = build_engine(vec![answer("Hi!")]);

        let reply = engine.handle("42", "alice", "Hello").await;
        assert_eq!(
            reply,
            Reply::Answer {
                text: "Hi!".into(),
                usage: "---Tokens usage---\n    prompt_tokens: 10,\n    completion_tokens: 5,\n    total_tokens: 15".into(),
            }
        );

        let requests = provider.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages.len(), 1);
        assert_eq!(requests[0].messages[0].role, "user");
        assert_eq!(requests[0].messages[0].content, "Hello");
        assert_eq!(requests[0].temperature, Some(0.7));

        let session = store.get("42").unwrap();
        assert_eq!(session.username, "alice");
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[1].role, MessageRole::Assistant);
        assert_eq!(session.messages[1].content, "Hi!");
    }

    #[tokio::test]
    async fn test_truncation_before_append() {
        // Scenario B: 12 prior entries, limit 10 → truncate, append → 11 sent.
        let (engine, store, provider) = build_engine(vec![answer("ok")]);

        let now = Utc::now().timestamp();
        let mut session = Session::new("alice", now);
        for i in 0..12 {
            session.push(MessageRole::User, format!("old{i}"));
        }
        store.put("42", session);

        engine.handle("42", "alice", "newest").await;

        let requests = provider.recorded_requests();
        assert_eq!(requests[0].messages.len(), 11);
        assert_eq!(requests[0].messages[0].content, "old2");
        assert_eq!(requests[0].messages[10].content, "newest");
    }

    #[tokio::test]
    async fn test_reset_keyword_deletes_session() {
        // Scenario C: no provider call, session gone, echo returned.
        let (engine, store, provider) = build_engine(vec![]);

        store.put("42", Session::new("alice", Utc::now().timestamp()));
        let reply = engine.handle("42", "alice", "restart").await;

        assert_eq!(
            reply,
            Reply::Reset {
                echo: "----------------------------".into()
            }
        );
        assert!(store.get("42").is_none());
        assert!(provider.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_reset_without_session_is_noop() {
        let (engine, store, provider) = build_engine(vec![]);

        let reply = engine.handle("42", "alice", "  NEW  ").await;

        assert!(matches!(reply, Reply::Reset { .. }));
        assert!(store.is_empty());
        assert!(provider.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_degrades() {
        // Scenario D: ("", "") pair, history keeps only the user message.
        let (engine, store, _provider) = build_engine(vec![failure()]);

        let reply = engine.handle("42", "alice", "Hello").await;
        assert_eq!(reply, Reply::Failed);
        assert_eq!(reply.into_parts(), (String::new(), String::new()));

        let session = store.get("42").unwrap();
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].role, MessageRole::User);
        assert_eq!(session.messages[0].content, "Hello");
    }

    #[tokio::test]
    async fn test_idle_session_expires() {
        // Scenario E: 31 minutes idle, threshold 30 → fresh session.
        let (engine, store, provider) = build_engine(vec![answer("fresh")]);

        let now = Utc::now().timestamp();
        let mut stale = Session::new("alice", now - 31 * 60);
        stale.push(MessageRole::User, "ancient question");
        stale.push(MessageRole::Assistant, "ancient answer");
        store.put("42", stale);

        engine.handle("42", "alice", "anyone there?").await;

        // Old history contributes nothing to the prompt.
        let requests = provider.recorded_requests();
        assert_eq!(requests[0].messages.len(), 1);
        assert_eq!(requests[0].messages[0].content, "anyone there?");

        let session = store.get("42").unwrap();
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].content, "anyone there?");
    }

    #[tokio::test]
    async fn test_abnormal_finish_records_marker() {
        let (engine, store, _provider) = build_engine(vec![Ok(ChatResponse {
            model: "gpt-3.5-turbo".into(),
            content: "truncat".into(),
            finish_reason: Some("length".into()),
            usage: Usage::default(),
            latency_ms: 1,
        })]);

        let reply = engine.handle("42", "alice", "Hello").await;
        assert_eq!(
            reply,
            Reply::AbnormalFinish {
                reason: "length".into()
            }
        );
        assert_eq!(reply.into_parts(), (String::new(), String::new()));

        let session = store.get("42").unwrap();
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[1].content, "error: stop reason - length");
    }

    #[tokio::test]
    async fn test_username_fixed_at_creation() {
        let (engine, store, _provider) = build_engine(vec![answer("a"), answer("b")]);

        engine.handle("42", "alice", "first").await;
        engine.handle("42", "renamed", "second").await;

        assert_eq!(store.get("42").unwrap().username, "alice");
    }

    #[tokio::test]
    async fn test_continuing_session_keeps_context() {
        let (engine, _store, provider) = build_engine(vec![answer("one"), answer("two")]);

        engine.handle("42", "alice", "first").await;
        engine.handle("42", "alice", "second").await;

        let requests = provider.recorded_requests();
        let contents: Vec<&str> = requests[1]
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["first", "one", "second"]);
    }

    #[test]
    fn test_reply_into_parts() {
        assert_eq!(
            Reply::Reset { echo: "---".into() }.into_parts(),
            ("---".to_string(), String::new())
        );
        assert_eq!(
            Reply::Answer {
                text: "hi".into(),
                usage: "usage".into()
            }
            .into_parts(),
            ("hi".to_string(), "usage".to_string())
        );
        assert_eq!(
            Reply::AbnormalFinish {
                reason: "length".into()
            }
            .into_parts(),
            (String::new(), String::new())
        );
    }
}
