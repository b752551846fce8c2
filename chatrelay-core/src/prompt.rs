//! Prompt assembly: session history → ordered request messages.

use crate::provider::Message;
use crate::session::types::Session;
use chatrelay_common::config::PromptConfig;

/// Builds the request message sequence from a session.
///
/// The configured system prompt is held here but only prepended when
/// explicitly enabled; the default flow sends the conversation history alone.
#[derive(Debug, Clone, Default)]
pub struct PromptAssembler {
    system_prompt: Option<String>,
}

impl PromptAssembler {
    /// Build an assembler from configuration.
    pub fn new(config: &PromptConfig) -> Self {
        let system_prompt = (config.use_system_prompt && !config.system_prompt.is_empty())
            .then(|| config.system_prompt.clone());
        Self { system_prompt }
    }

    /// Produce the ordered request sequence for a session.
    ///
    /// History order is preserved exactly; calling this twice on the same
    /// session state yields identical output.
    pub fn assemble(&self, session: &Session) -> Vec<Message> {
        let mut messages = Vec::with_capacity(session.messages.len() + 1);

        if let Some(ref system) = self.system_prompt {
            messages.push(Message {
                role: "system".into(),
                content: system.clone(),
            });
        }

        for entry in &session.messages {
            messages.push(Message {
                role: entry.role.as_str().into(),
                content: entry.content.clone(),
            });
        }

        messages
    }
}
