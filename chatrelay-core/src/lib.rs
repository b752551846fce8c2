//! ChatRelay Core - conversation state and completion orchestration.
//!
//! This crate owns everything with real state and policy:
//!
//! - [`session`]: per-user conversation history, its in-memory store, and the
//!   reset/expiry/truncation rules applied to it
//! - [`prompt`]: turning a session into the ordered request message list
//! - [`provider`]: the chat-completion API client
//! - [`engine`]: the single entry point invoked per incoming message, tying
//!   the above together
//!
//! ```text
//! (user_id, username, text)
//!        │
//!        ▼
//! ConversationEngine ── SessionPolicy ── SessionStore
//!        │
//!        ├── PromptAssembler ──► Provider (chat completion)
//!        ▼
//!      Reply (reset / answer / degraded)
//! ```

#![warn(clippy::all)]

pub mod engine;
pub mod prompt;
pub mod provider;
pub mod session;

pub use engine::{ConversationEngine, EngineSettings, Reply};
pub use prompt::PromptAssembler;
pub use provider::{ChatRequest, ChatResponse, Message, OpenAiProvider, Provider, ProviderError, Usage};
pub use session::policy::SessionPolicy;
pub use session::store::{MemoryStore, SessionStore};
pub use session::types::{ChatMessage, MessageRole, Session};
