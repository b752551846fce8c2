//! ChatRelay Channels - Synology Chat webhook server.
//!
//! Receives Synology Chat outgoing-webhook events, runs them through the
//! conversation engine, and delivers replies back through the incoming
//! webhook.
//!
//! ```text
//! Synology Chat → POST /webhook → ConversationEngine → completion API
//!        ▲                              │
//!        └──── ack / reply / usage ◄────┘
//! ```

#![warn(clippy::all)]

pub mod routes;
pub mod synology;

pub use routes::{build_router, create_state, ChannelsState};
pub use synology::{ChannelError, ChannelResult, SynologyChannel, SynologyEvent};

use chatrelay_common::config::Config;
use chatrelay_core::{
    ConversationEngine, EngineSettings, MemoryStore, OpenAiProvider, PromptAssembler,
    SessionPolicy,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Build the conversation engine from configuration.
pub fn build_engine(config: &Config) -> ConversationEngine {
    let provider = Arc::new(OpenAiProvider::with_base_url(
        config.openai.api_key.clone(),
        config.openai.base_url.clone(),
    ));

    ConversationEngine::new(
        Arc::new(MemoryStore::new()),
        SessionPolicy::new(&config.session),
        PromptAssembler::new(&config.prompt),
        provider,
        EngineSettings::from_config(config),
    )
}

/// Build the webhook router with CORS middleware.
pub fn build_channels_router(config: &Config) -> axum::Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let engine = Arc::new(build_engine(config));
    let channel = Arc::new(SynologyChannel::new(config.synology.webhook_url.clone()));

    let state = create_state(
        engine,
        channel,
        config.synology.webhook_token.clone(),
        config.synology.ack_text.clone(),
    );

    build_router(state).layer(cors)
}

/// Start the webhook HTTP server.
pub async fn start_server(config: &Config) -> anyhow::Result<()> {
    let addr = SocketAddr::from((
        config.server.bind.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    let router = build_channels_router(config);

    tracing::info!("Starting ChatRelay Channels on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
