//! HTTP routes for the ChatRelay webhook endpoint.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::synology::{SynologyChannel, SynologyEvent};
use chatrelay_core::ConversationEngine;

// ============================================================================
// State
// ============================================================================

/// Shared state for the webhook HTTP server.
pub struct ChannelsState {
    /// Conversation engine handling every inbound message
    pub engine: Arc<ConversationEngine>,
    /// Outbound Synology Chat channel
    pub channel: Arc<SynologyChannel>,
    /// Shared secret expected in the inbound form body
    pub webhook_token: String,
    /// Acknowledgement text sent before the completion call
    pub ack_text: String,
}

/// Create the shared server state.
pub fn create_state(
    engine: Arc<ConversationEngine>,
    channel: Arc<SynologyChannel>,
    webhook_token: impl Into<String>,
    ack_text: impl Into<String>,
) -> Arc<ChannelsState> {
    Arc::new(ChannelsState {
        engine,
        channel,
        webhook_token: webhook_token.into(),
        ack_text: ack_text.into(),
    })
}

// ============================================================================
// Health Routes
// ============================================================================

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        service: "chatrelay-channels",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn ready() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ready",
        service: "chatrelay-channels",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Synology Webhook
// ============================================================================

async fn synology_webhook(
    State(state): State<Arc<ChannelsState>>,
    body: String,
) -> impl IntoResponse {
    if body.is_empty() {
        return (StatusCode::BAD_REQUEST, "Empty request body".to_string());
    }

    let event: SynologyEvent = match serde_urlencoded::from_str(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed webhook form body");
            return (StatusCode::BAD_REQUEST, "Invalid form body".to_string());
        }
    };

    if event.token != state.webhook_token {
        tracing::warn!(user_id = %event.user_id, "Webhook token mismatch");
        return (StatusCode::UNAUTHORIZED, "Invalid token".to_string());
    }

    tracing::info!(
        user_id = %event.user_id,
        username = %event.username,
        chars = event.text.chars().count(),
        "Webhook message received"
    );

    // Acknowledgement and final reply are independent deliveries: a failed
    // ack is logged and the final sends still run.
    if let Err(e) = state.channel.send(&event.user_id, &state.ack_text).await {
        tracing::warn!(user_id = %event.user_id, error = %e, "Ack delivery failed");
    }

    let reply = state
        .engine
        .handle(&event.user_id, &event.username, &event.text)
        .await;

    let (text, usage) = reply.into_parts();
    for part in [text, usage] {
        if part.is_empty() {
            continue;
        }
        if let Err(e) = state.channel.send(&event.user_id, &part).await {
            tracing::error!(user_id = %event.user_id, error = %e, "Reply delivery failed");
        }
    }

    (StatusCode::OK, "Message processed".to_string())
}

// ============================================================================
// Router Builder
// ============================================================================

/// Build the webhook HTTP router.
pub fn build_router(state: Arc<ChannelsState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/webhook", post(synology_webhook))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use chatrelay_common::config::{Config, SessionConfig};
    use chatrelay_core::{
        ChatRequest, ChatResponse, EngineSettings, MemoryStore, PromptAssembler, Provider,
        ProviderError, SessionPolicy,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    /// Provider that must never be reached.
    struct UnreachableProvider;

    #[async_trait]
    impl Provider for UnreachableProvider {
        fn name(&self) -> &str {
            "unreachable"
        }

        async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, ProviderError> {
            panic!("provider must not be called");
        }
    }

    fn create_test_state() -> Arc<ChannelsState> {
        let config = Config::default();
        let engine = Arc::new(ConversationEngine::new(
            Arc::new(MemoryStore::new()),
            SessionPolicy::new(&SessionConfig::default()),
            PromptAssembler::new(&config.prompt),
            Arc::new(UnreachableProvider),
            EngineSettings::from_config(&config),
        ));
        // Closed port: any accidental delivery fails loudly in logs but the
        // handler still answers 200.
        let channel = Arc::new(SynologyChannel::new("http://127.0.0.1:9/webhook"));
        create_state(engine, channel, "secret", "processing...")
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = build_router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ready_endpoint() {
        let app = build_router(create_test_state());

        let response = app
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_empty_body_rejected() {
        let app = build_router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Empty request body");
    }

    #[tokio::test]
    async fn test_invalid_token_rejected() {
        let app = build_router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from(
                        "token=wrong&user_id=42&username=alice&text=hello",
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Invalid token");
    }

    #[tokio::test]
    async fn test_malformed_body_rejected() {
        let app = build_router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhook")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("user_id=42"))
                    .unwrap(),
            )
            .await
            .unwrap();

        // Missing required fields → client error, no processing.
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
