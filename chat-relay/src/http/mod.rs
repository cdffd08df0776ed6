//! HTTP endpoints for sealchat-relay.
//!
//! Provides the real-time channel handshake plus the collaborator surfaces:
//! key directory, private-key blob custody, persisted history, health and
//! metrics.

pub mod health;
pub mod history;
pub mod keys;
mod metrics;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, put};
use axum::{Extension, Router};

use chat_types::Identity;

use crate::gateway;
use crate::server::ChatRelay;

pub use health::HealthStatus;

/// Build the HTTP router with all endpoints.
pub fn build_router(relay: Arc<ChatRelay>) -> Router {
    let mut router = Router::new()
        .route("/ws", get(gateway::ws_handler))
        .route("/health", get(health::health_handler))
        .route("/identity/:id/publicKey", get(keys::public_key_handler))
        .route("/me/privateKeyBlob", get(keys::private_key_blob_handler))
        .route("/me/keys", put(keys::publish_keys_handler))
        .route(
            "/messages",
            get(history::get_messages_handler).post(history::post_message_handler),
        );

    if relay.config().http.metrics_enabled {
        router = router.route("/metrics", get(metrics::metrics_handler));
    }

    router.layer(Extension(relay))
}

/// Authenticate a plain HTTP request via its bearer token.
///
/// Uses the SAME verifier as the real-time handshake; there is exactly one
/// token secret in the process.
pub(crate) async fn require_bearer(
    relay: &ChatRelay,
    headers: &HeaderMap,
) -> Result<Identity, StatusCode> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    relay.verifier().verify(token).await.map_err(|e| {
        relay.metrics().auth_failures.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("rejected bearer credential: {e}");
        StatusCode::UNAUTHORIZED
    })
}
