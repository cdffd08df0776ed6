//! Persisted history endpoints.
//!
//! The relay's forwarding path never touches these; history writes happen
//! only when a CALLER decides to fall back after `recipientOffline`.
//! `from` and the timestamp are stamped server-side from the authenticated
//! identity, the same trust boundary the router applies.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Extension, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;

use chat_types::{HistoryAppendRequest, StoredMessage, UserId};

use crate::http::require_bearer;
use crate::server::ChatRelay;

/// `POST /messages` handler: append one envelope to persisted history.
pub async fn post_message_handler(
    Extension(relay): Extension<Arc<ChatRelay>>,
    headers: HeaderMap,
    Json(request): Json<HistoryAppendRequest>,
) -> Response {
    let identity = match require_bearer(&relay, &headers).await {
        Ok(identity) => identity,
        Err(status) => return status.into_response(),
    };

    let message = StoredMessage {
        from: identity.id,
        to: request.to,
        ciphertext: request.ciphertext,
        algorithm: request.algorithm,
        metadata: request.metadata,
        timestamp: Utc::now(),
    };

    match relay.history().append(message).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            tracing::error!("history append failed: {e}");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

/// `GET /messages?with={id}` handler: the caller's conversation with one
/// other participant, both directions, timestamp-ordered.
pub async fn get_messages_handler(
    Extension(relay): Extension<Arc<ChatRelay>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let identity = match require_bearer(&relay, &headers).await {
        Ok(identity) => identity,
        Err(status) => return status.into_response(),
    };

    let Some(other) = query.get("with").and_then(|raw| UserId::parse(raw)) else {
        return (StatusCode::BAD_REQUEST, "missing or invalid `with` parameter").into_response();
    };

    match relay.history().between(&identity.id, &other).await {
        Ok(messages) => Json(messages).into_response(),
        Err(e) => {
            tracing::error!("history query failed: {e}");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenKeychain;
    use crate::config::Config;
    use crate::http::build_router;
    use axum::body::Body;
    use axum::http::Request;
    use chat_types::{EnvelopeMetadata, Identity, NONCE_LEN, WRAPPED_KEY_LEN};
    use tower::util::ServiceExt;

    const SECRET: &[u8] = b"history-test-secret";

    fn setup() -> (Arc<ChatRelay>, TokenKeychain) {
        let relay = Arc::new(ChatRelay::new(
            Config::default(),
            Arc::new(TokenKeychain::new(SECRET, 3600)),
        ));
        (relay, TokenKeychain::new(SECRET, 3600))
    }

    fn append_request(to: UserId) -> HistoryAppendRequest {
        HistoryAppendRequest {
            to,
            ciphertext: vec![0xEE; 24],
            algorithm: "x25519+xchacha20poly1305".to_string(),
            metadata: EnvelopeMetadata {
                iv: vec![0; NONCE_LEN],
                wrapped_key: vec![0; WRAPPED_KEY_LEN],
            },
        }
    }

    fn post(token: &str, request: &HistoryAppendRequest) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/messages")
            .header("authorization", format!("Bearer {token}"))
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(request).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn append_then_query_conversation() {
        let (relay, keychain) = setup();
        let alice = Identity::new(UserId::random(), "alice");
        let bob = Identity::new(UserId::random(), "bob");

        let app = build_router(relay.clone());
        let response = app
            .oneshot(post(&keychain.issue(&alice), &append_request(bob.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        // Bob sees the conversation from his side
        let app = build_router(relay);
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/messages?with={}", alice.id))
                    .header("authorization", format!("Bearer {}", keychain.issue(&bob)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let messages: Vec<StoredMessage> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(messages.len(), 1);
        // `from` was stamped server-side from alice's token, not the body
        assert_eq!(messages[0].from, alice.id);
        assert_eq!(messages[0].to, bob.id);
    }

    #[tokio::test]
    async fn query_without_with_param_is_bad_request() {
        let (relay, keychain) = setup();
        let alice = Identity::new(UserId::random(), "alice");

        let app = build_router(relay);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/messages")
                    .header("authorization", format!("Bearer {}", keychain.issue(&alice)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unauthenticated_append_is_rejected() {
        let (relay, _) = setup();
        let app = build_router(relay.clone());

        let response = app
            .oneshot(post("not-a-token", &append_request(UserId::random())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
