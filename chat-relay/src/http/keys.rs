//! Key directory endpoints.
//!
//! - `PUT /me/keys` - publish the caller's public key + locked blob
//! - `GET /identity/{id}/publicKey` - anyone authenticated may fetch
//! - `GET /me/privateKeyBlob` - only the owning identity, ever

use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use chat_types::{PublicKeyResponse, PublishKeysRequest, UserId};

use crate::http::require_bearer;
use crate::server::ChatRelay;

/// `PUT /me/keys` handler.
pub async fn publish_keys_handler(
    Extension(relay): Extension<Arc<ChatRelay>>,
    headers: HeaderMap,
    Json(request): Json<PublishKeysRequest>,
) -> Response {
    let identity = match require_bearer(&relay, &headers).await {
        Ok(identity) => identity,
        Err(status) => return status.into_response(),
    };

    if request.public_key.is_empty() {
        return (StatusCode::BAD_REQUEST, "publicKey must not be empty").into_response();
    }

    relay
        .directory()
        .publish(identity, request.public_key, request.private_key_blob);

    StatusCode::NO_CONTENT.into_response()
}

/// `GET /identity/{id}/publicKey` handler.
pub async fn public_key_handler(
    Extension(relay): Extension<Arc<ChatRelay>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if require_bearer(&relay, &headers).await.is_err() {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let Some(user_id) = UserId::parse(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match relay.directory().public_key_of(&user_id) {
        Some(public_key) => Json(PublicKeyResponse { public_key }).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// `GET /me/privateKeyBlob` handler.
///
/// Serves only the CALLING identity's blob; there is no path parameter on
/// purpose - no authenticated caller can name someone else's blob.
pub async fn private_key_blob_handler(
    Extension(relay): Extension<Arc<ChatRelay>>,
    headers: HeaderMap,
) -> Response {
    let identity = match require_bearer(&relay, &headers).await {
        Ok(identity) => identity,
        Err(status) => return status.into_response(),
    };

    match relay.directory().blob_of(&identity.id) {
        Some(response) => Json(response).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
