//! Key directory and history collaborator client.
//!
//! These are the external collaborator surfaces the client talks to over
//! plain HTTP with the same bearer token as the real-time channel:
//! - `GET /identity/{id}/publicKey`
//! - `GET /me/privateKeyBlob` (own blob only)
//! - `PUT /me/keys`
//! - `POST /messages` / `GET /messages?with=` (offline fallback)

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

use chat_types::{
    HistoryAppendRequest, PrivateKeyBlobResponse, PublicKeyResponse, PublishKeysRequest,
    StoredMessage, UserId,
};

/// Directory/history API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be performed.
    #[error("request failed: {0}")]
    Request(String),

    /// The caller's credential was rejected.
    #[error("unauthorized")]
    Unauthorized,

    /// The named identity (or the caller's blob) is unknown.
    #[error("not found")]
    NotFound,

    /// The server answered with an unexpected status.
    #[error("unexpected status: {0}")]
    Status(u16),

    /// The response body did not decode.
    #[error("response decode failed: {0}")]
    Decode(String),
}

/// The key-directory and history collaborator, seen from the client.
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    /// Fetch the public key currently registered for an identity.
    async fn fetch_public_key(&self, id: &UserId) -> Result<String, ApiError>;

    /// Fetch the calling identity's own locked private-key blob.
    async fn fetch_private_key_blob(&self) -> Result<PrivateKeyBlobResponse, ApiError>;

    /// Publish the caller's key material.
    async fn publish_keys(&self, request: &PublishKeysRequest) -> Result<(), ApiError>;

    /// Append one envelope to persisted history (offline fallback).
    async fn append_history(&self, request: &HistoryAppendRequest) -> Result<(), ApiError>;

    /// The caller's conversation with one other participant.
    async fn history_with(&self, other: &UserId) -> Result<Vec<StoredMessage>, ApiError>;
}

/// HTTP implementation over reqwest.
#[derive(Debug, Clone)]
pub struct HttpDirectoryApi {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl HttpDirectoryApi {
    /// Create a client for a relay base URL (e.g. `http://localhost:4100`).
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            client: reqwest::Client::new(),
        }
    }

    fn check_status(status: reqwest::StatusCode) -> Result<(), ApiError> {
        match status.as_u16() {
            200..=299 => Ok(()),
            401 => Err(ApiError::Unauthorized),
            404 => Err(ApiError::NotFound),
            other => Err(ApiError::Status(other)),
        }
    }
}

#[async_trait]
impl DirectoryApi for HttpDirectoryApi {
    async fn fetch_public_key(&self, id: &UserId) -> Result<String, ApiError> {
        let response = self
            .client
            .get(format!("{}/identity/{}/publicKey", self.base_url, id))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        Self::check_status(response.status())?;
        let body: PublicKeyResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(body.public_key)
    }

    async fn fetch_private_key_blob(&self) -> Result<PrivateKeyBlobResponse, ApiError> {
        let response = self
            .client
            .get(format!("{}/me/privateKeyBlob", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        Self::check_status(response.status())?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn publish_keys(&self, request: &PublishKeysRequest) -> Result<(), ApiError> {
        let response = self
            .client
            .put(format!("{}/me/keys", self.base_url))
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        Self::check_status(response.status())
    }

    async fn append_history(&self, request: &HistoryAppendRequest) -> Result<(), ApiError> {
        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        Self::check_status(response.status())
    }

    async fn history_with(&self, other: &UserId) -> Result<Vec<StoredMessage>, ApiError> {
        let response = self
            .client
            .get(format!("{}/messages", self.base_url))
            .query(&[("with", other.to_string())])
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        Self::check_status(response.status())?;
        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Mock directory API for testing.
#[derive(Debug, Default)]
pub struct MockDirectoryApi {
    inner: Mutex<MockDirectoryInner>,
}

#[derive(Debug, Default)]
struct MockDirectoryInner {
    public_keys: HashMap<UserId, String>,
    own_blob: Option<PrivateKeyBlobResponse>,
    published: Vec<PublishKeysRequest>,
    appended: Vec<HistoryAppendRequest>,
    history: Vec<StoredMessage>,
}

impl MockDirectoryApi {
    /// Create an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a public key for an identity.
    pub fn set_public_key(&self, id: UserId, public_key: impl Into<String>) {
        self.inner
            .lock()
            .unwrap()
            .public_keys
            .insert(id, public_key.into());
    }

    /// Set the caller's own blob response.
    pub fn set_own_blob(&self, blob: PrivateKeyBlobResponse) {
        self.inner.lock().unwrap().own_blob = Some(blob);
    }

    /// Seed the history returned by `history_with`.
    pub fn set_history(&self, messages: Vec<StoredMessage>) {
        self.inner.lock().unwrap().history = messages;
    }

    /// Key publications captured so far.
    pub fn published(&self) -> Vec<PublishKeysRequest> {
        self.inner.lock().unwrap().published.clone()
    }

    /// History appends captured so far.
    pub fn appended(&self) -> Vec<HistoryAppendRequest> {
        self.inner.lock().unwrap().appended.clone()
    }
}

#[async_trait]
impl DirectoryApi for MockDirectoryApi {
    async fn fetch_public_key(&self, id: &UserId) -> Result<String, ApiError> {
        self.inner
            .lock()
            .unwrap()
            .public_keys
            .get(id)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn fetch_private_key_blob(&self) -> Result<PrivateKeyBlobResponse, ApiError> {
        self.inner
            .lock()
            .unwrap()
            .own_blob
            .clone()
            .ok_or(ApiError::NotFound)
    }

    async fn publish_keys(&self, request: &PublishKeysRequest) -> Result<(), ApiError> {
        self.inner.lock().unwrap().published.push(request.clone());
        Ok(())
    }

    async fn append_history(&self, request: &HistoryAppendRequest) -> Result<(), ApiError> {
        self.inner.lock().unwrap().appended.push(request.clone());
        Ok(())
    }

    async fn history_with(&self, _other: &UserId) -> Result<Vec<StoredMessage>, ApiError> {
        Ok(self.inner.lock().unwrap().history.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_serves_registered_public_keys() {
        let api = MockDirectoryApi::new();
        let alice = UserId::random();
        api.set_public_key(alice, "alice-pk");

        assert_eq!(api.fetch_public_key(&alice).await.unwrap(), "alice-pk");
        assert!(matches!(
            api.fetch_public_key(&UserId::random()).await,
            Err(ApiError::NotFound)
        ));
    }

    #[tokio::test]
    async fn mock_captures_appends() {
        let api = MockDirectoryApi::new();
        let request = HistoryAppendRequest {
            to: UserId::random(),
            ciphertext: vec![1, 2, 3],
            algorithm: "x25519+xchacha20poly1305".to_string(),
            metadata: chat_types::EnvelopeMetadata {
                iv: vec![0; chat_types::NONCE_LEN],
                wrapped_key: vec![0; chat_types::WRAPPED_KEY_LEN],
            },
        };

        api.append_history(&request).await.unwrap();
        assert_eq!(api.appended(), vec![request]);
    }

    #[test]
    fn status_mapping() {
        assert!(HttpDirectoryApi::check_status(reqwest::StatusCode::NO_CONTENT).is_ok());
        assert!(matches!(
            HttpDirectoryApi::check_status(reqwest::StatusCode::UNAUTHORIZED),
            Err(ApiError::Unauthorized)
        ));
        assert!(matches!(
            HttpDirectoryApi::check_status(reqwest::StatusCode::NOT_FOUND),
            Err(ApiError::NotFound)
        ));
        assert!(matches!(
            HttpDirectoryApi::check_status(reqwest::StatusCode::BAD_GATEWAY),
            Err(ApiError::Status(502))
        ));
    }
}
