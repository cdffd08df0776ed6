//! Persisted history collaborator interface.
//!
//! The relay router NEVER writes here - forwarding is transient by design.
//! History is the caller's fallback for offline recipients: the client
//! appends via `POST /messages` and reads back via `GET /messages?with=`.
//! Entries are keyed by the unordered participant pair plus timestamp and
//! stay ciphertext end to end.
//!
//! The storage engine itself is out of scope; [`MemoryHistory`] is the
//! reference implementation behind the trait an external datastore would
//! implement.

use async_trait::async_trait;
use tokio::sync::RwLock;

use chat_types::{StoredMessage, UserId};

/// History store errors.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// The backing store could not complete the operation.
    #[error("history store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only persisted history, keyed by participant pair and timestamp.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append one message. Timestamps are assigned by the caller (the HTTP
    /// layer stamps server time before appending).
    async fn append(&self, message: StoredMessage) -> Result<(), HistoryError>;

    /// All messages between two participants, in either direction, ordered
    /// by timestamp.
    async fn between(&self, a: &UserId, b: &UserId) -> Result<Vec<StoredMessage>, HistoryError>;
}

/// In-memory history store.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    messages: RwLock<Vec<StoredMessage>>,
}

impl MemoryHistory {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total stored messages (for tests and health output).
    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn append(&self, message: StoredMessage) -> Result<(), HistoryError> {
        self.messages.write().await.push(message);
        Ok(())
    }

    async fn between(&self, a: &UserId, b: &UserId) -> Result<Vec<StoredMessage>, HistoryError> {
        let messages = self.messages.read().await;
        let mut matching: Vec<StoredMessage> = messages
            .iter()
            .filter(|m| m.involves(a, b))
            .cloned()
            .collect();
        matching.sort_by_key(|m| m.timestamp);
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_types::{EnvelopeMetadata, NONCE_LEN, WRAPPED_KEY_LEN};
    use chrono::{TimeZone, Utc};

    fn message(from: UserId, to: UserId, secs: i64) -> StoredMessage {
        StoredMessage {
            from,
            to,
            ciphertext: vec![1, 2, 3],
            algorithm: "x25519+xchacha20poly1305".to_string(),
            metadata: EnvelopeMetadata {
                iv: vec![0; NONCE_LEN],
                wrapped_key: vec![0; WRAPPED_KEY_LEN],
            },
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn append_and_query_pair() {
        let store = MemoryHistory::new();
        let alice = UserId::random();
        let bob = UserId::random();
        let carol = UserId::random();

        store.append(message(alice, bob, 10)).await.unwrap();
        store.append(message(bob, alice, 20)).await.unwrap();
        store.append(message(alice, carol, 30)).await.unwrap();

        let conversation = store.between(&alice, &bob).await.unwrap();
        assert_eq!(conversation.len(), 2);
        // Both directions, neither involving carol
        assert!(conversation.iter().all(|m| m.involves(&alice, &bob)));
    }

    #[tokio::test]
    async fn query_is_timestamp_ordered() {
        let store = MemoryHistory::new();
        let alice = UserId::random();
        let bob = UserId::random();

        store.append(message(alice, bob, 30)).await.unwrap();
        store.append(message(bob, alice, 10)).await.unwrap();
        store.append(message(alice, bob, 20)).await.unwrap();

        let conversation = store.between(&alice, &bob).await.unwrap();
        let stamps: Vec<i64> = conversation.iter().map(|m| m.timestamp.timestamp()).collect();
        assert_eq!(stamps, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn empty_pair_yields_empty() {
        let store = MemoryHistory::new();
        let conversation = store
            .between(&UserId::random(), &UserId::random())
            .await
            .unwrap();
        assert!(conversation.is_empty());
        assert!(store.is_empty().await);
    }
}
