//! The key directory: blind custody of account key material.
//!
//! Each record holds an identity, its plaintext public key (fetchable by any
//! authenticated party) and the password-locked private key blob. The server
//! can never decrypt the blob - it has neither the password nor the derived
//! key - which is what makes custody "blind".

use dashmap::DashMap;

use chat_types::{Identity, LockedKeyBlob, PrivateKeyBlobResponse, UserId};

/// One account's stored key material.
#[derive(Debug, Clone)]
pub struct DirectoryRecord {
    /// The owning identity.
    pub identity: Identity,
    /// Base64-encoded public key.
    pub public_key: String,
    /// The locked private key blob. Opaque ciphertext to the server.
    pub blob: LockedKeyBlob,
}

/// In-memory key directory keyed by identity.
#[derive(Debug, Default)]
pub struct KeyDirectory {
    records: DashMap<UserId, DirectoryRecord>,
}

impl KeyDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish (or replace) an account's key material.
    pub fn publish(&self, identity: Identity, public_key: String, blob: LockedKeyBlob) {
        let user_id = identity.id;
        self.records.insert(
            user_id,
            DirectoryRecord {
                identity,
                public_key,
                blob,
            },
        );
        tracing::debug!(user = %user_id, "published key material");
    }

    /// The public key registered for an identity, if any.
    pub fn public_key_of(&self, user_id: &UserId) -> Option<String> {
        self.records.get(user_id).map(|r| r.public_key.clone())
    }

    /// The private-key blob response for an identity.
    ///
    /// Only ever served to the OWNING identity (the HTTP layer enforces
    /// that); the username rides along as the stable vault salt input.
    pub fn blob_of(&self, user_id: &UserId) -> Option<PrivateKeyBlobResponse> {
        self.records.get(user_id).map(|r| PrivateKeyBlobResponse {
            ciphertext: r.blob.ciphertext.clone(),
            iv: r.blob.iv.clone(),
            username: r.identity.display_name.clone(),
        })
    }

    /// Number of published records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(fill: u8) -> LockedKeyBlob {
        LockedKeyBlob {
            ciphertext: vec![fill; 48],
            iv: vec![fill; 24],
        }
    }

    #[test]
    fn publish_and_fetch_public_key() {
        let directory = KeyDirectory::new();
        let alice = Identity::new(UserId::random(), "alice");

        directory.publish(alice.clone(), "pubkey-b64".to_string(), blob(1));

        assert_eq!(
            directory.public_key_of(&alice.id).as_deref(),
            Some("pubkey-b64")
        );
    }

    #[test]
    fn unknown_identity_has_no_key() {
        let directory = KeyDirectory::new();
        assert!(directory.public_key_of(&UserId::random()).is_none());
        assert!(directory.blob_of(&UserId::random()).is_none());
    }

    #[test]
    fn blob_response_carries_username_salt() {
        let directory = KeyDirectory::new();
        let alice = Identity::new(UserId::random(), "alice");
        directory.publish(alice.clone(), "pk".to_string(), blob(7));

        let response = directory.blob_of(&alice.id).unwrap();
        assert_eq!(response.username, "alice");
        assert_eq!(response.ciphertext, vec![7; 48]);
        assert_eq!(response.iv, vec![7; 24]);
    }

    #[test]
    fn republish_replaces_key_material() {
        let directory = KeyDirectory::new();
        let alice = Identity::new(UserId::random(), "alice");

        directory.publish(alice.clone(), "old".to_string(), blob(1));
        directory.publish(alice.clone(), "new".to_string(), blob(2));

        assert_eq!(directory.len(), 1);
        assert_eq!(directory.public_key_of(&alice.id).as_deref(), Some("new"));
        assert_eq!(directory.blob_of(&alice.id).unwrap().ciphertext, vec![2; 48]);
    }
}
