//! Key-directory and history request/response bodies.
//!
//! The server is a blind custodian: it stores each account's public key in
//! the clear and the private key only as an opaque password-locked blob.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{b64, EnvelopeMetadata, UserId};

/// A password-locked private key at rest: ciphertext plus the nonce used to
/// seal it. Only the owning client can open it; the server never holds the
/// password or the derived key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedKeyBlob {
    /// AEAD ciphertext of the serialized private key.
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,
    /// Nonce used when the blob was sealed.
    #[serde(with = "b64")]
    pub iv: Vec<u8>,
}

/// `PUT /me/keys` body: publish the caller's key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishKeysRequest {
    /// Base64-encoded public key, fetchable by any authenticated party.
    pub public_key: String,
    /// The locked private key blob.
    pub private_key_blob: LockedKeyBlob,
}

/// `GET /identity/{id}/publicKey` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    /// Base64-encoded public key.
    pub public_key: String,
}

/// `GET /me/privateKeyBlob` response: the calling identity's own blob plus
/// the stable salt input (the account username) needed to unlock it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateKeyBlobResponse {
    /// AEAD ciphertext of the serialized private key.
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,
    /// Nonce used when the blob was sealed.
    #[serde(with = "b64")]
    pub iv: Vec<u8>,
    /// Account username (the vault salt input, stable per account).
    pub username: String,
}

impl PrivateKeyBlobResponse {
    /// The blob portion of this response.
    pub fn blob(&self) -> LockedKeyBlob {
        LockedKeyBlob {
            ciphertext: self.ciphertext.clone(),
            iv: self.iv.clone(),
        }
    }
}

/// `POST /messages` body: a caller's fallback append when the recipient was
/// offline. `from` and the timestamp are assigned server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryAppendRequest {
    /// Addressed recipient.
    pub to: UserId,
    /// Opaque encrypted payload.
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,
    /// Cipher suite tag.
    pub algorithm: String,
    /// Decryption metadata.
    pub metadata: EnvelopeMetadata,
}

/// One persisted envelope in the history store, keyed by participant pair
/// and timestamp. Still ciphertext - history is as blind as the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    /// Authenticated sender.
    pub from: UserId,
    /// Addressed recipient.
    pub to: UserId,
    /// Opaque encrypted payload.
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,
    /// Cipher suite tag.
    pub algorithm: String,
    /// Decryption metadata.
    pub metadata: EnvelopeMetadata,
    /// Server-assigned append timestamp.
    pub timestamp: DateTime<Utc>,
}

impl StoredMessage {
    /// Whether this message is between the two given participants,
    /// in either direction.
    pub fn involves(&self, a: &UserId, b: &UserId) -> bool {
        (self.from == *a && self.to == *b) || (self.from == *b && self.to == *a)
    }
}
