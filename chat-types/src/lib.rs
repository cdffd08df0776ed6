//! # sealchat-types
//!
//! Wire format types for the sealchat end-to-end encrypted relay protocol.
//!
//! This crate provides the foundational types used across all sealchat crates:
//! - [`UserId`], [`Identity`] - Stable identity types used for routing and key lookup
//! - [`SendRequest`], [`DeliverEvent`], [`EnvelopeMetadata`] - The envelope wire unit
//! - [`ClientFrame`], [`ServerFrame`] - Real-time channel frames
//! - [`LockedKeyBlob`] and the key-directory request/response bodies
//! - [`WireError`] - Error types
//!
//! Everything here is plain data: no I/O, no crypto. The relay treats
//! `ciphertext` and `wrapped_key` as opaque bytes end to end.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod directory;
mod envelope;
mod error;
mod frames;
mod ids;

pub use directory::{
    HistoryAppendRequest, LockedKeyBlob, PrivateKeyBlobResponse, PublicKeyResponse,
    PublishKeysRequest, StoredMessage,
};
pub use envelope::{
    CipherSuite, DeliverEvent, EnvelopeMetadata, SendRequest, MESSAGE_KEY_LEN, NONCE_LEN,
    WRAPPED_KEY_LEN,
};
pub use error::WireError;
pub use frames::{ClientFrame, DeliveryStatus, ErrorFrame, SendOutcome, ServerFrame};
pub use ids::{Identity, UserId};

/// Serde helper for byte fields carried as standard base64 strings in JSON.
pub mod b64 {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize bytes as a base64 string.
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    /// Deserialize a base64 string into bytes.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}
