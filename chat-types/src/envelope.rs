//! The envelope - the wire unit carrying an encrypted message.
//!
//! The relay validates shape and routes; it never inspects `ciphertext` or
//! `wrapped_key` contents (blind forwarder). Byte fields travel as standard
//! base64 strings inside JSON frames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{b64, UserId, WireError};

/// XChaCha20-Poly1305 nonce length in bytes (192 bits).
pub const NONCE_LEN: usize = 24;

/// Single-use message key length in bytes (256 bits).
pub const MESSAGE_KEY_LEN: usize = 32;

/// Wrapped-key field length in bytes:
/// ephemeral X25519 public key (32) + wrap nonce (24) + sealed message key (32 + 16 tag).
pub const WRAPPED_KEY_LEN: usize = 32 + NONCE_LEN + MESSAGE_KEY_LEN + 16;

/// Cipher suite tags the relay and clients understand.
///
/// Exactly one suite is defined. Unknown tags fail closed with
/// [`WireError::UnsupportedAlgorithm`] - there is no default cipher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherSuite {
    /// X25519 key wrap + XChaCha20-Poly1305 payload encryption.
    X25519XChaCha20Poly1305,
}

impl CipherSuite {
    /// The wire tag for this suite.
    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::X25519XChaCha20Poly1305 => "x25519+xchacha20poly1305",
        }
    }

    /// Parse a wire tag, failing closed on anything unknown.
    pub fn parse(tag: &str) -> Result<Self, WireError> {
        match tag {
            "x25519+xchacha20poly1305" => Ok(Self::X25519XChaCha20Poly1305),
            other => Err(WireError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl std::fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Envelope metadata the recipient needs to decrypt: the payload nonce and
/// the wrapped single-use message key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeMetadata {
    /// Payload encryption nonce (24 bytes).
    #[serde(with = "b64")]
    pub iv: Vec<u8>,
    /// Message key wrapped under the recipient's public key.
    #[serde(with = "b64")]
    pub wrapped_key: Vec<u8>,
}

/// A relay send request: client asks the relay to forward an envelope.
///
/// `from` is intentionally absent - sender attribution is assigned by the
/// relay from the authenticated session, never taken from the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    /// Addressed recipient identity.
    pub to: UserId,
    /// Opaque encrypted payload.
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,
    /// Cipher suite tag (validated, not interpreted, by the relay).
    pub algorithm: String,
    /// Decryption metadata, opaque to the relay.
    pub metadata: EnvelopeMetadata,
}

/// A relay deliver event: the envelope as it arrives at the recipient.
///
/// `from` and `timestamp` are server-assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverEvent {
    /// Authenticated sender identity (assigned by the relay).
    pub from: UserId,
    /// Opaque encrypted payload.
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,
    /// Cipher suite tag.
    pub algorithm: String,
    /// Decryption metadata.
    pub metadata: EnvelopeMetadata,
    /// Server-assigned delivery timestamp (ISO 8601 on the wire).
    pub timestamp: DateTime<Utc>,
}
