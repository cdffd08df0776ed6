//! X25519 identity key pairs.
//!
//! An account's long-lived key pair: the public half is published to the key
//! directory, the secret half only ever exists in memory after a vault
//! unlock. Secret material zeroizes on drop and never implements
//! Clone or a leaking Debug.

use base64::{engine::general_purpose::STANDARD, Engine};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::CryptoError;

/// Public key length in bytes.
pub const PUBLIC_KEY_LEN: usize = 32;

/// An X25519 public key (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(x25519_dalek::PublicKey);

impl PublicKey {
    /// Create a public key from raw Montgomery-form bytes.
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self(x25519_dalek::PublicKey::from(bytes))
    }

    /// The raw 32-byte representation.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        self.0.as_bytes()
    }

    /// Encode as standard base64 (the directory wire form).
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.as_bytes())
    }

    /// Decode from standard base64.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let raw: [u8; PUBLIC_KEY_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKey("public key must be 32 bytes".to_string()))?;
        Ok(Self::from_bytes(raw))
    }

    pub(crate) fn inner(&self) -> &x25519_dalek::PublicKey {
        &self.0
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", self.to_base64())
    }
}

/// An X25519 secret key.
///
/// The underlying `x25519-dalek` [`StaticSecret`](x25519_dalek::StaticSecret)
/// zeroizes its memory on drop.
pub struct SecretKey(x25519_dalek::StaticSecret);

impl SecretKey {
    /// Generate a fresh secret key from OS entropy.
    pub fn generate() -> Self {
        Self(x25519_dalek::StaticSecret::random_from_rng(OsRng))
    }

    /// Reconstruct a secret key from raw bytes (the vault's plaintext form).
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(x25519_dalek::StaticSecret::from(bytes))
    }

    /// Export the raw key bytes, zeroized when the returned buffer drops.
    ///
    /// This is the only export path; it exists so the vault can seal the key
    /// at rest. Never log or transmit the result.
    pub fn to_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.0.to_bytes())
    }

    /// Derive the corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(x25519_dalek::PublicKey::from(&self.0))
    }

    pub(crate) fn inner(&self) -> &x25519_dalek::StaticSecret {
        &self.0
    }
}

// Don't leak the secret in debug output
impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretKey([REDACTED])")
    }
}

/// A full identity key pair.
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a fresh key pair.
    pub fn generate() -> Self {
        Self::from_secret(SecretKey::generate())
    }

    /// Build a key pair from an existing secret key.
    pub fn from_secret(secret: SecretKey) -> Self {
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Reconstruct a key pair from raw secret bytes (the vault unlock path).
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        Self::from_secret(SecretKey::from_bytes(bytes))
    }

    /// The secret half.
    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }

    /// The public half.
    pub fn public(&self) -> &PublicKey {
        &self.public
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair {{ secret: [REDACTED], public: {:?} }}", self.public)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_key_base64_roundtrip() {
        let pair = KeyPair::generate();
        let encoded = pair.public().to_base64();
        let decoded = PublicKey::from_base64(&encoded).unwrap();
        assert_eq!(pair.public(), &decoded);
    }

    #[test]
    fn public_key_rejects_wrong_length() {
        let short = STANDARD.encode([0u8; 16]);
        assert!(matches!(
            PublicKey::from_base64(&short),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn public_key_rejects_invalid_base64() {
        assert!(PublicKey::from_base64("!!not base64!!").is_err());
    }

    #[test]
    fn secret_bytes_reconstruct_same_pair() {
        let pair = KeyPair::generate();
        let bytes = pair.secret().to_bytes();
        let restored = KeyPair::from_secret_bytes(*bytes);
        assert_eq!(pair.public(), restored.public());
    }

    #[test]
    fn distinct_pairs_have_distinct_keys() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        assert_ne!(a.public(), b.public());
    }

    #[test]
    fn secret_debug_is_redacted() {
        let secret = SecretKey::generate();
        let debug = format!("{:?}", secret);
        assert!(debug.contains("REDACTED"));

        let pair = KeyPair::from_secret(secret);
        let debug = format!("{:?}", pair);
        assert!(debug.contains("REDACTED"));
    }
}
