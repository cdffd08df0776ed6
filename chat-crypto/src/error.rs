//! Crypto errors.
//!
//! Decrypt and unlock failures carry no detail on purpose: distinguishing
//! "wrong password" from "corrupted blob" (by message or by early return)
//! would hand an attacker a guessing oracle.

use thiserror::Error;

/// Errors from the vault and envelope codec.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption failed.
    #[error("encryption failed")]
    EncryptionFailed,

    /// Envelope could not be opened. Wrong key, tampered ciphertext and
    /// malformed input all land here.
    #[error("decryption failed")]
    DecryptError,

    /// Private key blob could not be unlocked. Wrong password and corrupted
    /// blob all land here.
    #[error("key unlock failed")]
    KeyUnlockError,

    /// Unknown cipher suite tag - fail closed, never try a default cipher.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Key bytes that are not a valid key.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// Vault inputs rejected before any key derivation ran (empty salt,
    /// unusable Argon2 parameters).
    #[error("invalid vault input: {0}")]
    InvalidVaultInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_errors_carry_no_detail() {
        assert_eq!(CryptoError::DecryptError.to_string(), "decryption failed");
        assert_eq!(CryptoError::KeyUnlockError.to_string(), "key unlock failed");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CryptoError>();
    }
}
