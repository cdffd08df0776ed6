//! The key vault: password-based locking of a private key at rest.
//!
//! The serialized private key is sealed with XChaCha20-Poly1305 under a key
//! derived from the account password via Argon2id. The salt input must be
//! stable per account (the account username in practice); a domain prefix
//! keeps vault keys separate from any other derivation of the same password.
//!
//! The server only ever stores the resulting [`LockedKeyBlob`]. The decrypted
//! key lives solely in the caller's memory, zeroized on drop, and must never
//! be logged or sent anywhere.

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use zeroize::Zeroizing;

use chat_types::{LockedKeyBlob, NONCE_LEN};

use crate::CryptoError;

/// Domain-separation prefix mixed into the salt input.
const VAULT_SALT_DOMAIN: &[u8] = b"sealchat-vault-v1:";

/// Argon2id parameters for the vault KDF.
///
/// # Defaults
///
/// | Parameter | Default | Meaning |
/// |-----------|---------|---------|
/// | `m_cost`  | 19 456  | Memory usage in KiB (19 MiB) |
/// | `t_cost`  | 2       | Number of passes |
/// | `p_cost`  | 1       | Degree of parallelism |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultParams {
    /// Memory cost in KiB.
    pub m_cost: u32,
    /// Time cost (number of passes).
    pub t_cost: u32,
    /// Parallelism degree.
    pub p_cost: u32,
}

impl Default for VaultParams {
    fn default() -> Self {
        Self {
            m_cost: 19 * 1024,
            t_cost: 2,
            p_cost: 1,
        }
    }
}

impl VaultParams {
    /// Cheap parameters for tests. Not for production key material.
    pub fn insecure_fast() -> Self {
        Self {
            m_cost: 8,
            t_cost: 1,
            p_cost: 1,
        }
    }
}

/// Derive the 256-bit vault key from password and per-account salt.
fn derive_vault_key(
    password: &str,
    salt: &str,
    params: &VaultParams,
) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
    let argon_params = Params::new(params.m_cost, params.t_cost, params.p_cost, Some(32))
        .map_err(|e| CryptoError::InvalidVaultInput(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    // Domain prefix + account salt; the prefix also guarantees the Argon2
    // minimum salt length even for short usernames.
    let mut full_salt = Vec::with_capacity(VAULT_SALT_DOMAIN.len() + salt.len());
    full_salt.extend_from_slice(VAULT_SALT_DOMAIN);
    full_salt.extend_from_slice(salt.as_bytes());

    let mut key = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(password.as_bytes(), &full_salt, &mut *key)
        .map_err(|e| CryptoError::InvalidVaultInput(e.to_string()))?;

    Ok(key)
}

/// Lock a serialized private key under a password.
///
/// Generates a fresh random nonce per call: locking the same key twice
/// yields unrelated blobs.
pub fn lock(
    private_key: &[u8],
    password: &str,
    salt: &str,
    params: &VaultParams,
) -> Result<LockedKeyBlob, CryptoError> {
    if salt.is_empty() {
        return Err(CryptoError::InvalidVaultInput(
            "salt must not be empty".to_string(),
        ));
    }

    let key = derive_vault_key(password, salt, params)?;

    let mut nonce = [0u8; NONCE_LEN];
    getrandom::getrandom(&mut nonce).map_err(|_| CryptoError::EncryptionFailed)?;

    let cipher =
        XChaCha20Poly1305::new_from_slice(&*key).map_err(|_| CryptoError::EncryptionFailed)?;
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), private_key)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    Ok(LockedKeyBlob {
        ciphertext,
        iv: nonce.to_vec(),
    })
}

/// Unlock a private key blob.
///
/// Wrong password, corrupted blob and malformed nonce are indistinguishable:
/// all collapse to [`CryptoError::KeyUnlockError`] and nothing partial is
/// ever returned.
pub fn unlock(
    blob: &LockedKeyBlob,
    password: &str,
    salt: &str,
    params: &VaultParams,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let nonce: [u8; NONCE_LEN] = blob
        .iv
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::KeyUnlockError)?;

    let key = derive_vault_key(password, salt, params).map_err(|_| CryptoError::KeyUnlockError)?;

    let cipher =
        XChaCha20Poly1305::new_from_slice(&*key).map_err(|_| CryptoError::KeyUnlockError)?;
    let plaintext = cipher
        .decrypt(XNonce::from_slice(&nonce), blob.ciphertext.as_slice())
        .map_err(|_| CryptoError::KeyUnlockError)?;

    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> VaultParams {
        VaultParams::insecure_fast()
    }

    #[test]
    fn lock_unlock_roundtrip() {
        let key_bytes = [0x42u8; 32];
        let blob = lock(&key_bytes, "hunter2", "alice", &params()).unwrap();
        let unlocked = unlock(&blob, "hunter2", "alice", &params()).unwrap();
        assert_eq!(unlocked.as_slice(), &key_bytes);
    }

    #[test]
    fn wrong_password_fails_with_unlock_error() {
        let blob = lock(&[0x42u8; 32], "correct horse", "alice", &params()).unwrap();
        let result = unlock(&blob, "battery staple", "alice", &params());
        assert!(matches!(result, Err(CryptoError::KeyUnlockError)));
    }

    #[test]
    fn wrong_salt_fails_with_unlock_error() {
        let blob = lock(&[0x42u8; 32], "hunter2", "alice", &params()).unwrap();
        let result = unlock(&blob, "hunter2", "bob", &params());
        assert!(matches!(result, Err(CryptoError::KeyUnlockError)));
    }

    #[test]
    fn corrupted_blob_fails_identically_to_wrong_password() {
        let mut blob = lock(&[0x42u8; 32], "hunter2", "alice", &params()).unwrap();
        blob.ciphertext[0] ^= 0xFF;

        let corrupted = unlock(&blob, "hunter2", "alice", &params()).unwrap_err();
        assert_eq!(corrupted.to_string(), CryptoError::KeyUnlockError.to_string());
    }

    #[test]
    fn truncated_nonce_fails_with_unlock_error() {
        let mut blob = lock(&[0x42u8; 32], "hunter2", "alice", &params()).unwrap();
        blob.iv.truncate(8);
        assert!(matches!(
            unlock(&blob, "hunter2", "alice", &params()),
            Err(CryptoError::KeyUnlockError)
        ));
    }

    #[test]
    fn fresh_nonce_per_lock() {
        let key_bytes = [7u8; 32];
        let a = lock(&key_bytes, "pw", "alice", &params()).unwrap();
        let b = lock(&key_bytes, "pw", "alice", &params()).unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn empty_salt_rejected_at_lock() {
        let result = lock(&[1u8; 32], "pw", "", &params());
        assert!(matches!(result, Err(CryptoError::InvalidVaultInput(_))));
    }

    #[test]
    fn short_username_salt_is_accepted() {
        // Domain prefix covers the Argon2 minimum even for short usernames
        let blob = lock(&[1u8; 32], "pw", "al", &params()).unwrap();
        let unlocked = unlock(&blob, "pw", "al", &params()).unwrap();
        assert_eq!(unlocked.as_slice(), &[1u8; 32]);
    }
}
