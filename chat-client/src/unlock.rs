//! Two-phase private key unlock.
//!
//! The vault contract stays pure crypto; this module is the seam between it
//! and whatever asks the user for their password:
//!
//! 1. [`ChatClient::request_unlock`](crate::ChatClient::request_unlock)
//!    fetches the caller's blob and salt → [`PendingUnlock`]
//! 2. the application collects the secret however it likes
//! 3. [`PendingUnlock::complete`] runs the vault → [`PrivateKeyHandle`]
//!
//! The handle owns the only in-memory copy of the private key. It zeroizes
//! on drop, is never serialized, and never travels back to any server.

use zeroize::Zeroizing;

use chat_crypto::{open, vault, CryptoError, KeyPair, PublicKey, SealedEnvelope, VaultParams};
use chat_types::{DeliverEvent, LockedKeyBlob};

/// An unlock that is waiting for the user's secret.
#[derive(Debug)]
pub struct PendingUnlock {
    blob: LockedKeyBlob,
    salt: String,
    params: VaultParams,
}

impl PendingUnlock {
    /// Build a pending unlock from a fetched blob and its salt input.
    pub fn new(blob: LockedKeyBlob, salt: String) -> Self {
        Self {
            blob,
            salt,
            params: VaultParams::default(),
        }
    }

    /// Override the vault KDF parameters (must match those used at lock).
    pub fn with_params(mut self, params: VaultParams) -> Self {
        self.params = params;
        self
    }

    /// The stable salt input (account username).
    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// Complete the unlock with the user-supplied secret.
    ///
    /// Fails with the opaque [`CryptoError::KeyUnlockError`] on a wrong
    /// password or corrupted blob; nothing partial is ever returned.
    pub fn complete(self, password: &str) -> Result<PrivateKeyHandle, CryptoError> {
        let key_bytes = vault::unlock(&self.blob, password, &self.salt, &self.params)?;

        let raw: [u8; 32] = key_bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::KeyUnlockError)?;
        let raw = Zeroizing::new(raw);

        Ok(PrivateKeyHandle {
            keys: KeyPair::from_secret_bytes(*raw),
        })
    }
}

/// A successfully unlocked private key, held only in memory.
pub struct PrivateKeyHandle {
    keys: KeyPair,
}

impl PrivateKeyHandle {
    /// The public half of the unlocked pair.
    pub fn public(&self) -> &PublicKey {
        self.keys.public()
    }

    /// Open a received deliver event into plaintext.
    ///
    /// Only received envelopes pass through here; the sender of a message
    /// already holds its plaintext.
    pub fn open_event(&self, event: &DeliverEvent) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let envelope =
            SealedEnvelope::from_wire(&event.algorithm, &event.ciphertext, &event.metadata)?;
        open(self.keys.secret(), &envelope)
    }
}

impl std::fmt::Debug for PrivateKeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrivateKeyHandle([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_crypto::seal;
    use chat_types::UserId;
    use chrono::Utc;

    fn locked_pair(password: &str, salt: &str) -> (KeyPair, LockedKeyBlob) {
        let keys = KeyPair::generate();
        let blob = vault::lock(
            &*keys.secret().to_bytes(),
            password,
            salt,
            &VaultParams::insecure_fast(),
        )
        .unwrap();
        (keys, blob)
    }

    #[test]
    fn unlock_roundtrip_yields_matching_handle() {
        let (keys, blob) = locked_pair("pw", "alice");

        let handle = PendingUnlock::new(blob, "alice".to_string())
            .with_params(VaultParams::insecure_fast())
            .complete("pw")
            .unwrap();

        assert_eq!(handle.public(), keys.public());
    }

    #[test]
    fn wrong_password_is_opaque() {
        let (_, blob) = locked_pair("pw", "alice");

        let result = PendingUnlock::new(blob, "alice".to_string())
            .with_params(VaultParams::insecure_fast())
            .complete("guess");

        assert!(matches!(result, Err(CryptoError::KeyUnlockError)));
    }

    #[test]
    fn handle_opens_received_event() {
        let (keys, blob) = locked_pair("pw", "bob");
        let handle = PendingUnlock::new(blob, "bob".to_string())
            .with_params(VaultParams::insecure_fast())
            .complete("pw")
            .unwrap();

        let envelope = seal(keys.public(), b"sealed for bob").unwrap();
        let event = DeliverEvent {
            from: UserId::random(),
            ciphertext: envelope.ciphertext.clone(),
            algorithm: envelope.suite.as_tag().to_string(),
            metadata: envelope.metadata(),
            timestamp: Utc::now(),
        };

        let plaintext = handle.open_event(&event).unwrap();
        assert_eq!(plaintext.as_slice(), b"sealed for bob");
    }

    #[test]
    fn handle_debug_is_redacted() {
        let (_, blob) = locked_pair("pw", "carol");
        let handle = PendingUnlock::new(blob, "carol".to_string())
            .with_params(VaultParams::insecure_fast())
            .complete("pw")
            .unwrap();

        assert_eq!(format!("{:?}", handle), "PrivateKeyHandle([REDACTED])");
    }
}
