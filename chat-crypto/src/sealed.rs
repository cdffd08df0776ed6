//! The hybrid envelope codec.
//!
//! Every envelope is encrypted under a fresh single-use 256-bit message key,
//! and that key travels wrapped under the recipient's public key. The message
//! key is never reused across envelopes and never leaves the process
//! unwrapped.
//!
//! # Seal (sender)
//!
//! ```text
//! 1. k ← random 32 bytes, iv ← random 24 bytes
//! 2. ciphertext ← XChaCha20-Poly1305(k, iv, plaintext)
//! 3. ephemeral ← X25519.generate()
//! 4. shared ← ECDH(ephemeral, recipient_pub)
//! 5. kek ← HKDF-SHA256(shared, salt="sealchat-envelope-wrap-v1",
//!                       info=ephemeral_pub || recipient_pub)
//! 6. wrapped_key ← ephemeral_pub || wrap_nonce || AEAD(kek, wrap_nonce, k)
//! ```
//!
//! # Open (recipient)
//!
//! Reverses the wrap with the recipient's static secret, then decrypts the
//! payload. Every failure mode (tag mismatch, malformed lengths, wrong key)
//! collapses to the opaque [`CryptoError::DecryptError`].
//!
//! `open` is only ever invoked on received envelopes; a sender keeps its own
//! plaintext and never round-trips it.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use sha2::Sha256;
use zeroize::Zeroizing;

use chat_types::{CipherSuite, EnvelopeMetadata, MESSAGE_KEY_LEN, NONCE_LEN, WRAPPED_KEY_LEN};

use crate::keys::{PublicKey, SecretKey, PUBLIC_KEY_LEN};
use crate::CryptoError;

/// HKDF domain-separation salt for the key wrap.
const WRAP_SALT: &[u8] = b"sealchat-envelope-wrap-v1";

/// A sealed envelope: everything the wire needs except routing.
#[derive(Debug, Clone)]
pub struct SealedEnvelope {
    /// Cipher suite used.
    pub suite: CipherSuite,
    /// Encrypted payload with the Poly1305 tag appended.
    pub ciphertext: Vec<u8>,
    /// Payload nonce (24 bytes).
    pub nonce: [u8; NONCE_LEN],
    /// Wrapped message key (see module docs for layout).
    pub wrapped_key: Vec<u8>,
}

impl SealedEnvelope {
    /// The metadata block for the wire frame.
    pub fn metadata(&self) -> EnvelopeMetadata {
        EnvelopeMetadata {
            iv: self.nonce.to_vec(),
            wrapped_key: self.wrapped_key.clone(),
        }
    }

    /// Reassemble a sealed envelope from wire fields.
    ///
    /// Unknown algorithm tags fail closed with
    /// [`CryptoError::UnsupportedAlgorithm`]; structural problems with the
    /// byte fields collapse to [`CryptoError::DecryptError`].
    pub fn from_wire(
        algorithm: &str,
        ciphertext: &[u8],
        metadata: &EnvelopeMetadata,
    ) -> Result<Self, CryptoError> {
        let suite = CipherSuite::parse(algorithm)
            .map_err(|_| CryptoError::UnsupportedAlgorithm(algorithm.to_string()))?;

        let nonce: [u8; NONCE_LEN] = metadata
            .iv
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::DecryptError)?;

        if metadata.wrapped_key.len() != WRAPPED_KEY_LEN {
            return Err(CryptoError::DecryptError);
        }

        Ok(Self {
            suite,
            ciphertext: ciphertext.to_vec(),
            nonce,
            wrapped_key: metadata.wrapped_key.clone(),
        })
    }
}

/// Derive the key-encryption key for the wrap.
///
/// Info binds the kek to both the ephemeral and the recipient public key, so
/// a wrapped key cannot be replayed against a different recipient.
fn derive_wrap_key(
    shared: &[u8],
    ephemeral_pub: &[u8; PUBLIC_KEY_LEN],
    recipient_pub: &[u8; PUBLIC_KEY_LEN],
) -> Zeroizing<[u8; 32]> {
    let hkdf = Hkdf::<Sha256>::new(Some(WRAP_SALT), shared);

    let mut info = Vec::with_capacity(PUBLIC_KEY_LEN * 2);
    info.extend_from_slice(ephemeral_pub);
    info.extend_from_slice(recipient_pub);

    let mut kek = Zeroizing::new([0u8; 32]);
    hkdf.expand(&info, &mut *kek)
        .expect("HKDF expand should not fail with valid lengths");
    kek
}

/// Seal a plaintext for a recipient.
///
/// Generates a fresh message key and fresh nonces per call; sealing the same
/// plaintext twice yields unrelated ciphertexts.
pub fn seal(recipient: &PublicKey, plaintext: &[u8]) -> Result<SealedEnvelope, CryptoError> {
    // Fresh single-use message key and payload nonce
    let mut message_key = Zeroizing::new([0u8; MESSAGE_KEY_LEN]);
    getrandom::getrandom(&mut *message_key).map_err(|_| CryptoError::EncryptionFailed)?;
    let mut nonce = [0u8; NONCE_LEN];
    getrandom::getrandom(&mut nonce).map_err(|_| CryptoError::EncryptionFailed)?;

    let cipher = XChaCha20Poly1305::new_from_slice(&*message_key)
        .map_err(|_| CryptoError::EncryptionFailed)?;
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    // Wrap the message key under the recipient's public key
    let ephemeral = x25519_dalek::StaticSecret::random_from_rng(OsRng);
    let ephemeral_pub = x25519_dalek::PublicKey::from(&ephemeral);
    let shared = ephemeral.diffie_hellman(recipient.inner());

    let kek = derive_wrap_key(shared.as_bytes(), ephemeral_pub.as_bytes(), recipient.as_bytes());

    let mut wrap_nonce = [0u8; NONCE_LEN];
    getrandom::getrandom(&mut wrap_nonce).map_err(|_| CryptoError::EncryptionFailed)?;

    let wrap_cipher =
        XChaCha20Poly1305::new_from_slice(&*kek).map_err(|_| CryptoError::EncryptionFailed)?;
    let sealed_key = wrap_cipher
        .encrypt(XNonce::from_slice(&wrap_nonce), &message_key[..])
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut wrapped_key = Vec::with_capacity(WRAPPED_KEY_LEN);
    wrapped_key.extend_from_slice(ephemeral_pub.as_bytes());
    wrapped_key.extend_from_slice(&wrap_nonce);
    wrapped_key.extend_from_slice(&sealed_key);
    debug_assert_eq!(wrapped_key.len(), WRAPPED_KEY_LEN);

    Ok(SealedEnvelope {
        suite: CipherSuite::X25519XChaCha20Poly1305,
        ciphertext,
        nonce,
        wrapped_key,
    })
}

/// Open a received envelope with the recipient's secret key.
pub fn open(secret: &SecretKey, envelope: &SealedEnvelope) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if envelope.wrapped_key.len() != WRAPPED_KEY_LEN {
        return Err(CryptoError::DecryptError);
    }

    let ephemeral_pub: [u8; PUBLIC_KEY_LEN] = envelope.wrapped_key[..PUBLIC_KEY_LEN]
        .try_into()
        .map_err(|_| CryptoError::DecryptError)?;
    let wrap_nonce = &envelope.wrapped_key[PUBLIC_KEY_LEN..PUBLIC_KEY_LEN + NONCE_LEN];
    let sealed_key = &envelope.wrapped_key[PUBLIC_KEY_LEN + NONCE_LEN..];

    let shared = secret
        .inner()
        .diffie_hellman(&x25519_dalek::PublicKey::from(ephemeral_pub));

    let recipient_pub = secret.public_key();
    let kek = derive_wrap_key(shared.as_bytes(), &ephemeral_pub, recipient_pub.as_bytes());

    let wrap_cipher =
        XChaCha20Poly1305::new_from_slice(&*kek).map_err(|_| CryptoError::DecryptError)?;
    let message_key = Zeroizing::new(
        wrap_cipher
            .decrypt(XNonce::from_slice(wrap_nonce), sealed_key)
            .map_err(|_| CryptoError::DecryptError)?,
    );

    let cipher = XChaCha20Poly1305::new_from_slice(&message_key)
        .map_err(|_| CryptoError::DecryptError)?;
    let plaintext = cipher
        .decrypt(XNonce::from_slice(&envelope.nonce), envelope.ciphertext.as_slice())
        .map_err(|_| CryptoError::DecryptError)?;

    Ok(Zeroizing::new(plaintext))
}
