//! # sealchat-crypto
//!
//! Client-side cryptography for sealchat:
//! - [`vault`] - password-based locking of a private key at rest
//!   (Argon2id + XChaCha20-Poly1305)
//! - [`sealed`] - the hybrid envelope codec: a fresh single-use message key
//!   per envelope, wrapped under the recipient's X25519 public key
//! - [`keys`] - X25519 identity key pairs with zeroized secret halves
//!
//! Nothing in this crate performs I/O. The relay never links against it -
//! all encryption and decryption happens at the two endpoints.
//!
//! # Security Notes
//!
//! - XChaCha20 uses 192-bit nonces (24 bytes), safe for random generation
//! - Decrypt and unlock failures are deliberately opaque: wrong password,
//!   wrong key and corrupted data are indistinguishable to the caller
//! - Secret key material is zeroized on drop and never appears in Debug output

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
pub mod keys;
pub mod sealed;
pub mod vault;

pub use error::CryptoError;
pub use keys::{KeyPair, PublicKey, SecretKey};
pub use sealed::{open, seal, SealedEnvelope};
pub use vault::{lock, unlock, VaultParams};
