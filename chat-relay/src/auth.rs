//! Bearer token issuance and verification.
//!
//! A token is `b64url(claims JSON) . b64url(HMAC-SHA256 tag)`. The ONE
//! [`TokenKeychain`] both issues and verifies with the same secret - issuance
//! and verification can never drift onto different keys or algorithms, which
//! is the classic failure mode this layer exists to rule out.
//!
//! Verification order: structure, then constant-time tag check, then expiry.
//! The tag check uses the hmac crate's `verify_slice` so a forged token
//! cannot be probed byte by byte.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use chat_types::{Identity, UserId};

use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Signed token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenClaims {
    /// Subject identity.
    sub: UserId,
    /// Display name at issuance.
    name: String,
    /// Issued-at, unix seconds.
    iat: i64,
    /// Expiry, unix seconds.
    exp: i64,
}

/// Verifies a bearer credential into an identity.
///
/// The relay only ever talks to this trait; [`TokenKeychain`] is the
/// in-process implementation, an external verifier service would be another.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify a token, returning the identity it was issued to.
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

/// HMAC-SHA256 token keychain: one secret, both directions.
pub struct TokenKeychain {
    secret: Vec<u8>,
    ttl_secs: u64,
}

impl TokenKeychain {
    /// Create a keychain from raw secret bytes and a token lifetime.
    pub fn new(secret: &[u8], ttl_secs: u64) -> Self {
        Self {
            secret: secret.to_vec(),
            ttl_secs,
        }
    }

    /// Issue a token for an identity, valid for the configured lifetime.
    pub fn issue(&self, identity: &Identity) -> String {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            sub: identity.id,
            name: identity.display_name.clone(),
            iat: now,
            exp: now + self.ttl_secs as i64,
        };

        let payload = URL_SAFE_NO_PAD
            .encode(serde_json::to_vec(&claims).expect("claims serialization cannot fail"));
        let tag = self.sign(payload.as_bytes());

        format!("{payload}.{tag}")
    }

    /// Issue a token that expired in the past (test hook for the
    /// expired-credential handshake path).
    pub fn issue_expired(&self, identity: &Identity) -> String {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            sub: identity.id,
            name: identity.display_name.clone(),
            iat: now - 120,
            exp: now - 60,
        };

        let payload = URL_SAFE_NO_PAD
            .encode(serde_json::to_vec(&claims).expect("claims serialization cannot fail"));
        let tag = self.sign(payload.as_bytes());

        format!("{payload}.{tag}")
    }

    fn sign(&self, payload: &[u8]) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(payload);
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    fn verify_sync(&self, token: &str) -> Result<Identity, AuthError> {
        let (payload, tag) = token.split_once('.').ok_or(AuthError::Malformed)?;

        let tag_bytes = URL_SAFE_NO_PAD
            .decode(tag.as_bytes())
            .map_err(|_| AuthError::Malformed)?;

        // Constant-time comparison via the MAC itself
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        mac.verify_slice(&tag_bytes)
            .map_err(|_| AuthError::BadSignature)?;

        let claims_bytes = URL_SAFE_NO_PAD
            .decode(payload.as_bytes())
            .map_err(|_| AuthError::Malformed)?;
        let claims: TokenClaims =
            serde_json::from_slice(&claims_bytes).map_err(|_| AuthError::Malformed)?;

        if claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::Expired);
        }

        Ok(Identity::new(claims.sub, claims.name))
    }
}

impl std::fmt::Debug for TokenKeychain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeychain")
            .field("secret", &"[REDACTED]")
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

#[async_trait]
impl TokenVerifier for TokenKeychain {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        self.verify_sync(token)
    }
}
