//! Client errors.

use thiserror::Error;

use crate::api::ApiError;
use crate::transport::TransportError;
use chat_crypto::CryptoError;
use chat_types::WireError;

/// Errors surfaced by [`ChatClient`](crate::ChatClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Directory/history API error.
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    /// Crypto error (seal, open, vault).
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Wire encoding error.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// The relay rejected a request (validation, rate limit).
    #[error("relay rejected request ({kind}): {reason}")]
    Rejected {
        /// Error class reported by the relay.
        kind: String,
        /// Reason reported by the relay.
        reason: String,
    },

    /// This connection was superseded by a newer session for the same
    /// identity. Terminal: reconnect to continue.
    #[error("connection superseded by a newer session")]
    Evicted,
}
