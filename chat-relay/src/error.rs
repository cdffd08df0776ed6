//! Error types for sealchat-relay.

/// Main error type for relay operations.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Relay request validation error.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Credential verification failures.
///
/// All variants are terminal for the handshake that carried the credential:
/// the connection is refused and the client must re-establish with a fresh
/// token. The variants exist for server-side logs and metrics; the client
/// sees a uniform 401.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No credential accompanied the handshake.
    #[error("missing credential")]
    MissingCredential,

    /// The token did not have the expected structure.
    #[error("malformed token")]
    Malformed,

    /// The token signature did not verify.
    #[error("bad token signature")]
    BadSignature,

    /// The token was valid once but has expired.
    #[error("expired token")]
    Expired,
}

/// Relay request validation failures.
///
/// A failed validation drops the request with no side effects; the sender is
/// told via an error frame and nothing reaches the recipient.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// A required field was missing or empty.
    #[error("missing or empty field: {0}")]
    EmptyField(&'static str),

    /// A byte field had the wrong length.
    #[error("bad length for {field}: expected {expected}, got {actual}")]
    BadLength {
        /// Which field.
        field: &'static str,
        /// Expected byte length.
        expected: usize,
        /// Actual byte length.
        actual: usize,
    },

    /// Unknown cipher suite tag - fail closed.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Ciphertext exceeds the configured payload cap.
    #[error("payload too large: {size} bytes (limit: {limit} bytes)")]
    PayloadTooLarge {
        /// Actual ciphertext size.
        size: usize,
        /// Configured maximum.
        limit: usize,
    },
}

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
