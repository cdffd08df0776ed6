//! Error types for sealchat wire handling.

use thiserror::Error;

/// Errors that can occur while encoding or decoding wire data.
#[derive(Debug, Error)]
pub enum WireError {
    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// JSON deserialization failed.
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// Unknown cipher suite tag. Fails closed - no default cipher is ever
    /// attempted.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Structurally invalid data.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = WireError::UnsupportedAlgorithm("des".to_string());
        assert_eq!(err.to_string(), "unsupported algorithm: des");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WireError>();
    }
}
