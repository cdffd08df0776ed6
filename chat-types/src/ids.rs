//! Identity types for sealchat.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable, opaque identifier for a user account.
///
/// Routing and key lookup are keyed by `UserId`, never by a transient
/// connection. UUID v4, displayed in hyphenated form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(uuid::Uuid);

impl UserId {
    /// Create a new random UserId.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Parse a UserId from its hyphenated string form.
    pub fn parse(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s).ok().map(Self)
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Get the raw bytes of this UserId.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

/// A user identity: stable id plus display name.
///
/// Immutable once issued. The display name is informational; all routing
/// decisions use [`UserId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable account identifier.
    pub id: UserId,
    /// Human-readable display name.
    pub display_name: String,
}

impl Identity {
    /// Create an identity from parts.
    pub fn new(id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }
}
