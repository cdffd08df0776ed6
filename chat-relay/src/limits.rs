//! Rate limiting for sealchat-relay.
//!
//! Provides protection against connection flooding and message spam.
//!
//! ## Design Notes
//!
//! Connections arrive through the authenticated WebSocket handshake, so the
//! natural rate-limit key is the verified identity, not an IP address:
//! - **UserId** for connection attempts (post-verification)
//! - **UserId** for relay send operations
//!
//! Both use the governor crate's keyed rate limiters backed by DashMap, plus
//! a direct limiter capping aggregate throughput across all identities.

use crate::config::LimitsConfig;
use chat_types::UserId;
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Type alias for a keyed rate limiter using DashMap.
type KeyedLimiter<K> = RateLimiter<
    K,
    dashmap::DashMap<K, InMemoryState>,
    DefaultClock,
    NoOpMiddleware<governor::clock::QuantaInstant>,
>;

/// Type alias for a direct (non-keyed) rate limiter.
type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiters for the relay server.
#[derive(Clone)]
pub struct RateLimits {
    /// Limits connection attempts per identity.
    connection_limiter: Arc<KeyedLimiter<UserId>>,

    /// Limits relay sends per identity.
    message_limiter: Arc<KeyedLimiter<UserId>>,

    /// Global rate limiter across all identities.
    ///
    /// Prevents aggregate overload even if individual clients are within limits.
    global_limiter: Arc<DirectLimiter>,
}

impl std::fmt::Debug for RateLimits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimits")
            .field("connection_limiter", &"KeyedLimiter<UserId>")
            .field("message_limiter", &"KeyedLimiter<UserId>")
            .field("global_limiter", &"DirectLimiter")
            .finish()
    }
}

impl RateLimits {
    /// Create rate limiters from configuration.
    ///
    /// # Panics
    ///
    /// Panics if the configured values are zero.
    pub fn new(config: &LimitsConfig) -> Self {
        let connections_per_minute = NonZeroU32::new(config.connections_per_identity)
            .expect("connections_per_identity must be > 0");
        let connection_quota = Quota::per_minute(connections_per_minute);

        let messages_per_minute =
            NonZeroU32::new(config.messages_per_minute).expect("messages_per_minute must be > 0");
        let message_quota = Quota::per_minute(messages_per_minute);

        let global_rps = NonZeroU32::new(config.global_requests_per_second)
            .expect("global_requests_per_second must be > 0");
        let global_quota = Quota::per_second(global_rps);

        Self {
            connection_limiter: Arc::new(RateLimiter::keyed(connection_quota)),
            message_limiter: Arc::new(RateLimiter::keyed(message_quota)),
            global_limiter: Arc::new(RateLimiter::direct(global_quota)),
        }
    }

    /// Check if a connection attempt by this identity is allowed.
    pub fn check_connection(&self, user_id: &UserId) -> Result<(), RateLimitError> {
        self.connection_limiter
            .check_key(user_id)
            .map_err(|_| RateLimitError::ConnectionLimitExceeded)
    }

    /// Check if a relay send by this identity is allowed.
    pub fn check_message(&self, user_id: &UserId) -> Result<(), RateLimitError> {
        self.message_limiter
            .check_key(user_id)
            .map_err(|_| RateLimitError::MessageLimitExceeded)
    }

    /// Check if the global request rate is within limits.
    pub fn check_global(&self) -> Result<(), RateLimitError> {
        self.global_limiter
            .check()
            .map_err(|_| RateLimitError::GlobalLimitExceeded)
    }

    /// Get the number of tracked connection keys (for housekeeping logs).
    pub fn connection_keys_count(&self) -> usize {
        self.connection_limiter.len()
    }

    /// Get the number of tracked message keys (for housekeeping logs).
    pub fn message_keys_count(&self) -> usize {
        self.message_limiter.len()
    }

    /// Evict stale entries from the keyed rate limiter maps.
    ///
    /// Disconnected identities leave entries behind; `retain_recent()` drops
    /// entries whose cells have fully recharged. Called periodically by the
    /// housekeeping task.
    pub fn shrink(&self) {
        self.connection_limiter.retain_recent();
        self.message_limiter.retain_recent();
    }
}

/// Rate limit error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitError {
    /// Too many connection attempts from this identity.
    ConnectionLimitExceeded,
    /// Too many relay sends from this identity.
    MessageLimitExceeded,
    /// Global request rate exceeded across all identities.
    GlobalLimitExceeded,
}

impl std::fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionLimitExceeded => write!(f, "connection rate limit exceeded"),
            Self::MessageLimitExceeded => write!(f, "message rate limit exceeded"),
            Self::GlobalLimitExceeded => write!(f, "global rate limit exceeded"),
        }
    }
}

impl std::error::Error for RateLimitError {}
