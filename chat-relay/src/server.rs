//! Main ChatRelay server coordination.
//!
//! [`ChatRelay`] bundles the explicitly-constructed pieces - registry,
//! router, verifier, key directory, history collaborator, rate limits,
//! metrics - with a lifecycle tied to server start/stop. There are no
//! module-level singletons; everything reaches the relay through an
//! `Arc<ChatRelay>` handed out at startup.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::config::Config;
use crate::directory::KeyDirectory;
use crate::history::{HistoryStore, MemoryHistory};
use crate::limits::RateLimits;
use crate::registry::ConnectionRegistry;
use crate::router::RelayRouter;

/// Operational metrics for monitoring relay activity.
///
/// All counters are monotonically increasing (reset only on restart).
/// Thread-safe via `AtomicU64` - no locks needed for incrementing.
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Total connections that completed authentication.
    pub connections_total: AtomicU64,
    /// Total envelopes handed to a live recipient connection.
    pub delivered_total: AtomicU64,
    /// Total sends that found no reachable recipient.
    pub offline_total: AtomicU64,
    /// Total relay requests dropped by validation.
    pub validation_failures: AtomicU64,
    /// Total refused handshakes and bearer-auth failures.
    pub auth_failures: AtomicU64,
    /// Total rate limit rejections (connection + message + global).
    pub rate_limit_hits: AtomicU64,
    /// Total ciphertext bytes relayed to live connections.
    pub bytes_relayed: AtomicU64,
}

/// Main relay server state.
pub struct ChatRelay {
    config: Config,
    verifier: Arc<dyn TokenVerifier>,
    registry: Arc<ConnectionRegistry>,
    router: RelayRouter,
    directory: KeyDirectory,
    history: Arc<dyn HistoryStore>,
    rate_limits: RateLimits,
    metrics: Arc<RelayMetrics>,
}

impl std::fmt::Debug for ChatRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatRelay")
            .field("config", &self.config)
            .field("connections", &self.registry.len())
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl ChatRelay {
    /// Create a new relay with the given config and token verifier.
    ///
    /// History defaults to the in-memory store; use [`ChatRelay::with_history`]
    /// to plug in an external collaborator.
    pub fn new(config: Config, verifier: Arc<dyn TokenVerifier>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let metrics = Arc::new(RelayMetrics::default());
        let router = RelayRouter::new(
            registry.clone(),
            metrics.clone(),
            config.limits.max_payload_bytes,
        );
        let rate_limits = RateLimits::new(&config.limits);

        Self {
            config,
            verifier,
            registry,
            router,
            directory: KeyDirectory::new(),
            history: Arc::new(MemoryHistory::new()),
            rate_limits,
            metrics,
        }
    }

    /// Replace the history collaborator.
    pub fn with_history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = history;
        self
    }

    /// Get the relay configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the token verifier.
    pub fn verifier(&self) -> &Arc<dyn TokenVerifier> {
        &self.verifier
    }

    /// Get the connection registry.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Get the relay router.
    pub fn router(&self) -> &RelayRouter {
        &self.router
    }

    /// Get the key directory.
    pub fn directory(&self) -> &KeyDirectory {
        &self.directory
    }

    /// Get the history collaborator.
    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    /// Get access to the rate limiters.
    pub fn rate_limits(&self) -> &RateLimits {
        &self.rate_limits
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Number of live authenticated connections.
    pub fn total_connections(&self) -> usize {
        self.registry.len()
    }
}
