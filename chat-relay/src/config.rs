//! Configuration loading for sealchat-relay.
//!
//! Configuration is loaded from a TOML file (default: `relay.toml`).

use serde::Deserialize;
use std::path::PathBuf;

/// Root configuration for sealchat-relay.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Token verification configuration.
    pub auth: AuthConfig,
    /// Rate limiting and resource configuration.
    pub limits: LimitsConfig,
    /// HTTP endpoints configuration.
    pub http: HttpConfig,
    /// Housekeeping task configuration.
    pub housekeeping: HousekeepingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the relay (default: 0.0.0.0:4100).
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

/// Token verification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Hex-encoded HMAC secret used for BOTH issuing and verifying tokens.
    /// Empty means "generate an ephemeral secret at startup" (dev mode -
    /// tokens will not survive a restart).
    #[serde(default)]
    pub token_secret: String,
    /// Token lifetime in seconds (default: 24h).
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

/// Rate limiting and resource configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum connection attempts per identity per minute (default: 10).
    #[serde(default = "default_connections_per_identity")]
    pub connections_per_identity: u32,
    /// Maximum relay sends per identity per minute (default: 120).
    #[serde(default = "default_messages_per_minute")]
    pub messages_per_minute: u32,
    /// Aggregate relay sends per second across all identities (default: 1000).
    #[serde(default = "default_global_requests_per_second")]
    pub global_requests_per_second: u32,
    /// Maximum envelope ciphertext size in bytes (default: 64 KiB).
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
    /// Depth of each connection's outbound delivery queue (default: 64).
    #[serde(default = "default_outbound_queue_depth")]
    pub outbound_queue_depth: usize,
}

/// HTTP endpoints configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Enable metrics endpoint (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

/// Housekeeping task configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HousekeepingConfig {
    /// Housekeeping interval in seconds (default: 300).
    #[serde(default = "default_housekeeping_interval")]
    pub interval_secs: u64,
    /// Enable the housekeeping task (default: true).
    #[serde(default = "default_housekeeping_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0:4100".to_string()
}

fn default_token_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_connections_per_identity() -> u32 {
    10
}

fn default_messages_per_minute() -> u32 {
    120
}

fn default_global_requests_per_second() -> u32 {
    1000
}

fn default_max_payload_bytes() -> usize {
    64 * 1024
}

fn default_outbound_queue_depth() -> usize {
    64
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_housekeeping_interval() -> u64 {
    300
}

fn default_housekeeping_enabled() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: default_bind_address(),
            },
            auth: AuthConfig {
                token_secret: String::new(),
                token_ttl_secs: default_token_ttl_secs(),
            },
            limits: LimitsConfig {
                connections_per_identity: default_connections_per_identity(),
                messages_per_minute: default_messages_per_minute(),
                global_requests_per_second: default_global_requests_per_second(),
                max_payload_bytes: default_max_payload_bytes(),
                outbound_queue_depth: default_outbound_queue_depth(),
            },
            http: HttpConfig {
                metrics_enabled: default_metrics_enabled(),
            },
            housekeeping: HousekeepingConfig {
                interval_secs: default_housekeeping_interval(),
                enabled: default_housekeeping_enabled(),
            },
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
