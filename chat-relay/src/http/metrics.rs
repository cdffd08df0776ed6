//! Prometheus metrics endpoint.

use crate::server::ChatRelay;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Returns metrics in Prometheus text format.
/// Includes both gauges (current state) and counters (monotonic since startup).
pub async fn metrics_handler(Extension(relay): Extension<Arc<ChatRelay>>) -> impl IntoResponse {
    let m = relay.metrics();

    // Gauges - current state
    let connections = relay.total_connections();
    let directory_entries = relay.directory().len();

    // Counters - monotonic since startup
    let conns_total = m.connections_total.load(Ordering::Relaxed);
    let delivered = m.delivered_total.load(Ordering::Relaxed);
    let offline = m.offline_total.load(Ordering::Relaxed);
    let validation = m.validation_failures.load(Ordering::Relaxed);
    let auth = m.auth_failures.load(Ordering::Relaxed);
    let rate_limits = m.rate_limit_hits.load(Ordering::Relaxed);
    let bytes = m.bytes_relayed.load(Ordering::Relaxed);

    let body = format!(
        r#"# HELP sealchat_relay_connections_active Number of live authenticated connections
# TYPE sealchat_relay_connections_active gauge
sealchat_relay_connections_active {connections}

# HELP sealchat_relay_directory_entries Identities with published key material
# TYPE sealchat_relay_directory_entries gauge
sealchat_relay_directory_entries {directory_entries}

# HELP sealchat_relay_info Server information
# TYPE sealchat_relay_info gauge
sealchat_relay_info{{version="{version}"}} 1

# HELP sealchat_relay_connections_total Total connections that completed authentication
# TYPE sealchat_relay_connections_total counter
sealchat_relay_connections_total {conns_total}

# HELP sealchat_relay_delivered_total Total envelopes handed to a live recipient
# TYPE sealchat_relay_delivered_total counter
sealchat_relay_delivered_total {delivered}

# HELP sealchat_relay_offline_total Total sends that found no reachable recipient
# TYPE sealchat_relay_offline_total counter
sealchat_relay_offline_total {offline}

# HELP sealchat_relay_validation_failures_total Total relay requests dropped by validation
# TYPE sealchat_relay_validation_failures_total counter
sealchat_relay_validation_failures_total {validation}

# HELP sealchat_relay_auth_failures_total Total refused handshakes and bearer-auth failures
# TYPE sealchat_relay_auth_failures_total counter
sealchat_relay_auth_failures_total {auth}

# HELP sealchat_relay_rate_limit_hits_total Total rate limit rejections
# TYPE sealchat_relay_rate_limit_hits_total counter
sealchat_relay_rate_limit_hits_total {rate_limits}

# HELP sealchat_relay_bytes_relayed_total Total ciphertext bytes relayed to live connections
# TYPE sealchat_relay_bytes_relayed_total counter
sealchat_relay_bytes_relayed_total {bytes}
"#,
        version = env!("CARGO_PKG_VERSION"),
    );

    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}
