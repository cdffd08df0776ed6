//! sealchat-relay binary entry point.
//!
//! Usage:
//! ```bash
//! sealchat-relay --config relay.toml
//! ```
//!
//! Without `--config`, looks for `relay.toml` in the working directory and
//! falls back to built-in defaults if it does not exist.

use std::path::PathBuf;
use std::sync::Arc;

use sealchat_relay::auth::TokenKeychain;
use sealchat_relay::config::Config;
use sealchat_relay::housekeeping::spawn_housekeeping_task;
use sealchat_relay::http;
use sealchat_relay::server::ChatRelay;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config_path = get_config_path();
    let config = if config_path.exists() {
        tracing::info!("Loading configuration from {:?}", config_path);
        Config::from_file(&config_path)?
    } else {
        tracing::info!("No config file at {:?}, using defaults", config_path);
        Config::default()
    };

    let secret = token_secret(&config)?;
    let keychain = TokenKeychain::new(&secret, config.auth.token_ttl_secs);

    let relay = Arc::new(ChatRelay::new(config.clone(), Arc::new(keychain)));

    http::health::init_start_time();
    let _housekeeping = spawn_housekeeping_task(
        relay.rate_limits().clone(),
        config.housekeeping.clone(),
    );

    let app = http::build_router(relay);
    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(
        "sealchat-relay v{} listening on {}",
        env!("CARGO_PKG_VERSION"),
        config.server.bind_address
    );

    axum::serve(listener, app).await?;
    Ok(())
}

/// Resolve the token secret: configured hex, or an ephemeral one for dev.
fn token_secret(config: &Config) -> anyhow::Result<Vec<u8>> {
    if config.auth.token_secret.is_empty() {
        let mut secret = [0u8; 32];
        getrandom::getrandom(&mut secret)?;
        tracing::warn!(
            "auth.token_secret not configured; generated an ephemeral secret \
             (issued tokens will not survive a restart)"
        );
        return Ok(secret.to_vec());
    }

    hex::decode(&config.auth.token_secret)
        .map_err(|e| anyhow::anyhow!("auth.token_secret is not valid hex: {e}"))
}

fn get_config_path() -> PathBuf {
    std::env::args()
        .skip_while(|arg| arg != "--config")
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("relay.toml"))
}
