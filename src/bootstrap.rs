// src/bootstrap.rs
//
// Start-up shared by both binaries.

use anyhow::{Context, Result};
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::sheets::{auth::ServiceAccountKey, SheetsClient};

/// `RUST_LOG` wins; otherwise `info`.
pub fn init_tracing() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
}

/// Load `.env` if present, then read the environment.
pub fn load_config() -> Result<Config> {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => return Err(e).context("reading .env"),
    }
    let config = Config::from_env()?;
    if config.telegram.is_configured() {
        info!("telegram alerting is configured but not implemented; no messages will be sent");
    }
    Ok(config)
}

pub fn sheets_client(config: &Config) -> Result<SheetsClient> {
    let key = ServiceAccountKey::from_source(&config.service_account)?;
    info!(account = %key.client_email, "authenticating with service account");
    SheetsClient::new(key)
}
