//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

use crate::{
    config::Config,
    error::{Error, Result},
};

/// Build the filter for a configured level, falling back to `info`
fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the global tracing subscriber
///
/// `service.log_format = "pretty"` selects human-readable output; anything
/// else logs JSON lines. Fails if a global subscriber is already installed.
pub fn init_tracing(config: &Config) -> Result<()> {
    let filter = env_filter(&config.service.log_level);
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match config.service.log_format.as_str() {
        "pretty" => builder.pretty().try_init(),
        _ => builder.json().try_init(),
    };
    installed.map_err(|e| Error::Internal(format!("Failed to initialize tracing: {}", e)))?;

    tracing::info!(
        service = %config.service.name,
        format = %config.service.log_format,
        "Tracing initialized"
    );

    Ok(())
}
