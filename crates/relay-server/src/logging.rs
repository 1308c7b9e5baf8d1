//! Logging initialization

use relay_config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber
///
/// `RUST_LOG` wins over the configured level so operators can raise
/// verbosity without touching the config file.
///
/// # Errors
///
/// Returns an error when a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to init logging: {e}"))?;
        }
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to init logging: {e}"))?;
        }
    }

    Ok(())
}
