pub mod config;
pub mod error;

pub use config::{
    ApiConfig, Config, DashboardConfig, GeocodingConfig, LoggingConfig, ValidationResult,
};
pub use error::{AppError, CacheError, ConfigError, NetworkError, ReqwestErrorExt};

use anyhow::Result;

/// Initialize logging.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` (usually
/// `config.logging.level`) is used.
pub fn init(default_filter: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!("WeatherProb core initialized");
    Ok(())
}
