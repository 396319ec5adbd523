use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable that overrides `api.base_url`.
pub const API_URL_ENV: &str = "WEATHERPROB_API_URL";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding config.toml
    pub config_dir: PathBuf,

    /// Weather statistics backend
    pub api: ApiConfig,

    /// Place search / reverse geocoding (Nominatim)
    #[serde(default)]
    pub geocoding: GeocodingConfig,

    /// Dashboard behavior: debounce windows and the comparison cache
    #[serde(default)]
    pub dashboard: DashboardConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the statistics backend, without the `/api/...` suffix
    pub base_url: String,

    /// Per-request timeout
    #[serde(default = "default_api_timeout")]
    pub timeout_seconds: u64,
}

fn default_api_timeout() -> u64 {
    60
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout_seconds: default_api_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    pub base_url: String,

    /// Nominatim rejects requests without an identifying User-Agent
    pub user_agent: String,

    /// Minimum spacing between two geocoder requests
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Maximum number of search suggestions
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,
}

fn default_min_interval_ms() -> u64 {
    1000
}

fn default_search_limit() -> u32 {
    5
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: format!("WeatherProb/{}", env!("CARGO_PKG_VERSION")),
            min_interval_ms: default_min_interval_ms(),
            search_limit: default_search_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Quiet period after the last map move before the heatmap is refetched
    #[serde(default = "default_heatmap_debounce_ms")]
    pub heatmap_debounce_ms: u64,

    /// Quiet period after the last keystroke before a place search is sent
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,

    /// Age after which a saved comparison is discarded
    #[serde(default = "default_cache_ttl_hours")]
    pub comparison_cache_ttl_hours: u64,

    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

fn default_heatmap_debounce_ms() -> u64 {
    1500
}

fn default_search_debounce_ms() -> u64 {
    1000
}

fn default_cache_ttl_hours() -> u64 {
    24 * 30
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("weatherprob")
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            heatmap_debounce_ms: default_heatmap_debounce_ms(),
            search_debounce_ms: default_search_debounce_ms(),
            comparison_cache_ttl_hours: default_cache_ttl_hours(),
            cache_dir: default_cache_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when RUST_LOG is not set, e.g. "info" or "weatherprob_stats=debug"
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("weatherprob");

        Self {
            config_dir,
            api: ApiConfig::default(),
            geocoding: GeocodingConfig::default(),
            dashboard: DashboardConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let mut config = Self::load_from(&config_path)?;
        config.apply_api_url_override(std::env::var(API_URL_ENV).ok());
        Ok(config)
    }

    /// Load configuration from an explicit file, writing defaults there if it is missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let mut config = Self::default();
            if let Some(parent) = config_path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Errors fail the load; warnings are returned for the caller to report.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = match path {
            Some(p) => {
                let mut config = Self::load_from(p)?;
                config.apply_api_url_override(std::env::var(API_URL_ENV).ok());
                config
            }
            None => Self::load()?,
        };
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        Ok((config, validation))
    }

    /// Replace the statistics backend URL when an override is present and non-empty
    pub fn apply_api_url_override(&mut self, url: Option<String>) {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            tracing::debug!("Using {} override: {}", API_URL_ENV, url);
            self.api.base_url = url.trim().to_string();
        }
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.api.base_url, "api.base_url", &mut result);
        if self.api.timeout_seconds == 0 {
            result.add_error("api.timeout_seconds", "Timeout must be greater than 0");
        } else if self.api.timeout_seconds > 300 {
            result.add_warning(
                "api.timeout_seconds",
                "Timeout is unusually long (>300 seconds)",
            );
        }

        self.validate_url(&self.geocoding.base_url, "geocoding.base_url", &mut result);
        if self.geocoding.user_agent.trim().is_empty() {
            result.add_error(
                "geocoding.user_agent",
                "A User-Agent is required by the geocoding service",
            );
        }
        if self.geocoding.min_interval_ms < 1000 {
            result.add_warning(
                "geocoding.min_interval_ms",
                "Nominatim allows at most one request per second",
            );
        }
        if self.geocoding.search_limit == 0 {
            result.add_error("geocoding.search_limit", "Search limit must be at least 1");
        } else if self.geocoding.search_limit > 50 {
            result.add_warning(
                "geocoding.search_limit",
                "Search limit is capped at 50 by the geocoding service",
            );
        }

        if self.dashboard.heatmap_debounce_ms == 0 {
            result.add_warning(
                "dashboard.heatmap_debounce_ms",
                "Heatmap debounce disabled; every map move triggers a request",
            );
        }
        if self.dashboard.comparison_cache_ttl_hours == 0 {
            result.add_warning(
                "dashboard.comparison_cache_ttl_hours",
                "Saved comparisons expire immediately",
            );
        }
        if self.dashboard.cache_dir.exists() && !self.dashboard.cache_dir.is_dir() {
            result.add_error(
                "dashboard.cache_dir",
                format!(
                    "Path is not a directory: {}",
                    self.dashboard.cache_dir.display()
                ),
            );
        }

        if tracing_subscriber::EnvFilter::try_new(&self.logging.level).is_err() {
            result.add_error(
                "logging.level",
                format!("Invalid log filter: {}", self.logging.level),
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if let Some(port) = url.port() {
                    if port == 0 {
                        result.add_error(field_name, "Port cannot be 0");
                    }
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("weatherprob");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_default_api_points_at_local_backend() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.dashboard.heatmap_debounce_ms, 1500);
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.api.base_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "api.base_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.geocoding.base_url = "ftp://localhost:8080".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_empty_user_agent_is_error() {
        let mut config = Config::default();
        config.geocoding.user_agent = "  ".to_string();
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "geocoding.user_agent"));
    }

    #[test]
    fn test_fast_geocoder_interval_is_warning() {
        let mut config = Config::default();
        config.geocoding.min_interval_ms = 200;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.field == "geocoding.min_interval_ms"));
    }

    #[test]
    fn test_bad_log_filter() {
        let mut config = Config::default();
        config.logging.level = "weatherprob=loud".to_string();
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "logging.level"));
    }

    #[test]
    fn test_api_url_override() {
        let mut config = Config::default();
        config.apply_api_url_override(Some("  ".to_string()));
        assert_eq!(config.api.base_url, "http://127.0.0.1:5000");

        config.apply_api_url_override(Some("https://stats.example.com".to_string()));
        assert_eq!(config.api.base_url, "https://stats.example.com");
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.config_dir, dir.path().join("nested"));

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.api.base_url, config.api.base_url);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "config_dir = \"/tmp/wp\"\n\n[api]\nbase_url = \"http://10.0.0.2:5000\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api.base_url, "http://10.0.0.2:5000");
        assert_eq!(config.api.timeout_seconds, 60);
        assert_eq!(config.geocoding.search_limit, 5);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api\nbase_url = ").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_invalid_file_fails_validated_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.api.timeout_seconds = 0;
        config.save_to(&path).unwrap();

        let err = Config::load_validated(Some(&path)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::Invalid(_))
        ));
    }
}
