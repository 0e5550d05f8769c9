//! Service configuration
//!
//! Loaded from a JSON file (`config.json` by default). Every field has a
//! default, so a missing file or a partial file both work:
//!
//! ```json
//! {
//!   "logger": { "level": "debug", "path": "logs/sdm.log" },
//!   "catalog": { "refresh_interval_minutes": 60 },
//!   "server": { "port": 5700, "cert": "cert.pem", "key": "key.pem" }
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Official list of data models and the repositories hosting them
pub const DEFAULT_OFFICIAL_LIST_URL: &str = "https://raw.githubusercontent.com/smart-data-models/data-models/master/specs/AllSubjects/official_list_data_models.json";

/// Per-model metadata with YAML and JSON Schema links
pub const DEFAULT_METADATA_URL: &str = "https://smartdatamodels.org/extra/datamodels_metadata.json";

/// Longest accepted refresh interval (one year)
pub const MAX_REFRESH_INTERVAL_MINUTES: u64 = 365 * 24 * 60;

/// Longest accepted catalog age (one hundred years)
pub const MAX_AGE_DAYS: u64 = 36_500;

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub logger: LoggerConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl ServiceConfig {
    /// Load configuration from `path`, falling back to defaults if it does not exist
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        Ok(config)
    }

    /// Reject values the refresh loop or the TLS listener cannot work with
    pub fn validate(&self) -> Result<()> {
        self.catalog.validate()?;
        self.server.validate()
    }
}

/// Logging options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Filter directive used when no `--log-level` is given
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable text
    #[serde(default)]
    pub json: bool,

    /// Also append log records to this file
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            path: None,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

/// Remote catalogs and refresh cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_official_list_url")]
    pub official_list_url: String,

    #[serde(default = "default_metadata_url")]
    pub metadata_url: String,

    /// Minutes between wake-ups of the refresh loop
    #[serde(default = "default_refresh_interval_minutes")]
    pub refresh_interval_minutes: u64,

    /// Age after which populated catalogs are downloaded again
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u64,

    /// Per-request timeout for catalog downloads
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

impl CatalogConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_REFRESH_INTERVAL_MINUTES).contains(&self.refresh_interval_minutes) {
            anyhow::bail!(
                "catalog.refresh_interval_minutes must be between 1 and {}, got {}",
                MAX_REFRESH_INTERVAL_MINUTES,
                self.refresh_interval_minutes
            );
        }
        if self.max_age_days > MAX_AGE_DAYS {
            anyhow::bail!(
                "catalog.max_age_days must be at most {}, got {}",
                MAX_AGE_DAYS,
                self.max_age_days
            );
        }
        if self.fetch_timeout_ms == 0 {
            anyhow::bail!("catalog.fetch_timeout_ms must be greater than 0");
        }
        Ok(())
    }

    /// Sleep between refresh cycles, clamped to `1..=MAX_REFRESH_INTERVAL_MINUTES`
    pub fn refresh_interval(&self) -> Duration {
        let minutes = self
            .refresh_interval_minutes
            .clamp(1, MAX_REFRESH_INTERVAL_MINUTES);
        Duration::from_secs(minutes * 60)
    }

    /// Maximum catalog age, clamped to `MAX_AGE_DAYS`
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::days(self.max_age_days.min(MAX_AGE_DAYS) as i64)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            official_list_url: default_official_list_url(),
            metadata_url: default_metadata_url(),
            refresh_interval_minutes: default_refresh_interval_minutes(),
            max_age_days: default_max_age_days(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

fn default_official_list_url() -> String {
    DEFAULT_OFFICIAL_LIST_URL.to_string()
}

fn default_metadata_url() -> String {
    DEFAULT_METADATA_URL.to_string()
}

fn default_refresh_interval_minutes() -> u64 {
    720 // 12h
}

fn default_max_age_days() -> u64 {
    7
}

fn default_fetch_timeout_ms() -> u64 {
    1000
}

/// HTTP listener settings, overridable from the command line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// PEM certificate chain; HTTPS is served when both `cert` and `key` are set
    #[serde(default)]
    pub cert: Option<PathBuf>,

    /// PEM private key matching `cert`
    #[serde(default)]
    pub key: Option<PathBuf>,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        match (&self.cert, &self.key) {
            (Some(_), None) => anyhow::bail!("server.cert is set but server.key is missing"),
            (None, Some(_)) => anyhow::bail!("server.key is set but server.cert is missing"),
            _ => Ok(()),
        }
    }

    /// Certificate and key paths when HTTPS is configured
    pub fn tls_files(&self) -> Option<(&Path, &Path)> {
        match (&self.cert, &self.key) {
            (Some(cert), Some(key)) => Some((cert.as_path(), key.as_path())),
            _ => None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cert: None,
            key: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5600
}
