//! # Server Configuration
//!
//! ## Load Order (later overrides earlier)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Defaults (this file)                                               │
//! │  2. TOML file at $PETBOX_CONFIG (optional)                             │
//! │  3. PETBOX_* environment variables                                     │
//! │  4. validate() → ConfigError aborts startup                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Config File
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [database]
//! path = "./petbox.db"
//! max_connections = 5
//!
//! [drafts]
//! ttl_hours = 168
//!
//! [bundle]
//! min_lines = 3
//! discount_bps = 1000
//!
//! [images]
//! base_url = "https://cdn.example.com/storage/v1/object/public"
//!
//! [workers]
//! sweep_interval_secs = 86400
//! renewal_interval_secs = 86400
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use petbox_core::lifecycle::BundleDiscount;
use petbox_core::validation::validate_discount_bps;
use petbox_core::{DEFAULT_BUNDLE_DISCOUNT_BPS, DEFAULT_BUNDLE_MIN_LINES, DEFAULT_DRAFT_TTL_HOURS};
use petbox_db::DbConfig;
use petbox_engine::EngineConfig;

/// Environment variable naming the TOML config file.
pub const CONFIG_PATH_ENV: &str = "PETBOX_CONFIG";

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    ReadFailed { path: PathBuf, message: String },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        ServerSection {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub path: PathBuf,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        DatabaseSection {
            path: PathBuf::from("./petbox.db"),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftSection {
    pub ttl_hours: i64,
}

impl Default for DraftSection {
    fn default() -> Self {
        DraftSection {
            ttl_hours: DEFAULT_DRAFT_TTL_HOURS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleSection {
    pub min_lines: usize,
    pub discount_bps: u32,
}

impl Default for BundleSection {
    fn default() -> Self {
        BundleSection {
            min_lines: DEFAULT_BUNDLE_MIN_LINES,
            discount_bps: DEFAULT_BUNDLE_DISCOUNT_BPS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSection {
    /// Public object storage root; `{base_url}/{bucket}/{path}`.
    pub base_url: String,
}

impl Default for ImageSection {
    fn default() -> Self {
        ImageSection {
            base_url: "http://localhost:9000/storage/v1/object/public".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSection {
    pub sweep_interval_secs: u64,
    pub renewal_interval_secs: u64,
}

impl Default for WorkerSection {
    fn default() -> Self {
        WorkerSection {
            sweep_interval_secs: 86_400,
            renewal_interval_secs: 86_400,
        }
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Complete server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub drafts: DraftSection,
    #[serde(default)]
    pub bundle: BundleSection,
    #[serde(default)]
    pub images: ImageSection,
    #[serde(default)]
    pub workers: WorkerSection,
}

impl ServerConfig {
    /// Loads defaults, the optional file, then `PETBOX_*` overrides, and
    /// validates the result.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(&path)?,
            None => {
                debug!("No config file given, using defaults");
                Self::default()
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!(?path, "Loading server config from file");

        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(toml::from_str(&contents)?)
    }

    /// Applies `PETBOX_*` overrides read through `lookup`.
    ///
    /// Unparseable values fail instead of being ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("PETBOX_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PETBOX_PORT") {
            self.server.port = parse("PETBOX_PORT", &port)?;
        }
        if let Some(path) = lookup("PETBOX_DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(max) = lookup("PETBOX_MAX_CONNECTIONS") {
            self.database.max_connections = parse("PETBOX_MAX_CONNECTIONS", &max)?;
        }
        if let Some(hours) = lookup("PETBOX_DRAFT_TTL_HOURS") {
            self.drafts.ttl_hours = parse("PETBOX_DRAFT_TTL_HOURS", &hours)?;
        }
        if let Some(lines) = lookup("PETBOX_BUNDLE_MIN_LINES") {
            self.bundle.min_lines = parse("PETBOX_BUNDLE_MIN_LINES", &lines)?;
        }
        if let Some(bps) = lookup("PETBOX_BUNDLE_DISCOUNT_BPS") {
            self.bundle.discount_bps = parse("PETBOX_BUNDLE_DISCOUNT_BPS", &bps)?;
        }
        if let Some(url) = lookup("PETBOX_IMAGE_BASE_URL") {
            self.images.base_url = url;
        }
        if let Some(secs) = lookup("PETBOX_SWEEP_INTERVAL_SECS") {
            self.workers.sweep_interval_secs = parse("PETBOX_SWEEP_INTERVAL_SECS", &secs)?;
        }
        if let Some(secs) = lookup("PETBOX_RENEWAL_INTERVAL_SECS") {
            self.workers.renewal_interval_secs = parse("PETBOX_RENEWAL_INTERVAL_SECS", &secs)?;
        }

        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;

        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if self.drafts.ttl_hours <= 0 {
            return Err(ConfigError::Invalid("drafts.ttl_hours must be positive".into()));
        }
        if self.bundle.min_lines == 0 {
            return Err(ConfigError::Invalid("bundle.min_lines must be at least 1".into()));
        }
        validate_discount_bps(self.bundle.discount_bps)
            .map_err(|e| ConfigError::Invalid(format!("bundle: {e}")))?;

        let url = &self.images.base_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "images.base_url must start with http:// or https://, got: {url}"
            )));
        }

        if self.workers.sweep_interval_secs == 0 || self.workers.renewal_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "worker intervals must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    // =========================================================================
    // Derived Settings
    // =========================================================================

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse().map_err(|_| ConfigError::InvalidValue {
            key: "server".to_string(),
            value: addr,
        })
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone()).max_connections(self.database.max_connections)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            draft_ttl: chrono::Duration::hours(self.drafts.ttl_hours),
            bundle_discount: BundleDiscount {
                min_lines: self.bundle.min_lines,
                discount_bps: self.bundle.discount_bps,
            },
            sweep_interval: Duration::from_secs(self.workers.sweep_interval_secs),
            renewal_interval: Duration::from_secs(self.workers.renewal_interval_secs),
        }
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
