//! # Register Configuration
//!
//! Loaded once at startup; read-only afterwards.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`CHECKOUT_*`)
//! 2. Config file (`register.toml` in the platform config directory, or the
//!    path in `CHECKOUT_CONFIG`)
//! 3. Defaults (this file)
//!
//! ## Configuration File Format
//! ```toml
//! store_name = "Corner Market"
//! database_path = "/var/lib/checkout/checkout.db"
//! auto_approve_overrides = false
//!
//! [pricing]
//! tax_rate = 825
//!
//! [pricing.loyalty]
//! earn_rate = 200
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use checkout_core::config::PricingConfig;
use checkout_core::TaxRate;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Could not determine the application data directory")]
    NoDataDir,
}

fn default_store_name() -> String {
    "Checkout Dev Store".to_string()
}

/// Register configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterConfig {
    /// Store name (shown in the startup log and `get_config`)
    #[serde(default = "default_store_name")]
    pub store_name: String,

    /// SQLite file. Defaults to `checkout.db` in the platform data directory.
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Approve every override-gated change as soon as it is requested.
    /// Meant for unattended test lanes.
    #[serde(default)]
    pub auto_approve_overrides: bool,

    #[serde(default)]
    pub pricing: PricingConfig,
}

impl Default for RegisterConfig {
    fn default() -> Self {
        RegisterConfig {
            store_name: default_store_name(),
            database_path: None,
            auto_approve_overrides: false,
            pricing: PricingConfig::default(),
        }
    }
}

impl RegisterConfig {
    /// Loads configuration from file and environment.
    ///
    /// ## Environment Variables
    /// - `CHECKOUT_CONFIG`: Config file path
    /// - `CHECKOUT_STORE_NAME`: Override store name
    /// - `CHECKOUT_DB_PATH`: Override database path
    /// - `CHECKOUT_TAX_RATE`: Override tax rate in percent (e.g., "8.25")
    pub fn load() -> Result<Self, ConfigError> {
        let env = |name: &str| std::env::var(name).ok();
        let path = env("CHECKOUT_CONFIG")
            .map(PathBuf::from)
            .or_else(Self::default_config_path);

        let mut config = match path {
            Some(path) if path.exists() => {
                info!(?path, "Loading register config from file");
                Self::from_toml(&std::fs::read_to_string(&path)?)?
            }
            Some(path) => {
                debug!(?path, "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env_overrides(env);
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `CHECKOUT_*` overrides read through `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(store_name) = lookup("CHECKOUT_STORE_NAME") {
            self.store_name = store_name;
        }

        if let Some(path) = lookup("CHECKOUT_DB_PATH") {
            self.database_path = Some(PathBuf::from(path));
        }

        if let Some(rate) = lookup("CHECKOUT_TAX_RATE") {
            match rate.trim().parse::<f64>() {
                Ok(pct) if pct >= 0.0 => self.pricing.tax_rate = TaxRate::from_percentage(pct),
                _ => warn!(value = %rate, "Ignoring invalid CHECKOUT_TAX_RATE"),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store_name.trim().is_empty() {
            return Err(ConfigError::Invalid("store_name must not be empty".into()));
        }
        self.pricing
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// The configured database path, or `checkout.db` in the platform data
    /// directory (created if missing).
    ///
    /// ## Platform-Specific Paths
    /// - **macOS**: `~/Library/Application Support/com.checkout.register/`
    /// - **Windows**: `%APPDATA%\checkout\register\data\`
    /// - **Linux**: `~/.local/share/register/`
    pub fn resolve_database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }

        let dirs = ProjectDirs::from("com", "checkout", "register").ok_or(ConfigError::NoDataDir)?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        Ok(data_dir.join("checkout.db"))
    }

    fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "checkout", "register")
            .map(|dirs| dirs.config_dir().join("register.toml"))
    }
}
