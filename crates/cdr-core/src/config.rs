//! Application configuration
//!
//! This module provides centralized configuration management using the `config` crate.
//! Configuration can be loaded from environment variables and config files.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub rating: RatingConfig,
    pub logging: LoggingConfig,
}

/// Rating data sources
#[derive(Debug, Deserialize, Clone)]
pub struct RatingConfig {
    /// Rate tables file (TOML or JSON)
    #[serde(default = "default_tables_path")]
    pub tables_path: String,

    /// Number plan file used by the classifier
    #[serde(default = "default_number_plan_path")]
    pub number_plan_path: String,

    /// Carrier applied to records that do not name one
    #[serde(default = "default_carrier")]
    pub default_carrier: String,
}

fn default_tables_path() -> String {
    "config/rate_tables.toml".to_string()
}

fn default_number_plan_path() -> String {
    "config/number_plan.toml".to_string()
}

fn default_carrier() -> String {
    "Atlasat".to_string()
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with default values
            .set_default("rating.tables_path", default_tables_path())?
            .set_default("rating.number_plan_path", default_number_plan_path())?
            .set_default("rating.default_carrier", default_carrier())?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.json", false)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables with CDR_ prefix
            .add_source(
                Environment::with_prefix("CDR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("rating.tables_path", default_tables_path())?
            .set_default("rating.number_plan_path", default_number_plan_path())?
            .set_default("rating.default_carrier", default_carrier())?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.json", false)?
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("CDR").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            tables_path: default_tables_path(),
            number_plan_path: default_number_plan_path(),
            default_carrier: default_carrier(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
