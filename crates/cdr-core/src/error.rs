//! Unified error handling for CDR rating
//!
//! Errors fall into two groups: input errors reject a single record before
//! it reaches the engine, configuration errors abort before any call is rated.
//! The charge engine itself never fails for a structurally valid record.

use thiserror::Error;

/// Main error type
#[derive(Error, Debug)]
pub enum CdrError {
    // ==================== Input Validation Errors ====================
    #[error("Invalid phone number: {0:?}")]
    InvalidPhoneNumber(String),

    #[error("Invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    #[error("Invalid duration: {0:?}")]
    InvalidDuration(String),

    #[error("Negative duration: {0:?}")]
    NegativeDuration(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    // ==================== Configuration Errors ====================
    #[error("Invalid rate in {table} for {key}: {reason}")]
    InvalidRate {
        table: String,
        key: String,
        reason: String,
    },

    #[error("Invalid number in {table}: {number:?}")]
    InvalidTableNumber { table: String, number: String },

    #[error("Configuration error: {0}")]
    Config(String),

    // ==================== Internal Errors ====================
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl CdrError {
    /// Returns a stable error code for logs and rejection reports
    pub fn error_code(&self) -> &'static str {
        match self {
            CdrError::InvalidPhoneNumber(_) => "invalid_phone_number",
            CdrError::InvalidTimestamp(_) => "invalid_timestamp",
            CdrError::InvalidDuration(_) => "invalid_duration",
            CdrError::NegativeDuration(_) => "negative_duration",
            CdrError::MissingField(_) => "missing_field",
            CdrError::InvalidRate { .. } => "invalid_rate",
            CdrError::InvalidTableNumber { .. } => "invalid_table_number",
            CdrError::Config(_) => "config_error",
            CdrError::Serialization(_) => "serialization_error",
            CdrError::Io(_) => "io_error",
        }
    }

    /// True when the error rejects a single input record rather than the run
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CdrError::InvalidPhoneNumber(_)
                | CdrError::InvalidTimestamp(_)
                | CdrError::InvalidDuration(_)
                | CdrError::NegativeDuration(_)
                | CdrError::MissingField(_)
                | CdrError::Serialization(_)
        )
    }
}

// ==================== From implementations ====================

impl From<serde_json::Error> for CdrError {
    fn from(err: serde_json::Error) -> Self {
        CdrError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for CdrError {
    fn from(err: std::io::Error) -> Self {
        CdrError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for CdrError {
    fn from(err: toml::de::Error) -> Self {
        CdrError::Config(err.to_string())
    }
}

impl From<config::ConfigError> for CdrError {
    fn from(err: config::ConfigError) -> Self {
        CdrError::Config(err.to_string())
    }
}
