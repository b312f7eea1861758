//! CDR Rater Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for rating call detail records. It includes:
//!
//! - Domain models (CallRecord, NumberType, Charge, RateSpec)
//! - Collaborator traits (number classification, rating)
//! - Parsers that turn raw CDR fields into validated values
//! - Unified error handling
//! - Application configuration

pub mod config;
pub mod error;
pub mod models;
pub mod parse;
pub mod traits;

pub use config::AppConfig;
pub use error::CdrError;

/// Result type alias using CdrError
pub type CdrResult<T> = Result<T, CdrError>;
