//! Rating services for CDR Rater
//!
//! This crate turns validated call records into charges and output rows.
//!
//! # Architecture
//!
//! - Rate tables and the number plan are loaded once and shared behind `Arc`
//! - The engine is a pure function of the call and the tables; it never
//!   mutates either, so it is safe to share across threads
//! - Rating is instrumented with tracing
//!
//! # Services
//!
//! - `ChargeEngine` - Ordered rule cascade producing a `Charge` per call
//! - `RateTables` - Validated rate tables (TOML or JSON)
//! - `NumberPlan` - Table-driven number classifier
//! - `assemble` - Output row with human-readable columns
//! - `RatingPipeline` - JSON-lines batch rating

pub mod assembler;
pub mod classifier;
pub mod engine;
pub mod pipeline;
pub mod tables;

pub use assembler::{assemble, hash_key, CallRow};
pub use classifier::NumberPlan;
pub use engine::{ChargeEngine, CASCADE};
pub use pipeline::{RatedCall, RatingPipeline, RunSummary};
pub use tables::{RateTables, TenantRule};
