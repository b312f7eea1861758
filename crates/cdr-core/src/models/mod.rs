//! Domain models for CDR rating
//!
//! This module contains the core domain models shared by the rating engine,
//! the number classifier, and the record assembler.

pub mod call;
pub mod charge;
pub mod number_type;
pub mod rate;

pub use call::{CallRecord, CallType, RawCallRecord};
pub use charge::{BillingMode, Charge, RuleStep};
pub use number_type::NumberType;
pub use rate::{RateMode, RateSpec};
