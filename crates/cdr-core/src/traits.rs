//! Collaborator traits
//!
//! The rating engine depends on these seams, not on concrete implementations.

use crate::models::{CallRecord, CallType, Charge, NumberType};

/// Maps a dialed number to its semantic class
///
/// Implementations must be deterministic: the record assembler calls
/// `classify` again when building the output row and expects the label the
/// engine rated with.
pub trait NumberClassifier: Send + Sync {
    /// Classify `number` for a call of `call_type` between `call_from` and `call_to`
    fn classify(
        &self,
        number: &str,
        call_type: &CallType,
        call_from: &str,
        call_to: &str,
    ) -> NumberType;
}

/// Computes the charge for a single call
pub trait RatingService: Send + Sync {
    /// Rate `call`; pure, never fails for a validated record
    fn evaluate(&self, call: &CallRecord) -> Charge;
}
