//! Record assembler
//!
//! Builds the human-readable output row for a rated call.

use cdr_core::{
    models::{CallRecord, Charge},
    traits::NumberClassifier,
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Output row, serialized with the column headings of the CDR report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallRow {
    #[serde(rename = "Sequence ID")]
    pub sequence_id: String,
    #[serde(rename = "User name")]
    pub user_name: String,
    #[serde(rename = "Call from")]
    pub call_from: String,
    #[serde(rename = "Call to")]
    pub call_to: String,
    #[serde(rename = "Call type")]
    pub call_type: String,
    #[serde(rename = "Number type")]
    pub number_type: String,
    #[serde(rename = "Dial starts at")]
    pub dial_starts_at: String,
    #[serde(rename = "Dial answered at")]
    pub dial_answered_at: String,
    #[serde(rename = "Dial ends at")]
    pub dial_ends_at: String,
    #[serde(rename = "Ringing time")]
    pub ringing_time: String,
    #[serde(rename = "Call duration")]
    pub call_duration: String,
    #[serde(rename = "Call memo")]
    pub call_memo: String,
    #[serde(rename = "Call charge")]
    pub call_charge: String,
}

/// Assemble the output row
///
/// The number type is classified again rather than read from `call`, so the
/// row reflects the classifier even when the record was built elsewhere.
pub fn assemble(call: &CallRecord, charge: &Charge, classifier: &dyn NumberClassifier) -> CallRow {
    let number_type = classifier.classify(&call.call_to, &call.call_type, &call.call_from, &call.call_to);

    CallRow {
        sequence_id: call.sequence_id.clone(),
        user_name: format_username(&call.user_name),
        call_from: call.call_from.clone(),
        call_to: call.call_to.clone(),
        call_type: call.call_type.to_string(),
        number_type: number_type.label().to_string(),
        dial_starts_at: format_timestamp(Some(&call.dial_start_at)),
        dial_answered_at: format_timestamp(call.dial_answered_at.as_ref()),
        dial_ends_at: format_timestamp(Some(&call.dial_end_at)),
        ringing_time: format_duration(&call.ringing_time),
        call_duration: format_duration(&call.call_duration),
        call_memo: call.call_memo.clone(),
        call_charge: charge.amount_display(),
    }
}

/// De-duplication key: SHA-256 of origin, destination and start time
pub fn hash_key(call: &CallRecord) -> String {
    let mut hasher = Sha256::new();
    hasher.update(call.call_from.as_bytes());
    hasher.update(b"|");
    hasher.update(call.call_to.as_bytes());
    hasher.update(b"|");
    hasher.update(call.dial_start_at.to_rfc3339().as_bytes());
    hex::encode(hasher.finalize())
}

/// `YYYY-MM-DD HH:MM:SS`, or `-` when absent
pub fn format_timestamp(ts: Option<&DateTime<Utc>>) -> String {
    ts.map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// `HH:MM:SS`, whole seconds, hours not wrapped at 24
pub fn format_duration(duration: &Duration) -> String {
    let total = duration.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Trim and collapse internal whitespace
pub fn format_username(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}
