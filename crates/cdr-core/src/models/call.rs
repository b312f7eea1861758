//! Call record model
//!
//! `RawCallRecord` is one row as exported by the PBX. `CallRecord` is the
//! validated, normalized form the rating engine consumes.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::number_type::NumberType;
use crate::error::CdrError;
use crate::parse::{
    normalize_phone, parse_answered_at, parse_duration, parse_memo, parse_timestamp,
};
use crate::traits::NumberClassifier;
use crate::CdrResult;

/// PBX call type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CallType {
    Incoming,
    Outbound,
    Internal,
    InternalNoAnswer,
    Monitoring,
    AnsweringMachine,
    /// Any label the rating rules do not distinguish
    Other(String),
}

impl CallType {
    pub fn as_str(&self) -> &str {
        match self {
            CallType::Incoming => "Incoming call",
            CallType::Outbound => "Outbound call",
            CallType::Internal => "Internal Call",
            CallType::InternalNoAnswer => "Internal Call (No answer)",
            CallType::Monitoring => "Monitoring",
            CallType::AnsweringMachine => "Answering machine",
            CallType::Other(label) => label,
        }
    }

    /// Internal legs and monitoring sessions are never billed
    #[inline]
    pub fn is_non_billable(&self) -> bool {
        matches!(
            self,
            CallType::Internal | CallType::InternalNoAnswer | CallType::Monitoring
        )
    }
}

impl From<&str> for CallType {
    fn from(label: &str) -> Self {
        match label.trim() {
            "Incoming call" => CallType::Incoming,
            "Outbound call" => CallType::Outbound,
            "Internal Call" => CallType::Internal,
            "Internal Call (No answer)" => CallType::InternalNoAnswer,
            "Monitoring" => CallType::Monitoring,
            "Answering machine" => CallType::AnsweringMachine,
            other => CallType::Other(other.to_string()),
        }
    }
}

impl From<String> for CallType {
    fn from(label: String) -> Self {
        CallType::from(label.as_str())
    }
}

impl From<CallType> for String {
    fn from(call_type: CallType) -> Self {
        call_type.as_str().to_string()
    }
}

impl fmt::Display for CallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One CDR row with every field still in its exported text form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCallRecord {
    pub sequence_id: String,
    #[serde(default)]
    pub user_name: String,
    pub call_from: String,
    pub call_to: String,
    pub call_type: String,
    pub dial_start_at: String,
    #[serde(default)]
    pub dial_answered_at: String,
    pub dial_end_at: String,
    #[serde(default)]
    pub ringing_time: String,
    pub call_duration: String,
    #[serde(default)]
    pub call_memo: String,
    /// Charge column as exported by the PBX; ignored, the engine recomputes it
    #[serde(default)]
    pub call_charge: String,
    #[serde(default)]
    pub carrier: Option<String>,
}

/// Validated call record
///
/// Built once per input row and never mutated afterwards. Phone numbers are
/// in canonical digit form and the number type has already been classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub sequence_id: String,
    pub user_name: String,

    /// Origin number, canonical form
    pub call_from: String,

    /// Destination number, canonical form
    pub call_to: String,

    pub call_type: CallType,
    pub dial_start_at: DateTime<Utc>,

    /// None when the call was never answered
    pub dial_answered_at: Option<DateTime<Utc>>,
    pub dial_end_at: DateTime<Utc>,
    pub ringing_time: Duration,

    /// Billable duration; not necessarily `dial_end_at - dial_answered_at`
    pub call_duration: Duration,
    pub call_memo: String,
    pub carrier: String,

    /// Classification of `call_to`, computed at construction
    pub number_type: NumberType,
}

impl CallRecord {
    /// Validate and normalize a raw row
    ///
    /// The whole record is rejected on the first malformed field.
    pub fn from_raw(
        raw: &RawCallRecord,
        classifier: &dyn NumberClassifier,
        default_carrier: &str,
    ) -> CdrResult<Self> {
        if raw.sequence_id.trim().is_empty() {
            return Err(CdrError::MissingField("sequence_id".to_string()));
        }

        let call_from = normalize_phone(&raw.call_from)?;
        let call_to = normalize_phone(&raw.call_to)?;
        let call_type = CallType::from(raw.call_type.as_str());
        let number_type = classifier.classify(&call_to, &call_type, &call_from, &call_to);

        let carrier = match raw.carrier.as_deref().map(str::trim) {
            Some(carrier) if !carrier.is_empty() => carrier.to_string(),
            _ => default_carrier.to_string(),
        };

        Ok(Self {
            sequence_id: raw.sequence_id.trim().to_string(),
            user_name: raw.user_name.clone(),
            call_from,
            call_to,
            call_type,
            dial_start_at: parse_timestamp(&raw.dial_start_at)?,
            dial_answered_at: parse_answered_at(&raw.dial_answered_at)?,
            dial_end_at: parse_timestamp(&raw.dial_end_at)?,
            ringing_time: parse_duration(&raw.ringing_time)?,
            call_duration: parse_duration(&raw.call_duration)?,
            call_memo: parse_memo(&raw.call_memo),
            carrier,
            number_type,
        })
    }

    /// Billable duration in seconds, exact to the microsecond
    pub fn duration_seconds(&self) -> Decimal {
        total_seconds(&self.call_duration)
    }

    /// Check if the call was answered
    #[inline]
    pub fn was_answered(&self) -> bool {
        self.dial_answered_at.is_some()
    }
}

impl Default for CallRecord {
    fn default() -> Self {
        let epoch = DateTime::<Utc>::default();
        Self {
            sequence_id: String::new(),
            user_name: String::new(),
            call_from: String::new(),
            call_to: String::new(),
            call_type: CallType::Outbound,
            dial_start_at: epoch,
            dial_answered_at: None,
            dial_end_at: epoch,
            ringing_time: Duration::zero(),
            call_duration: Duration::zero(),
            call_memo: String::new(),
            carrier: String::new(),
            number_type: NumberType::Standard(String::new()),
        }
    }
}

/// Total seconds of a duration as an exact decimal
pub fn total_seconds(duration: &Duration) -> Decimal {
    match duration.num_microseconds() {
        Some(micros) => Decimal::new(micros, 6),
        None => Decimal::new(duration.num_milliseconds(), 3),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    struct FixedClassifier(NumberType);

    impl NumberClassifier for FixedClassifier {
        fn classify(
            &self,
            _number: &str,
            _call_type: &CallType,
            _call_from: &str,
            _call_to: &str,
        ) -> NumberType {
            self.0.clone()
        }
    }

    fn raw_outbound() -> RawCallRecord {
        RawCallRecord {
            sequence_id: "1001".to_string(),
            user_name: "Agent 7".to_string(),
            call_from: "+62 21 5098 1444".to_string(),
            call_to: "0812-3456-7890".to_string(),
            call_type: "Outbound call".to_string(),
            dial_start_at: "2024-05-01T09:00:00Z".to_string(),
            dial_answered_at: "2024-05-01T09:00:05Z".to_string(),
            dial_end_at: "2024-05-01T09:02:10Z".to_string(),
            ringing_time: "0:00:05".to_string(),
            call_duration: "0:02:05".to_string(),
            call_memo: "-".to_string(),
            call_charge: "999".to_string(),
            carrier: None,
        }
    }

    #[test]
    fn test_call_type_labels() {
        assert_eq!(CallType::from("Incoming call"), CallType::Incoming);
        assert_eq!(
            CallType::from("Internal Call (No answer)"),
            CallType::InternalNoAnswer
        );
        assert_eq!(
            CallType::from("Voicemail"),
            CallType::Other("Voicemail".to_string())
        );
        assert_eq!(CallType::AnsweringMachine.as_str(), "Answering machine");
    }

    #[test]
    fn test_call_type_serde() {
        let ct: CallType = serde_json::from_str("\"Monitoring\"").unwrap();
        assert_eq!(ct, CallType::Monitoring);
        assert!(ct.is_non_billable());
        assert_eq!(
            serde_json::to_string(&CallType::Outbound).unwrap(),
            "\"Outbound call\""
        );
    }

    #[test]
    fn test_from_raw_normalizes() {
        let classifier = FixedClassifier(NumberType::Standard("Mobile".to_string()));
        let call = CallRecord::from_raw(&raw_outbound(), &classifier, "Atlasat").unwrap();

        assert_eq!(call.call_from, "2150981444");
        assert_eq!(call.call_to, "81234567890");
        assert_eq!(call.call_type, CallType::Outbound);
        assert_eq!(call.carrier, "Atlasat");
        assert_eq!(call.duration_seconds(), dec!(125));
        assert!(call.was_answered());
        assert_eq!(call.call_memo, "");
        assert_eq!(call.number_type, NumberType::Standard("Mobile".to_string()));
    }

    #[test]
    fn test_from_raw_unanswered() {
        let classifier = FixedClassifier(NumberType::Standard("Local".to_string()));
        let raw = RawCallRecord {
            dial_answered_at: "-".to_string(),
            call_duration: "0:00:00".to_string(),
            carrier: Some("Telin".to_string()),
            ..raw_outbound()
        };
        let call = CallRecord::from_raw(&raw, &classifier, "Atlasat").unwrap();
        assert!(!call.was_answered());
        assert_eq!(call.duration_seconds(), Decimal::ZERO);
        assert_eq!(call.carrier, "Telin");
    }

    #[test]
    fn test_from_raw_rejects_bad_timestamp() {
        let classifier = FixedClassifier(NumberType::Standard("Local".to_string()));
        let raw = RawCallRecord {
            dial_start_at: "yesterday".to_string(),
            ..raw_outbound()
        };
        let err = CallRecord::from_raw(&raw, &classifier, "Atlasat").unwrap_err();
        assert_eq!(err.error_code(), "invalid_timestamp");
    }

    #[test]
    fn test_from_raw_rejects_negative_duration() {
        let classifier = FixedClassifier(NumberType::Standard("Local".to_string()));
        let raw = RawCallRecord {
            call_duration: "-0:00:05".to_string(),
            ..raw_outbound()
        };
        let err = CallRecord::from_raw(&raw, &classifier, "Atlasat").unwrap_err();
        assert_eq!(err.error_code(), "negative_duration");
    }

    #[test]
    fn test_from_raw_requires_sequence_id() {
        let classifier = FixedClassifier(NumberType::Standard("Local".to_string()));
        let raw = RawCallRecord {
            sequence_id: "  ".to_string(),
            ..raw_outbound()
        };
        assert!(matches!(
            CallRecord::from_raw(&raw, &classifier, "Atlasat"),
            Err(CdrError::MissingField(_))
        ));
    }

    #[test]
    fn test_total_seconds_fractional() {
        assert_eq!(total_seconds(&Duration::milliseconds(45_500)), dec!(45.5));
    }
}
