//! Raw field parsers
//!
//! Turn exported CDR text into validated values. Any failure here rejects the
//! whole record before it reaches the rating engine.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::CdrError;
use crate::CdrResult;

/// Domestic country code, stripped from canonical numbers
const DOMESTIC_COUNTRY_CODE: &str = "62";

/// International access code kept in front of foreign numbers
const INTERNATIONAL_ACCESS_CODE: &str = "00";

/// Shortest digit string that can carry the country code and a subscriber
const MIN_COUNTRY_CODE_LEN: usize = 11;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Normalize a dialed number to its canonical digit string
///
/// - formatting characters (spaces, dashes, dots, parentheses) are dropped
/// - `+62` and a bare `62` country code on long numbers are stripped
/// - `+<other country>` becomes `00<digits>`; an existing `00` is kept
/// - a single domestic trunk `0` is stripped
pub fn normalize_phone(raw: &str) -> CdrResult<String> {
    let trimmed = raw.trim();

    if trimmed
        .chars()
        .any(|c| !(c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '.' | '(' | ')')))
    {
        return Err(CdrError::InvalidPhoneNumber(raw.to_string()));
    }

    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(CdrError::InvalidPhoneNumber(raw.to_string()));
    }

    if trimmed.starts_with('+') {
        return match digits.strip_prefix(DOMESTIC_COUNTRY_CODE) {
            Some(local) if !local.is_empty() => Ok(strip_trunk_prefix(local)),
            _ => Ok(format!("{}{}", INTERNATIONAL_ACCESS_CODE, digits)),
        };
    }

    if digits.starts_with(INTERNATIONAL_ACCESS_CODE) {
        return Ok(digits);
    }

    if digits.len() >= MIN_COUNTRY_CODE_LEN {
        if let Some(local) = digits.strip_prefix(DOMESTIC_COUNTRY_CODE) {
            return Ok(strip_trunk_prefix(local));
        }
    }

    Ok(strip_trunk_prefix(&digits))
}

fn strip_trunk_prefix(digits: &str) -> String {
    match digits.strip_prefix('0') {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => digits.to_string(),
    }
}

/// Parse a time span
///
/// Accepts `H:MM:SS[.ffffff]`, `MM:SS[.f]`, or plain seconds (`125`,
/// `45.5`). Empty and `-` mean zero.
pub fn parse_duration(raw: &str) -> CdrResult<Duration> {
    let text = raw.trim();
    if text.is_empty() || text == "-" {
        return Ok(Duration::zero());
    }
    if text.starts_with('-') {
        return Err(CdrError::NegativeDuration(raw.to_string()));
    }

    let invalid = || CdrError::InvalidDuration(raw.to_string());

    let parts: Vec<&str> = text.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [s] => ("0", "0", *s),
        [m, s] => ("0", *m, *s),
        [h, m, s] => (*h, *m, *s),
        _ => return Err(invalid()),
    };

    let hours: i64 = hours.parse().map_err(|_| invalid())?;
    let minutes: i64 = minutes.parse().map_err(|_| invalid())?;
    let seconds = Decimal::from_str(seconds).map_err(|_| invalid())?;

    if hours < 0 || minutes < 0 || seconds.is_sign_negative() {
        return Err(CdrError::NegativeDuration(raw.to_string()));
    }
    if parts.len() > 1 && (minutes >= 60 || seconds >= Decimal::from(60)) {
        return Err(invalid());
    }

    let micros = seconds
        .checked_mul(Decimal::from(1_000_000))
        .ok_or_else(invalid)?
        .trunc()
        .to_i64()
        .ok_or_else(invalid)?;

    let total = Duration::try_hours(hours)
        .zip(Duration::try_minutes(minutes))
        .and_then(|(h, m)| h.checked_add(&m))
        .and_then(|hm| hm.checked_add(&Duration::microseconds(micros)))
        .ok_or_else(invalid)?;

    Ok(total)
}

/// Parse an ISO-8601 timestamp
///
/// RFC 3339 input keeps its offset; naive input is taken as UTC.
pub fn parse_timestamp(raw: &str) -> CdrResult<DateTime<Utc>> {
    let text = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| CdrError::InvalidTimestamp(raw.to_string()))
}

/// Parse the answer timestamp, where `-` or empty means unanswered
pub fn parse_answered_at(raw: &str) -> CdrResult<Option<DateTime<Utc>>> {
    match raw.trim() {
        "" | "-" => Ok(None),
        text => parse_timestamp(text).map(Some),
    }
}

/// Clean up the free-text memo column
pub fn parse_memo(raw: &str) -> String {
    match raw.trim() {
        "-" => String::new(),
        text => text.to_string(),
    }
}
