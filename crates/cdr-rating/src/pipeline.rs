//! Rating pipeline
//!
//! Raw record in, assembled row out. Records are rated one at a time; a
//! malformed record is rejected on its own and never stops the run. Repeated
//! calls (same origin, destination and start time) are written once.

use cdr_core::{
    models::{CallRecord, Charge, RawCallRecord},
    traits::RatingService,
    CdrResult,
};
use serde::Serialize;
use std::collections::HashSet;
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::assembler::{assemble, hash_key, CallRow};
use crate::classifier::NumberPlan;
use crate::engine::ChargeEngine;

/// A fully rated call
#[derive(Debug, Clone)]
pub struct RatedCall {
    pub call: CallRecord,
    pub charge: Charge,
    pub row: CallRow,
    /// De-duplication key, see [`hash_key`]
    pub hash_key: String,
}

/// Counters for one pipeline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub rated: u64,
    pub rejected: u64,
    pub duplicates: u64,
    pub free: u64,
}

impl RunSummary {
    pub fn total(&self) -> u64 {
        self.rated + self.rejected + self.duplicates
    }
}

/// Engine, number plan and carrier fallback bundled for batch rating
#[derive(Debug, Clone)]
pub struct RatingPipeline {
    engine: ChargeEngine,
    plan: Arc<NumberPlan>,
    default_carrier: String,
}

impl RatingPipeline {
    pub fn new(engine: ChargeEngine, plan: Arc<NumberPlan>, default_carrier: impl Into<String>) -> Self {
        Self {
            engine,
            plan,
            default_carrier: default_carrier.into(),
        }
    }

    pub fn engine(&self) -> &ChargeEngine {
        &self.engine
    }

    /// Same plan and carrier, different engine (e.g. after reloading tables)
    pub fn with_engine(&self, engine: ChargeEngine) -> Self {
        Self {
            engine,
            plan: Arc::clone(&self.plan),
            default_carrier: self.default_carrier.clone(),
        }
    }

    /// Validate, rate and assemble one raw record
    pub fn rate_raw(&self, raw: &RawCallRecord) -> CdrResult<RatedCall> {
        let call = CallRecord::from_raw(raw, self.plan.as_ref(), &self.default_carrier)?;
        let charge = self.engine.evaluate(&call);
        let row = assemble(&call, &charge, self.plan.as_ref());
        let hash_key = hash_key(&call);

        Ok(RatedCall {
            call,
            charge,
            row,
            hash_key,
        })
    }

    /// Rate one JSON-encoded raw record
    pub fn rate_line(&self, line: &str) -> CdrResult<RatedCall> {
        let raw: RawCallRecord = serde_json::from_str(line)?;
        self.rate_raw(&raw)
    }

    /// Rate a JSON-lines stream, writing one JSON row per rated record
    ///
    /// Blank lines are skipped and a call already seen in this run is not
    /// written again. Only reader or writer failures abort the run.
    #[instrument(skip_all)]
    pub fn run<R: BufRead, W: Write>(&self, reader: R, mut writer: W) -> CdrResult<RunSummary> {
        let mut summary = RunSummary::default();
        let mut seen = HashSet::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match self.rate_line(&line) {
                Ok(rated) => {
                    if !seen.insert(rated.hash_key) {
                        debug!(
                            line = index + 1,
                            sequence_id = %rated.call.sequence_id,
                            "Skipping duplicate call"
                        );
                        summary.duplicates += 1;
                        continue;
                    }

                    serde_json::to_writer(&mut writer, &rated.row)?;
                    writeln!(writer)?;
                    summary.rated += 1;
                    if rated.charge.is_free() {
                        summary.free += 1;
                    }
                }
                Err(e) => {
                    warn!(
                        line = index + 1,
                        sequence_id = %sequence_id_hint(&line),
                        error_code = e.error_code(),
                        "Rejected record: {}",
                        e
                    );
                    summary.rejected += 1;
                }
            }
        }

        writer.flush()?;

        info!(
            rated = summary.rated,
            rejected = summary.rejected,
            duplicates = summary.duplicates,
            free = summary.free,
            "Rating run complete"
        );

        Ok(summary)
    }
}

/// Best-effort sequence id for logging a rejected line
fn sequence_id_hint(line: &str) -> String {
    serde_json::from_str::<serde_json::Value>(line)
        .ok()
        .and_then(|v| match v.get("sequence_id") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        })
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::RateTables;
    use cdr_core::models::RuleStep;
    use rust_decimal_macros::dec;

    const TABLES: &str = include_str!("../../../config/rate_tables.toml");
    const PLAN: &str = include_str!("../../../config/number_plan.toml");

    fn pipeline() -> RatingPipeline {
        let tables = Arc::new(RateTables::from_toml_str(TABLES).unwrap());
        let plan = Arc::new(NumberPlan::from_toml_str(PLAN).unwrap());
        RatingPipeline::new(ChargeEngine::new(tables), plan, "Atlasat")
    }

    fn raw(call_from: &str, call_to: &str, call_type: &str, duration: &str) -> RawCallRecord {
        RawCallRecord {
            sequence_id: "1001".to_string(),
            user_name: "Agent  One".to_string(),
            call_from: call_from.to_string(),
            call_to: call_to.to_string(),
            call_type: call_type.to_string(),
            dial_start_at: "2024-05-01 09:00:00".to_string(),
            dial_answered_at: "2024-05-01 09:00:05".to_string(),
            dial_end_at: "2024-05-01 09:02:10".to_string(),
            ringing_time: "0:00:05".to_string(),
            call_duration: duration.to_string(),
            call_memo: "-".to_string(),
            call_charge: String::new(),
            carrier: None,
        }
    }

    #[test]
    fn test_rate_raw_default_rate() {
        let rated = pipeline()
            .rate_raw(&raw("+62 21 5555 0000", "021-3042-9999", "Outbound call", "0:02:05"))
            .unwrap();

        assert_eq!(rated.call.call_from, "2155550000");
        assert_eq!(rated.charge.step, RuleStep::DefaultRate);
        assert_eq!(rated.charge.amount, dec!(2160));
        assert_eq!(rated.row.call_charge, "2160");
        assert_eq!(rated.row.user_name, "Agent One");
        assert_eq!(rated.row.call_memo, "");
    }

    #[test]
    fn test_rate_raw_exempt_incoming() {
        let rated = pipeline()
            .rate_raw(&raw("81234567890", "2130422260", "Incoming call", "0:10:00"))
            .unwrap();

        assert_eq!(rated.charge.step, RuleStep::CustomerExemption);
        assert_eq!(rated.row.call_charge, "0");
    }

    #[test]
    fn test_rate_raw_rejects_bad_duration() {
        let err = pipeline()
            .rate_raw(&raw("2155550000", "2130429999", "Outbound call", "abc"))
            .unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn test_run_counts_and_output() {
        let good = serde_json::to_string(&raw("2155550000", "2130429999", "Outbound call", "60")).unwrap();
        let free = serde_json::to_string(&raw("2155550000", "201", "Internal Call", "60")).unwrap();
        let input = format!("{}\n\nnot json\n{}\n", good, free);

        let mut out = Vec::new();
        let summary = pipeline().run(input.as_bytes(), &mut out).unwrap();

        assert_eq!(
            summary,
            RunSummary {
                rated: 2,
                rejected: 1,
                duplicates: 0,
                free: 1
            }
        );
        assert_eq!(summary.total(), 3);

        let output = String::from_utf8(out).unwrap();
        let rows: Vec<serde_json::Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Call charge"], "720");
        assert_eq!(rows[1]["Call charge"], "0");
    }

    #[test]
    fn test_run_survives_oversized_duration() {
        let oversized = serde_json::to_string(&raw(
            "2155550000",
            "2130429999",
            "Outbound call",
            "10000000000000000000000000",
        ))
        .unwrap();
        let good = serde_json::to_string(&raw("2155550000", "2130429999", "Outbound call", "60")).unwrap();
        let input = format!("{}\n{}\n", oversized, good);

        let mut out = Vec::new();
        let summary = pipeline().run(input.as_bytes(), &mut out).unwrap();

        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.rated, 1);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_run_skips_repeated_calls() {
        let first = raw("2155550000", "2130429999", "Outbound call", "60");
        let repeat = RawCallRecord {
            sequence_id: "1002".to_string(),
            ..first.clone()
        };
        let later = RawCallRecord {
            sequence_id: "1003".to_string(),
            dial_start_at: "2024-05-01 10:00:00".to_string(),
            ..first.clone()
        };
        let input = [first, repeat, later]
            .iter()
            .map(|r| serde_json::to_string(r).unwrap())
            .collect::<Vec<_>>()
            .join("\n");

        let mut out = Vec::new();
        let summary = pipeline().run(input.as_bytes(), &mut out).unwrap();

        assert_eq!(summary.rated, 2);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.total(), 3);

        let output = String::from_utf8(out).unwrap();
        let ids: Vec<String> = output
            .lines()
            .map(|l| {
                let row: serde_json::Value = serde_json::from_str(l).unwrap();
                row["Sequence ID"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(ids, vec!["1001", "1003"]);
    }

    #[test]
    fn test_rated_call_carries_hash_key() {
        let record = raw("2155550000", "2130429999", "Outbound call", "60");
        let rated = pipeline().rate_raw(&record).unwrap();
        assert_eq!(rated.hash_key, hash_key(&rated.call));
    }

    #[test]
    fn test_sequence_id_hint() {
        assert_eq!(sequence_id_hint(r#"{"sequence_id":"77"}"#), "77");
        assert_eq!(sequence_id_hint(r#"{"sequence_id":77}"#), "77");
        assert_eq!(sequence_id_hint("garbage"), "-");
    }
}
