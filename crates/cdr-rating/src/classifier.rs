//! Table-driven number classifier
//!
//! Classifies canonical destination numbers against a number plan file:
//! emergency short codes, scan-to-call prefixes, service prefixes, and
//! international calling codes (longest prefix wins).

use cdr_core::{
    models::{CallType, NumberType},
    traits::NumberClassifier,
    CdrError, CdrResult,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use tracing::{info, instrument};

const INTERNATIONAL_ACCESS_CODE: &str = "00";

/// Number plan as written in the plan file
#[derive(Debug, Clone, Deserialize)]
struct NumberPlanFile {
    internal_max_len: usize,
    #[serde(default)]
    scan_prefixes: Vec<String>,
    #[serde(default)]
    premium_prefixes: Vec<String>,
    #[serde(default)]
    toll_free_prefixes: Vec<String>,
    #[serde(default)]
    split_charge_prefixes: Vec<String>,
    #[serde(default)]
    mobile_prefixes: Vec<String>,
    mobile_label: String,
    local_label: String,
    international_fallback_label: String,
    #[serde(default)]
    emergency_numbers: HashMap<String, String>,
    #[serde(default)]
    international_prefixes: HashMap<String, String>,
}

/// Validated number plan, usable as a [`NumberClassifier`]
#[derive(Debug, Clone)]
pub struct NumberPlan {
    plan: NumberPlanFile,
    longest_international_prefix: usize,
}

impl NumberPlan {
    /// Load a number plan from a TOML file
    #[instrument]
    pub fn load(path: &str) -> CdrResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CdrError::Config(format!("cannot read number plan {}: {}", path, e)))?;
        let plan = Self::from_toml_str(&content)?;

        info!(
            emergency = plan.plan.emergency_numbers.len(),
            international = plan.plan.international_prefixes.len(),
            "Loaded number plan from {}",
            path
        );

        Ok(plan)
    }

    pub fn from_toml_str(content: &str) -> CdrResult<Self> {
        let plan: NumberPlanFile = toml::from_str(content)?;

        let prefix_lists = [
            ("scan_prefixes", &plan.scan_prefixes),
            ("premium_prefixes", &plan.premium_prefixes),
            ("toll_free_prefixes", &plan.toll_free_prefixes),
            ("split_charge_prefixes", &plan.split_charge_prefixes),
            ("mobile_prefixes", &plan.mobile_prefixes),
        ];
        for (table, prefixes) in prefix_lists {
            prefixes.iter().try_for_each(|p| validate_digits(table, p))?;
        }
        plan.emergency_numbers
            .keys()
            .try_for_each(|n| validate_digits("emergency_numbers", n))?;
        plan.international_prefixes
            .keys()
            .try_for_each(|p| validate_digits("international_prefixes", p))?;

        let longest_international_prefix = plan
            .international_prefixes
            .keys()
            .map(String::len)
            .max()
            .unwrap_or(0);

        Ok(Self {
            plan,
            longest_international_prefix,
        })
    }

    fn international(&self, subscriber: &str) -> NumberType {
        let longest = self.longest_international_prefix.min(subscriber.len());
        let label = (1..=longest)
            .rev()
            .find_map(|len| {
                subscriber
                    .get(..len)
                    .and_then(|prefix| self.plan.international_prefixes.get(prefix))
            })
            .unwrap_or(&self.plan.international_fallback_label);
        NumberType::International(label.clone())
    }
}

impl NumberClassifier for NumberPlan {
    fn classify(
        &self,
        number: &str,
        call_type: &CallType,
        _call_from: &str,
        _call_to: &str,
    ) -> NumberType {
        if let Some(label) = self.plan.emergency_numbers.get(number) {
            return NumberType::Emergency(label.clone());
        }

        if *call_type == CallType::AnsweringMachine {
            return if has_prefix(number, &self.plan.scan_prefixes) {
                NumberType::ScanCall
            } else {
                NumberType::AnsweringMachine
            };
        }

        if number.len() <= self.plan.internal_max_len {
            return NumberType::InternalCall;
        }

        if has_prefix(number, &self.plan.premium_prefixes) {
            return NumberType::PremiumCall;
        }
        if has_prefix(number, &self.plan.toll_free_prefixes) {
            return NumberType::TollFree;
        }
        if has_prefix(number, &self.plan.split_charge_prefixes) {
            return NumberType::SplitCharge;
        }

        if let Some(subscriber) = number.strip_prefix(INTERNATIONAL_ACCESS_CODE) {
            return self.international(subscriber);
        }

        if has_prefix(number, &self.plan.mobile_prefixes) {
            NumberType::from_label(&self.plan.mobile_label)
        } else {
            NumberType::from_label(&self.plan.local_label)
        }
    }
}

fn has_prefix(number: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|p| number.starts_with(p.as_str()))
}

fn validate_digits(table: &str, value: &str) -> CdrResult<()> {
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(CdrError::InvalidTableNumber {
            table: table.to_string(),
            number: value.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = include_str!("../../../config/number_plan.toml");

    fn plan() -> NumberPlan {
        NumberPlan::from_toml_str(PLAN).unwrap()
    }

    fn classify(number: &str, call_type: CallType) -> NumberType {
        plan().classify(number, &call_type, "2150981444", number)
    }

    #[test]
    fn test_emergency_numbers() {
        assert_eq!(
            classify("112", CallType::Outbound),
            NumberType::Emergency("Emergency".to_string())
        );
        assert_eq!(
            classify("118", CallType::Outbound),
            NumberType::Emergency("Ambulance".to_string())
        );
    }

    #[test]
    fn test_answering_machine_legs() {
        assert_eq!(
            classify("30000060", CallType::AnsweringMachine),
            NumberType::ScanCall
        );
        assert_eq!(
            classify("2150981444", CallType::AnsweringMachine),
            NumberType::AnsweringMachine
        );
        // scan prefix outside an answering-machine leg is an ordinary number
        assert_eq!(
            classify("30000060", CallType::Outbound),
            NumberType::Standard("Local".to_string())
        );
    }

    #[test]
    fn test_internal_extensions() {
        assert_eq!(classify("201", CallType::Outbound), NumberType::InternalCall);
        assert_eq!(classify("1001", CallType::Incoming), NumberType::InternalCall);
        assert_eq!(
            classify("22245", CallType::Outbound),
            NumberType::Standard("Local".to_string())
        );
    }

    #[test]
    fn test_service_prefixes() {
        assert_eq!(classify("8091234567", CallType::Outbound), NumberType::PremiumCall);
        assert_eq!(classify("8001503377", CallType::Outbound), NumberType::TollFree);
        assert_eq!(classify("8041234567", CallType::Outbound), NumberType::SplitCharge);
    }

    #[test]
    fn test_international_longest_prefix() {
        assert_eq!(
            classify("006561234567", CallType::Outbound),
            NumberType::International("Singapore".to_string())
        );
        assert_eq!(
            classify("0012125551234", CallType::Outbound),
            NumberType::International("United States".to_string())
        );
        assert_eq!(
            classify("00999123456", CallType::Outbound),
            NumberType::International("International".to_string())
        );
    }

    #[test]
    fn test_domestic_labels() {
        assert_eq!(
            classify("81234567890", CallType::Outbound),
            NumberType::Standard("Mobile".to_string())
        );
        assert_eq!(
            classify("2130422260", CallType::Outbound),
            NumberType::Standard("Local".to_string())
        );
    }

    #[test]
    fn test_classification_is_idempotent() {
        let plan = plan();
        for number in ["112", "30000060", "8091234567", "006561234567", "2130422260"] {
            let first = plan.classify(number, &CallType::Outbound, "1", number);
            let second = plan.classify(number, &CallType::Outbound, "1", number);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_rejects_malformed_prefix() {
        let content = r#"
            internal_max_len = 4
            premium_prefixes = ["80x"]
            mobile_label = "Mobile"
            local_label = "Local"
            international_fallback_label = "International"
        "#;
        assert!(matches!(
            NumberPlan::from_toml_str(content),
            Err(CdrError::InvalidTableNumber { .. })
        ));
    }
}
