//! Rate Table Store
//!
//! Immutable rating data: exemption sets, flat overrides, tenant rules and
//! carrier tables. Loaded once, validated up front, then shared read-only
//! behind an `Arc` for the lifetime of a rating run.

use cdr_core::{
    models::{CallRecord, NumberType, RateSpec},
    CdrError, CdrResult,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{info, instrument};

/// Largest accepted rate, per minute or per second
///
/// Keeps `rate * seconds` inside `Decimal` range for any duration a
/// `chrono::Duration` can hold, so rating cannot overflow.
pub const MAX_RATE: i64 = 1_000_000_000;

/// Rule scoped to one tenant's numbers
///
/// Rules are evaluated in file order; the first one that returns a rate wins.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TenantRule {
    /// Matched on the origin number
    Origin {
        name: String,
        numbers: HashSet<String>,
        /// Rate for standard domestic classes
        standard: RateSpec,
        /// Rate for excluded classes; `None` falls through to later rules
        #[serde(default)]
        excluded: Option<RateSpec>,
    },

    /// Matched when either leg is the given number
    Either {
        name: String,
        number: String,
        standard: RateSpec,
    },

    /// Origin match is gated on the class, destination match is not
    OriginOrDestination {
        name: String,
        origins: HashSet<String>,
        destinations: HashSet<String>,
        standard: RateSpec,
        destination: RateSpec,
    },
}

impl TenantRule {
    pub fn name(&self) -> &str {
        match self {
            TenantRule::Origin { name, .. }
            | TenantRule::Either { name, .. }
            | TenantRule::OriginOrDestination { name, .. } => name,
        }
    }

    /// Rate this rule assigns to `call`, or `None` to fall through
    pub fn rate_for(&self, call: &CallRecord) -> Option<RateSpec> {
        let standard_class = call.number_type.is_standard_domestic_class();

        match self {
            TenantRule::Origin {
                numbers,
                standard,
                excluded,
                ..
            } => {
                if !numbers.contains(&call.call_from) {
                    return None;
                }
                if standard_class {
                    Some(*standard)
                } else {
                    *excluded
                }
            }

            // Answering-machine legs are a standard class, so they take the
            // standard rate here as well.
            TenantRule::Either {
                number, standard, ..
            } => {
                let matched = call.call_from == *number || call.call_to == *number;
                (matched && standard_class).then_some(*standard)
            }

            TenantRule::OriginOrDestination {
                origins,
                destinations,
                standard,
                destination,
                ..
            } => {
                if origins.contains(&call.call_from) {
                    standard_class.then_some(*standard)
                } else if destinations.contains(&call.call_to) {
                    Some(*destination)
                } else {
                    None
                }
            }
        }
    }

    fn validate(&self) -> CdrResult<()> {
        let table = format!("tenant_rules.{}", self.name());
        match self {
            TenantRule::Origin {
                numbers,
                standard,
                excluded,
                ..
            } => {
                validate_number_set(&table, numbers)?;
                validate_spec(&table, "standard", standard)?;
                if let Some(spec) = excluded {
                    validate_spec(&table, "excluded", spec)?;
                }
            }
            TenantRule::Either {
                number, standard, ..
            } => {
                validate_number(&table, number)?;
                validate_spec(&table, "standard", standard)?;
            }
            TenantRule::OriginOrDestination {
                origins,
                destinations,
                standard,
                destination,
                ..
            } => {
                validate_number_set(&table, origins)?;
                validate_number_set(&table, destinations)?;
                validate_spec(&table, "standard", standard)?;
                validate_spec(&table, "destination", destination)?;
            }
        }
        Ok(())
    }
}

/// Rating data as written in the tables file
#[derive(Debug, Clone, Deserialize)]
struct RateTablesFile {
    default_rate_per_minute: Decimal,
    premium_rate_per_minute: Decimal,
    #[serde(default)]
    exempt_incoming: HashSet<String>,
    #[serde(default)]
    scan_not_chargeable: HashSet<String>,
    #[serde(default)]
    destination_overrides: HashMap<String, RateSpec>,
    #[serde(default)]
    outbound_per_second: HashMap<String, Decimal>,
    #[serde(default)]
    tenant_rules: Vec<TenantRule>,
    #[serde(default)]
    carriers: HashMap<String, HashMap<String, Decimal>>,
}

/// Validated, read-only rate tables
#[derive(Debug, Clone)]
pub struct RateTables {
    default_rate: RateSpec,
    premium_rate: RateSpec,
    exempt_incoming: HashSet<String>,
    scan_not_chargeable: HashSet<String>,
    destination_overrides: HashMap<String, RateSpec>,
    outbound_per_second: HashMap<String, Decimal>,
    tenant_rules: Vec<TenantRule>,
    carriers: HashMap<String, HashMap<String, Decimal>>,
}

impl RateTables {
    /// Load tables from a `.toml` or `.json` file
    #[instrument]
    pub fn load(path: &str) -> CdrResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CdrError::Config(format!("cannot read rate tables {}: {}", path, e)))?;

        let tables = match Path::new(path).extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content)?,
            _ => Self::from_toml_str(&content)?,
        };

        info!(
            destinations = tables.destination_overrides.len(),
            tenant_rules = tables.tenant_rules.len(),
            carriers = tables.carriers.len(),
            "Loaded rate tables from {}",
            path
        );

        Ok(tables)
    }

    pub fn from_toml_str(content: &str) -> CdrResult<Self> {
        let file: RateTablesFile = toml::from_str(content)?;
        Self::from_file(file)
    }

    pub fn from_json_str(content: &str) -> CdrResult<Self> {
        let file: RateTablesFile = serde_json::from_str(content)
            .map_err(|e| CdrError::Config(format!("invalid rate tables: {}", e)))?;
        Self::from_file(file)
    }

    fn from_file(file: RateTablesFile) -> CdrResult<Self> {
        let tables = Self {
            default_rate: RateSpec::per_minute(file.default_rate_per_minute),
            premium_rate: RateSpec::per_minute(file.premium_rate_per_minute),
            exempt_incoming: file.exempt_incoming,
            scan_not_chargeable: file.scan_not_chargeable,
            destination_overrides: file.destination_overrides,
            outbound_per_second: file.outbound_per_second,
            tenant_rules: file.tenant_rules,
            carriers: file.carriers,
        };
        tables.validate()?;
        Ok(tables)
    }

    /// Reject negative rates and malformed numbers
    fn validate(&self) -> CdrResult<()> {
        validate_spec("defaults", "default_rate_per_minute", &self.default_rate)?;
        validate_spec("defaults", "premium_rate_per_minute", &self.premium_rate)?;

        validate_number_set("exempt_incoming", &self.exempt_incoming)?;
        validate_number_set("scan_not_chargeable", &self.scan_not_chargeable)?;

        for (number, spec) in &self.destination_overrides {
            validate_number("destination_overrides", number)?;
            validate_spec("destination_overrides", number, spec)?;
        }

        for (number, rate) in &self.outbound_per_second {
            validate_number("outbound_per_second", number)?;
            validate_rate("outbound_per_second", number, *rate)?;
        }

        for rule in &self.tenant_rules {
            rule.validate()?;
        }

        for (carrier, rates) in &self.carriers {
            let table = format!("carriers.{}", carrier);
            for (label, rate) in rates {
                validate_rate(&table, label, *rate)?;
            }
        }

        Ok(())
    }

    // ==================== Lookups ====================

    #[inline]
    pub fn is_exempt_incoming(&self, number: &str) -> bool {
        self.exempt_incoming.contains(number)
    }

    #[inline]
    pub fn is_scan_not_chargeable(&self, number: &str) -> bool {
        self.scan_not_chargeable.contains(number)
    }

    #[inline]
    pub fn destination_override(&self, number: &str) -> Option<&RateSpec> {
        self.destination_overrides.get(number)
    }

    /// Per-second rate for outbound calls from `number`
    #[inline]
    pub fn outbound_per_second(&self, number: &str) -> Option<RateSpec> {
        self.outbound_per_second
            .get(number)
            .map(|rate| RateSpec::per_second(*rate))
    }

    pub fn tenant_rules(&self) -> &[TenantRule] {
        &self.tenant_rules
    }

    /// Per-minute rate for `number_type` on `carrier`
    pub fn carrier_rate(&self, carrier: &str, number_type: &NumberType) -> Option<RateSpec> {
        self.carriers
            .get(carrier)
            .and_then(|rates| rates.get(number_type.label()))
            .map(|rate| RateSpec::per_minute(*rate))
    }

    pub fn default_rate(&self) -> RateSpec {
        self.default_rate
    }

    pub fn premium_rate(&self) -> RateSpec {
        self.premium_rate
    }
}

fn validate_rate(table: &str, key: &str, rate: Decimal) -> CdrResult<()> {
    let reason = if rate.is_sign_negative() && !rate.is_zero() {
        format!("rate must not be negative, got {}", rate)
    } else if rate > Decimal::from(MAX_RATE) {
        format!("rate must not exceed {}, got {}", MAX_RATE, rate)
    } else {
        return Ok(());
    };

    Err(CdrError::InvalidRate {
        table: table.to_string(),
        key: key.to_string(),
        reason,
    })
}

fn validate_spec(table: &str, key: &str, spec: &RateSpec) -> CdrResult<()> {
    validate_rate(table, key, spec.rate)
}

fn validate_number(table: &str, number: &str) -> CdrResult<()> {
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
        return Err(CdrError::InvalidTableNumber {
            table: table.to_string(),
            number: number.to_string(),
        });
    }
    Ok(())
}

fn validate_number_set(table: &str, numbers: &HashSet<String>) -> CdrResult<()> {
    if numbers.is_empty() && table.starts_with("tenant_rules") {
        return Err(CdrError::Config(format!("{} has no numbers", table)));
    }
    numbers.iter().try_for_each(|n| validate_number(table, n))
}
