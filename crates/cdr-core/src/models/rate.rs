//! Rate specification model
//!
//! A rate entry from the rate tables: a billing mode plus a magnitude in
//! minor currency units. Holds the billing-mode arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::charge::{BillingMode, Charge, RuleStep};

const SECONDS_PER_MINUTE: i64 = 60;

/// Billing mode of a rate table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateMode {
    PerMinute,
    PerSecond,
}

/// Rate table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSpec {
    pub mode: RateMode,
    pub rate: Decimal,
}

impl RateSpec {
    pub fn per_minute(rate: Decimal) -> Self {
        Self {
            mode: RateMode::PerMinute,
            rate,
        }
    }

    pub fn per_second(rate: Decimal) -> Self {
        Self {
            mode: RateMode::PerSecond,
            rate,
        }
    }

    /// Calculate the cost for a duration given in seconds
    ///
    /// Per-minute rounds the duration up to whole minutes first, so a
    /// one-second call bills a full minute. Per-second is exact.
    #[inline]
    pub fn calculate_cost(&self, seconds: Decimal) -> Decimal {
        match self.mode {
            RateMode::PerMinute => per_minute_cost(seconds, self.rate),
            RateMode::PerSecond => per_second_cost(seconds, self.rate),
        }
    }

    /// Billing mode recorded on the resulting charge
    pub fn billing_mode(&self) -> BillingMode {
        match self.mode {
            RateMode::PerMinute => BillingMode::PerMinute { rate: self.rate },
            RateMode::PerSecond => BillingMode::PerSecond { rate: self.rate },
        }
    }

    /// Build the charge for `seconds` attributed to `step`
    pub fn charge(&self, seconds: Decimal, step: RuleStep) -> Charge {
        Charge {
            amount: self.calculate_cost(seconds),
            mode: self.billing_mode(),
            step,
        }
    }
}

/// `ceil(seconds / 60) * rate`
#[inline]
pub fn per_minute_cost(seconds: Decimal, rate: Decimal) -> Decimal {
    let minutes = (seconds / Decimal::from(SECONDS_PER_MINUTE)).ceil();
    minutes * rate
}

/// `seconds * rate`, no rounding
#[inline]
pub fn per_second_cost(seconds: Decimal, rate: Decimal) -> Decimal {
    seconds * rate
}
