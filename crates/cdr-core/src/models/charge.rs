//! Charge model
//!
//! The output of rating: an exact amount in minor currency units plus the
//! billing mode and cascade step that produced it.

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// How the amount was computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BillingMode {
    /// Not billed
    Free,
    /// Duration rounded up to whole minutes, times rate
    PerMinute { rate: Decimal },
    /// Exact elapsed seconds, times rate
    PerSecond { rate: Decimal },
}

/// Step of the rating cascade that matched, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStep {
    CustomerExemption,
    NonBillableCallType,
    InternalNumberType,
    DestinationOverride,
    AnsweringMachine,
    OutboundPerSecond,
    TenantRule,
    PremiumSurcharge,
    CarrierRate,
    DefaultRate,
}

impl RuleStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleStep::CustomerExemption => "customer_exemption",
            RuleStep::NonBillableCallType => "non_billable_call_type",
            RuleStep::InternalNumberType => "internal_number_type",
            RuleStep::DestinationOverride => "destination_override",
            RuleStep::AnsweringMachine => "answering_machine",
            RuleStep::OutboundPerSecond => "outbound_per_second",
            RuleStep::TenantRule => "tenant_rule",
            RuleStep::PremiumSurcharge => "premium_surcharge",
            RuleStep::CarrierRate => "carrier_rate",
            RuleStep::DefaultRate => "default_rate",
        }
    }
}

impl fmt::Display for RuleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rated charge for one call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Charge {
    /// Amount in minor currency units, never negative
    pub amount: Decimal,

    /// Billing mode that produced the amount
    pub mode: BillingMode,

    /// Cascade step that matched
    pub step: RuleStep,
}

impl Charge {
    /// Zero charge attributed to `step`
    pub fn free(step: RuleStep) -> Self {
        Self {
            amount: Decimal::ZERO,
            mode: BillingMode::Free,
            step,
        }
    }

    /// True when nothing is billed
    #[inline]
    pub fn is_free(&self) -> bool {
        self.amount.is_zero()
    }

    /// Amount as a display string without trailing zeros
    pub fn amount_display(&self) -> String {
        self.amount.normalize().to_string()
    }
}
