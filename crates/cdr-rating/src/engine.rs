//! Charge rule engine
//!
//! Rates a call by walking an ordered cascade of rule steps against the rate
//! tables. The first step that produces a charge wins; the default
//! per-minute rate terminates the cascade, so every call gets a charge.

use cdr_core::{
    models::{CallRecord, CallType, Charge, NumberType, RuleStep},
    traits::RatingService,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

use crate::tables::RateTables;

/// Evaluation order, excluding the terminal default rate
pub const CASCADE: [RuleStep; 9] = [
    RuleStep::CustomerExemption,
    RuleStep::NonBillableCallType,
    RuleStep::InternalNumberType,
    RuleStep::DestinationOverride,
    RuleStep::AnsweringMachine,
    RuleStep::OutboundPerSecond,
    RuleStep::TenantRule,
    RuleStep::PremiumSurcharge,
    RuleStep::CarrierRate,
];

/// Rule engine bound to one immutable set of rate tables
///
/// Cheap to clone and safe to share across threads; rating never mutates
/// the tables or the call.
#[derive(Debug, Clone)]
pub struct ChargeEngine {
    tables: Arc<RateTables>,
}

impl ChargeEngine {
    /// Create a new engine over `tables`
    pub fn new(tables: Arc<RateTables>) -> Self {
        Self { tables }
    }

    /// Engine over a freshly loaded set of tables
    pub fn with_tables(&self, tables: Arc<RateTables>) -> Self {
        Self::new(tables)
    }

    pub fn tables(&self) -> &RateTables {
        &self.tables
    }

    /// Evaluate a single cascade step
    ///
    /// Returns `None` when the step does not match and evaluation should
    /// continue with the next one.
    pub fn apply_step(&self, step: RuleStep, call: &CallRecord) -> Option<Charge> {
        let seconds = call.duration_seconds();

        match step {
            RuleStep::CustomerExemption => self.customer_exemption(call),
            RuleStep::NonBillableCallType => self.non_billable_call_type(call),
            RuleStep::InternalNumberType => self.internal_number_type(call),
            RuleStep::DestinationOverride => self.destination_override(call, seconds),
            RuleStep::AnsweringMachine => self.answering_machine(call),
            RuleStep::OutboundPerSecond => self.outbound_per_second(call, seconds),
            RuleStep::TenantRule => self.tenant_rule(call, seconds),
            RuleStep::PremiumSurcharge => self.premium_surcharge(call, seconds),
            RuleStep::CarrierRate => self.carrier_rate(call, seconds),
            RuleStep::DefaultRate => Some(self.default_rate(seconds)),
        }
    }

    fn customer_exemption(&self, call: &CallRecord) -> Option<Charge> {
        (call.call_type == CallType::Incoming && self.tables.is_exempt_incoming(&call.call_to))
            .then(|| Charge::free(RuleStep::CustomerExemption))
    }

    fn non_billable_call_type(&self, call: &CallRecord) -> Option<Charge> {
        call.call_type
            .is_non_billable()
            .then(|| Charge::free(RuleStep::NonBillableCallType))
    }

    fn internal_number_type(&self, call: &CallRecord) -> Option<Charge> {
        (call.number_type == NumberType::InternalCall)
            .then(|| Charge::free(RuleStep::InternalNumberType))
    }

    fn destination_override(&self, call: &CallRecord, seconds: Decimal) -> Option<Charge> {
        self.tables
            .destination_override(&call.call_to)
            .map(|spec| spec.charge(seconds, RuleStep::DestinationOverride))
    }

    fn answering_machine(&self, call: &CallRecord) -> Option<Charge> {
        if call.call_type != CallType::AnsweringMachine {
            return None;
        }

        // Every answering-machine leg is free. Scan-call legs are told apart
        // only so non-chargeable scan numbers stay visible in the logs.
        if call.number_type == NumberType::ScanCall
            && self.tables.is_scan_not_chargeable(&call.call_to)
        {
            trace!(call_to = %call.call_to, "Non-chargeable scan-to-call number");
        }

        Some(Charge::free(RuleStep::AnsweringMachine))
    }

    fn outbound_per_second(&self, call: &CallRecord, seconds: Decimal) -> Option<Charge> {
        if call.call_type != CallType::Outbound {
            return None;
        }

        let spec = self.tables.outbound_per_second(&call.call_from)?;
        if !call.number_type.is_standard_domestic_class() {
            trace!(
                call_from = %call.call_from,
                number_type = %call.number_type,
                "Skipping per-second origin rate for excluded class"
            );
            return None;
        }

        Some(spec.charge(seconds, RuleStep::OutboundPerSecond))
    }

    fn tenant_rule(&self, call: &CallRecord, seconds: Decimal) -> Option<Charge> {
        self.tables.tenant_rules().iter().find_map(|rule| {
            let spec = rule.rate_for(call)?;
            debug!(tenant = rule.name(), "Tenant rule matched");
            Some(spec.charge(seconds, RuleStep::TenantRule))
        })
    }

    fn premium_surcharge(&self, call: &CallRecord, seconds: Decimal) -> Option<Charge> {
        call.number_type
            .is_premium_class()
            .then(|| self.tables.premium_rate().charge(seconds, RuleStep::PremiumSurcharge))
    }

    fn carrier_rate(&self, call: &CallRecord, seconds: Decimal) -> Option<Charge> {
        self.tables
            .carrier_rate(&call.carrier, &call.number_type)
            .map(|spec| spec.charge(seconds, RuleStep::CarrierRate))
    }

    fn default_rate(&self, seconds: Decimal) -> Charge {
        self.tables.default_rate().charge(seconds, RuleStep::DefaultRate)
    }
}

impl RatingService for ChargeEngine {
    #[instrument(
        skip(self, call),
        fields(sequence_id = %call.sequence_id, call_type = %call.call_type, number_type = %call.number_type)
    )]
    fn evaluate(&self, call: &CallRecord) -> Charge {
        let charge = CASCADE
            .iter()
            .find_map(|step| self.apply_step(*step, call))
            .unwrap_or_else(|| self.default_rate(call.duration_seconds()));

        debug!(
            step = %charge.step,
            amount = %charge.amount,
            "Rated call"
        );

        charge
    }
}
