//! Number type model
//!
//! Semantic classification of the dialed number, as produced by a
//! [`NumberClassifier`](crate::traits::NumberClassifier).

use serde::{Serialize, Serializer};
use std::fmt;

/// Classified number type
///
/// The label of each variant is what appears in the output row and what
/// carrier rate tables are keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NumberType {
    /// Extension-to-extension call inside the PBX
    InternalCall,
    /// Premium-rate service number
    PremiumCall,
    /// Toll-free service number
    TollFree,
    /// Split-charge service number
    SplitCharge,
    /// Leg terminated by an answering machine
    AnsweringMachine,
    /// Scan-to-call number reached through an answering machine leg
    ScanCall,
    /// Emergency service, labelled by service name
    Emergency(String),
    /// International destination, labelled by country or region
    International(String),
    /// Any other class (domestic landline, mobile, unrecognized labels)
    Standard(String),
}

impl NumberType {
    pub const INTERNAL_CALL: &'static str = "Internal Call";
    pub const PREMIUM_CALL: &'static str = "Premium Call";
    pub const TOLL_FREE: &'static str = "Toll-Free";
    pub const SPLIT_CHARGE: &'static str = "Split Charge";
    pub const ANSWERING_MACHINE: &'static str = "Answering machine";
    pub const SCAN_CALL: &'static str = "scancall";

    /// Display label
    pub fn label(&self) -> &str {
        match self {
            NumberType::InternalCall => Self::INTERNAL_CALL,
            NumberType::PremiumCall => Self::PREMIUM_CALL,
            NumberType::TollFree => Self::TOLL_FREE,
            NumberType::SplitCharge => Self::SPLIT_CHARGE,
            NumberType::AnsweringMachine => Self::ANSWERING_MACHINE,
            NumberType::ScanCall => Self::SCAN_CALL,
            NumberType::Emergency(label)
            | NumberType::International(label)
            | NumberType::Standard(label) => label,
        }
    }

    /// Map one of the fixed labels back to its variant
    ///
    /// Anything else, including plan-specific domestic labels, becomes
    /// `Standard`.
    pub fn from_label(label: &str) -> Self {
        match label {
            Self::INTERNAL_CALL => NumberType::InternalCall,
            Self::PREMIUM_CALL => NumberType::PremiumCall,
            Self::TOLL_FREE => NumberType::TollFree,
            Self::SPLIT_CHARGE => NumberType::SplitCharge,
            Self::ANSWERING_MACHINE => NumberType::AnsweringMachine,
            Self::SCAN_CALL => NumberType::ScanCall,
            other => NumberType::Standard(other.to_string()),
        }
    }

    /// True for every class that is not premium, toll-free, split-charge,
    /// emergency, or international.
    ///
    /// Gates the per-origin overrides: an override for a tenant's line only
    /// applies to ordinary domestic traffic.
    #[inline]
    pub fn is_standard_domestic_class(&self) -> bool {
        !matches!(
            self,
            NumberType::PremiumCall
                | NumberType::TollFree
                | NumberType::SplitCharge
                | NumberType::Emergency(_)
                | NumberType::International(_)
        )
    }

    /// Classes billed at the premium surcharge rate
    #[inline]
    pub fn is_premium_class(&self) -> bool {
        matches!(
            self,
            NumberType::PremiumCall
                | NumberType::TollFree
                | NumberType::SplitCharge
                | NumberType::Emergency(_)
        )
    }
}

impl fmt::Display for NumberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for NumberType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}
