//! Diagnosis and surgery reference data

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Diagnosis code reference entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisInfo {
    pub code: String,
    pub name: String,
    /// Static fraud-risk weight, 0..=1
    pub fraud_risk_base: Decimal,
    /// Typical treatment length in days
    pub standard_treatment_days: Option<u32>,
}

impl DiagnosisInfo {
    /// Stand-in used for codes missing from the reference table
    pub fn unknown(code: &str) -> Self {
        Self {
            code: code.to_string(),
            name: "Unclassified disease".to_string(),
            fraud_risk_base: dec!(0.2),
            standard_treatment_days: None,
        }
    }
}

/// Surgery code reference entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurgeryInfo {
    pub code: String,
    pub name: String,
    /// Classification tier 1..=5
    pub tier: u8,
}
