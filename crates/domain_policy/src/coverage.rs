//! Coverage lines attached to a policy
//!
//! A policy carries one `PolicyCoverage` per benefit it pays. The coverage
//! code identifies the benefit; the calculation kind selects which payout
//! formula applies to it.

use serde::{Deserialize, Serialize};

use core_kernel::{code_enum, CoverageId, Percent, PolicyId, Won};

code_enum! {
    /// How a coverage line computes its payout
    pub enum CalculationKind {
        /// Reimbursement of incurred cost less deductible
        RealLoss => "REAL_LOSS",
        /// Fixed amount per hospitalized day
        Daily => "DAILY",
        /// Fixed amount on occurrence
        LumpSum => "LUMP_SUM",
    }
}

/// Well-known coverage codes
pub mod codes {
    pub const HOSP_INSURED: &str = "DIS_HOSP_INS";
    pub const HOSP_UNINSURED: &str = "DIS_HOSP_UNINS";
    pub const HOSP_DAILY: &str = "DIS_HOSP_DAILY";
    pub const OUTPATIENT_INSURED: &str = "OUT_INS";
    pub const OUTPATIENT_UNINSURED: &str = "OUT_UNINS";
    pub const SURGERY_PREFIX: &str = "DIS_SURG_";

    /// Surgery lump-sum code for a classification tier, e.g. `DIS_SURG_3`
    pub fn surgery(tier: u8) -> String {
        format!("{SURGERY_PREFIX}{tier}")
    }
}

/// Default cap on paid hospitalization days
pub const DEFAULT_MAX_DAYS: u32 = 180;

/// One covered benefit on a policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyCoverage {
    pub id: CoverageId,
    pub policy_id: PolicyId,
    pub coverage_code: String,
    pub coverage_name: String,
    pub calculation_kind: CalculationKind,
    /// Daily amount for daily lines, fixed benefit for lump sums
    pub insured_amount: Won,
    pub deductible_amount: Won,
    pub deductible_rate: Percent,
    pub payout_rate: Percent,
    pub per_occurrence_limit: Option<Won>,
    pub annual_limit: Option<Won>,
    pub lifetime_limit: Option<Won>,
    /// Amount paid out under this line in the current policy year
    pub used_annual_amount: Won,
    /// Days paid out under this line
    pub used_days: u32,
    pub max_days: Option<u32>,
    /// Surgery classification tier (1..=5) for surgery lines
    pub surgery_tier: Option<u8>,
    pub is_active: bool,
}

impl PolicyCoverage {
    pub fn max_days_or_default(&self) -> u32 {
        self.max_days.unwrap_or(DEFAULT_MAX_DAYS)
    }

    /// Limit applied to outpatient lines: per-occurrence, else insured amount
    pub fn occurrence_limit(&self) -> Won {
        self.per_occurrence_limit.unwrap_or(self.insured_amount)
    }

    /// Remaining annual headroom, if the line has an annual limit
    pub fn remaining_annual(&self) -> Option<Won> {
        self.annual_limit
            .map(|limit| limit.saturating_sub(self.used_annual_amount))
    }
}

/// Lookup over a policy's active coverage lines
#[derive(Debug, Clone, Default)]
pub struct CoverageSet {
    lines: Vec<PolicyCoverage>,
}

impl CoverageSet {
    /// Builds the set, dropping inactive lines
    pub fn new(lines: Vec<PolicyCoverage>) -> Self {
        Self {
            lines: lines.into_iter().filter(|c| c.is_active).collect(),
        }
    }

    pub fn by_code(&self, code: &str) -> Option<&PolicyCoverage> {
        self.lines.iter().find(|c| c.coverage_code == code)
    }

    /// Surgery line for a classification tier
    pub fn surgery_for_tier(&self, tier: u8) -> Option<&PolicyCoverage> {
        self.lines.iter().find(|c| {
            c.coverage_code.starts_with(codes::SURGERY_PREFIX) && c.surgery_tier == Some(tier)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PolicyCoverage> {
        self.lines.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(code: &str, tier: Option<u8>, active: bool) -> PolicyCoverage {
        PolicyCoverage {
            id: CoverageId::new(),
            policy_id: PolicyId::new(),
            coverage_code: code.to_string(),
            coverage_name: code.to_string(),
            calculation_kind: CalculationKind::LumpSum,
            insured_amount: Won::from_i64(1_000_000),
            deductible_amount: Won::ZERO,
            deductible_rate: Percent::ZERO,
            payout_rate: Percent::FULL,
            per_occurrence_limit: None,
            annual_limit: Some(Won::from_i64(50_000_000)),
            lifetime_limit: None,
            used_annual_amount: Won::from_i64(60_000_000),
            used_days: 0,
            max_days: None,
            surgery_tier: tier,
            is_active: active,
        }
    }

    #[test]
    fn test_inactive_lines_are_dropped() {
        let set = CoverageSet::new(vec![line("DIS_SURG_1", Some(1), false)]);
        assert!(set.is_empty());
    }

    #[test]
    fn test_surgery_tier_lookup() {
        let set = CoverageSet::new(vec![
            line("DIS_SURG_1", Some(1), true),
            line("DIS_SURG_3", Some(3), true),
        ]);
        assert_eq!(set.surgery_for_tier(3).unwrap().coverage_code, "DIS_SURG_3");
        assert!(set.surgery_for_tier(5).is_none());
    }

    #[test]
    fn test_remaining_annual_never_negative() {
        assert_eq!(line("DIS_HOSP_INS", None, true).remaining_annual(), Some(Won::ZERO));
    }

    #[test]
    fn test_surgery_code_format() {
        assert_eq!(codes::surgery(2), "DIS_SURG_2");
    }
}
