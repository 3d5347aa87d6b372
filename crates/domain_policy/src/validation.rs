//! Treatment-date validation of a policy
//!
//! Before a claim is priced the policy must be in force for the treatment
//! date. Exemption periods make the claim unpayable; reduction periods only
//! scale the payout down and are reported without failing validation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::Percent;
use crate::policy::{Policy, PolicyStatus, PremiumStatus};

/// A single finding from policy validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationIssue {
    PolicyNotFound,
    PolicyNotActive { status: PolicyStatus },
    PremiumOverdue,
    BeforeCoverageStart { coverage_start: NaiveDate },
    AfterCoverageEnd { coverage_end: NaiveDate },
    ExemptionPeriod { exemption_end: NaiveDate },
    ReductionPeriod { reduction_end: NaiveDate, rate: Percent },
}

impl ValidationIssue {
    /// Whether the issue makes the claim unpayable
    pub fn is_blocking(&self) -> bool {
        !matches!(self, ValidationIssue::ReductionPeriod { .. })
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::PolicyNotFound => write!(f, "policy not found"),
            ValidationIssue::PolicyNotActive { status } => {
                write!(f, "policy is not active (status: {status})")
            }
            ValidationIssue::PremiumOverdue => write!(f, "premium payment overdue"),
            ValidationIssue::BeforeCoverageStart { coverage_start } => {
                write!(f, "treatment before coverage start ({coverage_start})")
            }
            ValidationIssue::AfterCoverageEnd { coverage_end } => {
                write!(f, "treatment after coverage end ({coverage_end})")
            }
            ValidationIssue::ExemptionPeriod { exemption_end } => {
                write!(f, "exemption period (until {exemption_end})")
            }
            ValidationIssue::ReductionPeriod { reduction_end, rate } => {
                write!(f, "reduction period (until {reduction_end}, {rate} reduced)")
            }
        }
    }
}

/// Outcome of validating a policy for a treatment date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyValidation {
    pub is_valid: bool,
    pub issues: Vec<ValidationIssue>,
    pub exemption_applies: bool,
    pub reduction_applies: bool,
    /// Zero unless the reduction period applies
    pub reduction_rate: Percent,
}

impl PolicyValidation {
    pub fn policy_not_found() -> Self {
        Self {
            is_valid: false,
            issues: vec![ValidationIssue::PolicyNotFound],
            exemption_applies: false,
            reduction_applies: false,
            reduction_rate: Percent::ZERO,
        }
    }

    /// Blocking issues joined for display
    pub fn rejection_summary(&self) -> String {
        self.issues
            .iter()
            .filter(|i| i.is_blocking())
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Validates that `policy` pays for treatment starting on `treatment_date`
pub fn validate_for_treatment(policy: &Policy, treatment_date: NaiveDate) -> PolicyValidation {
    let mut issues = Vec::new();

    if policy.status != PolicyStatus::Active {
        issues.push(ValidationIssue::PolicyNotActive { status: policy.status });
    }
    if policy.premium_status == PremiumStatus::Overdue {
        issues.push(ValidationIssue::PremiumOverdue);
    }
    if treatment_date < policy.coverage_start_date {
        issues.push(ValidationIssue::BeforeCoverageStart {
            coverage_start: policy.coverage_start_date,
        });
    }
    if treatment_date > policy.coverage_end_date {
        issues.push(ValidationIssue::AfterCoverageEnd {
            coverage_end: policy.coverage_end_date,
        });
    }

    let exemption_applies = policy.in_exemption_period(treatment_date);
    if let (true, Some(exemption_end)) = (exemption_applies, policy.exemption_end_date) {
        issues.push(ValidationIssue::ExemptionPeriod { exemption_end });
    }

    let reduction_applies = !exemption_applies && policy.in_reduction_period(treatment_date);
    let reduction_rate = if reduction_applies {
        policy.effective_reduction_rate()
    } else {
        Percent::ZERO
    };
    if let (true, Some(reduction_end)) = (reduction_applies, policy.reduction_end_date) {
        issues.push(ValidationIssue::ReductionPeriod {
            reduction_end,
            rate: reduction_rate,
        });
    }

    let is_valid = !issues.iter().any(ValidationIssue::is_blocking);
    if !is_valid {
        tracing::debug!(
            policy_number = %policy.policy_number,
            issues = issues.len(),
            "policy failed treatment-date validation"
        );
    }

    PolicyValidation {
        is_valid,
        issues,
        exemption_applies,
        reduction_applies,
        reduction_rate,
    }
}
