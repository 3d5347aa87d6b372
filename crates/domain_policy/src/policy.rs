//! Policy contract and policyholder

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{code_enum, CustomerId, Percent, PolicyId};

code_enum! {
    /// Lifecycle status of an issued policy
    pub enum PolicyStatus {
        Active => "ACTIVE",
        Lapsed => "LAPSED",
        Terminated => "TERMINATED",
        Suspended => "SUSPENDED",
    }
}

code_enum! {
    /// Premium payment standing
    pub enum PremiumStatus {
        Paid => "PAID",
        Grace => "GRACE",
        Overdue => "OVERDUE",
    }
}

code_enum! {
    /// Fraud-watch grade assigned to a customer
    pub enum RiskGrade {
        Normal => "NORMAL",
        Watch => "WATCH",
        HighRisk => "HIGH_RISK",
    }
}

/// An issued policy
///
/// Policies are never edited by the claims platform; status changes are
/// driven by the policy administration system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    pub policy_number: String,
    pub customer_id: CustomerId,
    pub product_code: String,
    pub product_name: String,
    pub coverage_start_date: NaiveDate,
    pub coverage_end_date: NaiveDate,
    /// Causes are excluded entirely up to and including this date
    pub exemption_end_date: Option<NaiveDate>,
    /// Benefits are reduced up to and including this date
    pub reduction_end_date: Option<NaiveDate>,
    /// Reduction applied during the reduction period; 50% when unset
    pub reduction_rate: Option<Percent>,
    pub premium_status: PremiumStatus,
    pub status: PolicyStatus,
}

impl Policy {
    pub fn is_active(&self) -> bool {
        self.status == PolicyStatus::Active
    }

    /// Checks whether a date falls inside the coverage window
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.coverage_start_date && date <= self.coverage_end_date
    }

    pub fn in_exemption_period(&self, date: NaiveDate) -> bool {
        self.exemption_end_date.is_some_and(|end| date <= end)
    }

    pub fn in_reduction_period(&self, date: NaiveDate) -> bool {
        self.reduction_end_date.is_some_and(|end| date <= end)
    }

    /// Rate used when the reduction period applies
    pub fn effective_reduction_rate(&self) -> Percent {
        self.reduction_rate.unwrap_or(Percent::whole(50))
    }
}

/// Policyholder as seen by claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub risk_grade: RiskGrade,
    /// Accumulated fraud-watch score, 0..=100
    pub risk_score: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> Policy {
        Policy {
            id: PolicyId::new(),
            policy_number: "POL-2024-001".into(),
            customer_id: CustomerId::new(),
            product_code: "PREMIUM_HEALTH".into(),
            product_name: "Premium Health".into(),
            coverage_start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            coverage_end_date: NaiveDate::from_ymd_opt(2034, 12, 31).unwrap(),
            exemption_end_date: None,
            reduction_end_date: NaiveDate::from_ymd_opt(2024, 12, 31),
            reduction_rate: None,
            premium_status: PremiumStatus::Paid,
            status: PolicyStatus::Active,
        }
    }

    #[test]
    fn test_reduction_rate_defaults_to_half() {
        assert_eq!(policy().effective_reduction_rate(), Percent::whole(50));
    }

    #[test]
    fn test_period_bounds_are_inclusive() {
        let p = policy();
        assert!(p.in_reduction_period(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()));
        assert!(!p.in_reduction_period(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));
        assert!(p.covers(p.coverage_start_date));
        assert!(!p.in_exemption_period(p.coverage_start_date));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!("HIGH_RISK".parse::<RiskGrade>().unwrap(), RiskGrade::HighRisk);
        assert_eq!(PremiumStatus::Overdue.as_str(), "OVERDUE");
    }
}
