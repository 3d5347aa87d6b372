//! Approval line templates
//!
//! A template names the ordered roles that must sign off a claim. Templates
//! carry a filter (claim type, amount range, minimum fraud score) and a
//! priority; the first matching template in priority order wins.

use serde::{Deserialize, Serialize};

use core_kernel::{TemplateId, Won};
use domain_claims::ClaimType;

/// Template that approves without any human step
pub const AUTO_APPROVE_TEMPLATE: &str = "AUTO_APPROVE";

/// One step of an approval line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStep {
    /// 1-based position in the line
    pub step: u32,
    pub role_code: String,
    pub step_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalTemplate {
    pub id: TemplateId,
    pub template_code: String,
    pub template_name: String,
    pub description: Option<String>,
    /// Matches every claim type when unset
    pub claim_type: Option<ClaimType>,
    pub min_amount: Option<Won>,
    pub max_amount: Option<Won>,
    /// Matches claims scoring at least this much
    pub fraud_score_threshold: Option<u8>,
    pub steps: Vec<ApprovalStep>,
    /// Lower values are tried first
    pub priority: i32,
    pub is_active: bool,
}

impl ApprovalTemplate {
    pub fn matches(&self, claim_type: ClaimType, amount: Won, fraud_score: u8) -> bool {
        self.is_active
            && self.claim_type.map_or(true, |t| t == claim_type)
            && self.min_amount.map_or(true, |min| amount >= min)
            && self.max_amount.map_or(true, |max| amount <= max)
            && self.fraud_score_threshold.map_or(true, |t| fraud_score >= t)
    }

    pub fn is_auto_approve(&self) -> bool {
        self.template_code == AUTO_APPROVE_TEMPLATE
    }

    pub fn total_steps(&self) -> u32 {
        self.steps.len() as u32
    }
}

/// Picks the highest-priority matching template, ties broken by code
pub fn select_template<'a>(
    templates: impl IntoIterator<Item = &'a ApprovalTemplate>,
    claim_type: ClaimType,
    amount: Won,
    fraud_score: u8,
) -> Option<&'a ApprovalTemplate> {
    templates
        .into_iter()
        .filter(|t| t.matches(claim_type, amount, fraud_score))
        .min_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.template_code.cmp(&b.template_code))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(code: &str, priority: i32) -> ApprovalTemplate {
        ApprovalTemplate {
            id: TemplateId::new(),
            template_code: code.to_string(),
            template_name: code.to_string(),
            description: None,
            claim_type: None,
            min_amount: None,
            max_amount: None,
            fraud_score_threshold: None,
            steps: vec![ApprovalStep {
                step: 1,
                role_code: "TEAM_LEAD".into(),
                step_name: "Team lead review".into(),
            }],
            priority,
            is_active: true,
        }
    }

    #[test]
    fn test_priority_then_code() {
        let templates = vec![template("B", 10), template("A", 10), template("C", 20)];
        let picked = select_template(&templates, ClaimType::Outpatient, Won::ZERO, 0).unwrap();
        assert_eq!(picked.template_code, "A");
    }

    #[test]
    fn test_amount_range_is_inclusive() {
        let mut t = template("MID", 1);
        t.min_amount = Some(Won::from_i64(1_000_000));
        t.max_amount = Some(Won::from_i64(5_000_000));
        assert!(t.matches(ClaimType::Hospitalization, Won::from_i64(1_000_000), 0));
        assert!(t.matches(ClaimType::Hospitalization, Won::from_i64(5_000_000), 0));
        assert!(!t.matches(ClaimType::Hospitalization, Won::from_i64(5_000_001), 0));
    }

    #[test]
    fn test_fraud_threshold_and_type_filter() {
        let mut t = template("SIU", 0);
        t.fraud_score_threshold = Some(50);
        t.claim_type = Some(ClaimType::Surgery);
        assert!(!t.matches(ClaimType::Surgery, Won::ZERO, 49));
        assert!(t.matches(ClaimType::Surgery, Won::ZERO, 50));
        assert!(!t.matches(ClaimType::Outpatient, Won::ZERO, 80));
    }

    #[test]
    fn test_inactive_never_matches() {
        let mut t = template("OLD", 0);
        t.is_active = false;
        assert!(select_template([&t], ClaimType::Outpatient, Won::ZERO, 0).is_none());
    }
}
