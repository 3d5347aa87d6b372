//! Pre-built Test Fixtures
//!
//! Ready-to-use policies, coverage lines, reference data and approvers.
//! Values are fixed so assertions on payouts stay predictable.

use chrono::NaiveDate;
use fake::faker::name::en::Name;
use fake::Fake;
use rust_decimal_macros::dec;

use core_kernel::{CoverageId, CustomerId, Percent, PolicyId, TemplateId, UserId, Won};
use domain_approval::{ApprovalStep, ApprovalTemplate, Approver, AUTO_APPROVE_TEMPLATE};
use domain_claims::{ClaimType, ReasoningStyle, ScoringModel};
use domain_policy::coverage::codes;
use domain_policy::{
    CalculationKind, Customer, DiagnosisInfo, Policy, PolicyCoverage, PolicyStatus, PolicyTerm,
    PremiumStatus, RiskGrade, SurgeryInfo, TermCategory,
};

/// Shorthand for a calendar date; panics on an invalid date
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid fixture date")
}

/// Contract fixtures
pub struct PolicyFixtures;

impl PolicyFixtures {
    pub const POLICY_NUMBER: &'static str = "POL-2020-0001";
    pub const PRODUCT_CODE: &'static str = "PREMIUM_HEALTH";

    pub fn customer() -> Customer {
        Customer {
            id: CustomerId::new(),
            name: "Kim Minji".into(),
            birth_date: Some(date(1985, 3, 2)),
            phone: Some("010-1234-5678".into()),
            risk_grade: RiskGrade::Normal,
            risk_score: 0,
        }
    }

    /// Active, paid-up policy covering 2020 through 2040
    pub fn policy(customer_id: CustomerId) -> Policy {
        Policy {
            id: PolicyId::new(),
            policy_number: Self::POLICY_NUMBER.into(),
            customer_id,
            product_code: Self::PRODUCT_CODE.into(),
            product_name: "Premium Health".into(),
            coverage_start_date: date(2020, 1, 1),
            coverage_end_date: date(2040, 12, 31),
            exemption_end_date: None,
            reduction_end_date: None,
            reduction_rate: None,
            premium_status: PremiumStatus::Paid,
            status: PolicyStatus::Active,
        }
    }

    /// Policy still inside its 90-day exemption window on `treatment`
    pub fn policy_in_exemption(customer_id: CustomerId, treatment: NaiveDate) -> Policy {
        let mut policy = Self::policy(customer_id);
        policy.coverage_start_date = treatment - chrono::Duration::days(30);
        policy.exemption_end_date = Some(treatment + chrono::Duration::days(60));
        policy
    }
}

/// Coverage line fixtures
pub struct CoverageFixtures;

impl CoverageFixtures {
    pub fn line(policy_id: PolicyId, code: &str, kind: CalculationKind) -> PolicyCoverage {
        PolicyCoverage {
            id: CoverageId::new(),
            policy_id,
            coverage_code: code.into(),
            coverage_name: code.into(),
            calculation_kind: kind,
            insured_amount: Won::ZERO,
            deductible_amount: Won::ZERO,
            deductible_rate: Percent::ZERO,
            payout_rate: Percent::FULL,
            per_occurrence_limit: None,
            annual_limit: Some(Won::from_i64(50_000_000)),
            lifetime_limit: None,
            used_annual_amount: Won::ZERO,
            used_days: 0,
            max_days: None,
            surgery_tier: None,
            is_active: true,
        }
    }

    /// The standard health package: real-loss hospitalization (insured and
    /// uninsured), daily hospitalization, outpatient and a tier-3 surgery
    pub fn standard_package(policy_id: PolicyId) -> Vec<PolicyCoverage> {
        let mut insured = Self::line(policy_id, codes::HOSP_INSURED, CalculationKind::RealLoss);
        insured.deductible_amount = Won::from_i64(100_000);

        let mut uninsured = Self::line(policy_id, codes::HOSP_UNINSURED, CalculationKind::RealLoss);
        uninsured.deductible_amount = Won::from_i64(200_000);
        uninsured.deductible_rate = Percent::whole(20);
        uninsured.payout_rate = Percent::whole(80);

        let mut daily = Self::line(policy_id, codes::HOSP_DAILY, CalculationKind::Daily);
        daily.insured_amount = Won::from_i64(30_000);
        daily.annual_limit = None;
        daily.max_days = Some(180);

        let mut outpatient = Self::line(policy_id, codes::OUTPATIENT_INSURED, CalculationKind::RealLoss);
        outpatient.deductible_amount = Won::from_i64(10_000);
        outpatient.per_occurrence_limit = Some(Won::from_i64(200_000));

        let mut surgery = Self::line(policy_id, &codes::surgery(3), CalculationKind::LumpSum);
        surgery.insured_amount = Won::from_i64(1_000_000);
        surgery.surgery_tier = Some(3);
        surgery.annual_limit = None;

        vec![insured, uninsured, daily, outpatient, surgery]
    }
}

/// Diagnosis, surgery, term and scoring-model reference rows
pub struct ReferenceFixtures;

impl ReferenceFixtures {
    pub fn pneumonia() -> DiagnosisInfo {
        DiagnosisInfo {
            code: "J18.9".into(),
            name: "Pneumonia, unspecified".into(),
            fraud_risk_base: dec!(0.1),
            standard_treatment_days: Some(7),
        }
    }

    /// Back pain carries a high base fraud risk
    pub fn low_back_pain() -> DiagnosisInfo {
        DiagnosisInfo {
            code: "M54.5".into(),
            name: "Low back pain".into(),
            fraud_risk_base: dec!(0.6),
            standard_treatment_days: Some(5),
        }
    }

    pub fn appendectomy() -> SurgeryInfo {
        SurgeryInfo {
            code: "S0401".into(),
            name: "Appendectomy".into(),
            tier: 3,
        }
    }

    pub fn hospitalization_terms() -> Vec<PolicyTerm> {
        vec![
            PolicyTerm {
                term_code: "ART_12".into(),
                article_number: "Article 12".into(),
                clause_number: Some("(1)".into()),
                title: "Hospitalization medical expenses".into(),
                content: "Insured hospitalization expenses are paid less the deductible.".into(),
                summary: Some("Real-loss hospitalization".into()),
                calculation_formula: Some("(expense - deductible) x payout rate".into()),
                category: TermCategory::Coverage,
                applies_to: vec!["HOSP_INS".into(), "HOSP_UNINS".into()],
            },
            PolicyTerm {
                term_code: "ART_15".into(),
                article_number: "Article 15".into(),
                clause_number: None,
                title: "Daily hospitalization benefit".into(),
                content: "A fixed amount is paid per day of hospitalization.".into(),
                summary: None,
                calculation_formula: Some("daily amount x days".into()),
                category: TermCategory::Coverage,
                applies_to: vec!["HOSP_DAILY".into()],
            },
        ]
    }

    pub fn scoring_models() -> Vec<ScoringModel> {
        vec![
            ScoringModel {
                id: None,
                model_code: "default".into(),
                model_name: "Standard rules".into(),
                deductible_variation: dec!(0),
                confidence_base: 80,
                reasoning_style: ReasoningStyle::Narrative,
                is_default: true,
            },
            ScoringModel {
                id: None,
                model_code: "conservative".into(),
                model_name: "Conservative rules".into(),
                deductible_variation: dec!(0.05),
                confidence_base: 75,
                reasoning_style: ReasoningStyle::Checklist,
                is_default: false,
            },
        ]
    }
}

/// Approvers and approval line templates
pub struct ApprovalFixtures;

impl ApprovalFixtures {
    pub fn approver(name: &str, role_code: &str) -> Approver {
        Approver {
            id: UserId::new(),
            name: name.into(),
            department: Some("Claims".into()),
            role_code: role_code.into(),
            is_active: true,
        }
    }

    /// Active approver with a generated name
    pub fn random_approver(role_code: &str) -> Approver {
        let name: String = Name().fake();
        Self::approver(&name, role_code)
    }

    pub fn step(step: u32, role_code: &str, step_name: &str) -> ApprovalStep {
        ApprovalStep {
            step,
            role_code: role_code.into(),
            step_name: step_name.into(),
        }
    }

    pub fn template(code: &str, priority: i32, steps: Vec<ApprovalStep>) -> ApprovalTemplate {
        ApprovalTemplate {
            id: TemplateId::new(),
            template_code: code.into(),
            template_name: code.into(),
            description: None,
            claim_type: None,
            min_amount: None,
            max_amount: None,
            fraud_score_threshold: None,
            steps,
            priority,
            is_active: true,
        }
    }

    /// Team lead then department head
    pub fn standard_template() -> ApprovalTemplate {
        Self::template(
            "STANDARD",
            100,
            vec![
                Self::step(1, "TEAM_LEAD", "Team lead review"),
                Self::step(2, "DEPT_HEAD", "Department head approval"),
            ],
        )
    }

    /// Small outpatient claims, no human step
    pub fn auto_approve_template() -> ApprovalTemplate {
        let mut template = Self::template(AUTO_APPROVE_TEMPLATE, 10, Vec::new());
        template.claim_type = Some(ClaimType::Outpatient);
        template.max_amount = Some(Won::from_i64(100_000));
        template
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_package_codes() {
        let lines = CoverageFixtures::standard_package(PolicyId::new());
        let codes: Vec<_> = lines.iter().map(|c| c.coverage_code.as_str()).collect();
        assert!(codes.contains(&"DIS_HOSP_INS"));
        assert!(codes.contains(&"DIS_SURG_3"));
        assert!(lines.iter().all(|c| c.is_active));
    }

    #[test]
    fn test_exemption_policy_covers_treatment() {
        let treatment = date(2024, 6, 11);
        let policy = PolicyFixtures::policy_in_exemption(CustomerId::new(), treatment);
        assert!(policy.covers(treatment));
        assert!(policy.in_exemption_period(treatment));
    }

    #[test]
    fn test_auto_template_matches_small_outpatient() {
        let template = ApprovalFixtures::auto_approve_template();
        assert!(template.is_auto_approve());
        assert!(template.matches(ClaimType::Outpatient, Won::from_i64(80_000), 0));
        assert!(!template.matches(ClaimType::Hospitalization, Won::from_i64(80_000), 0));
    }
}
