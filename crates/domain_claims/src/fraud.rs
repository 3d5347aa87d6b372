//! Fraud Scorer
//!
//! Rules are pure functions over a `FraudContext`; each one either stays
//! silent or contributes a `FraudPattern` with a score. Scores add up and
//! the total is clamped to 0..=100.
//!
//! Two rule batteries exist and are kept apart on purpose of their callers:
//! the submission-time pre-screen (`FraudProfile::Intake`) and the post-hoc
//! audit of a stored claim (`FraudProfile::FullAudit`). They use different
//! rules, weights and risk thresholds, so their scores are not comparable.
//!
//! `FraudScorer` is the only part that performs I/O: it gathers history
//! counts through the `ClaimHistoryPort` before the rules run.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::{code_enum, BusinessCalendar, ClaimId, CustomerId, Won};
use domain_policy::{DiagnosisInfo, RiskGrade};

use crate::error::ClaimError;
use crate::ports::{ClaimHistoryPort, DuplicateKey, HistoryQuery};

/// Diagnoses with elevated repeat-claim risk (lumbar and cervical disorders)
pub const HIGH_RISK_DIAGNOSES: [&str; 4] = ["M54.5", "M51.1", "M51.2", "S13.4"];

/// Diagnosis watched by the intake pre-screen (low back pain)
pub const INTAKE_WATCHED_DIAGNOSIS: &str = "M54.5";

code_enum! {
    /// Named rule battery
    pub enum FraudProfile {
        Intake => "INTAKE",
        FullAudit => "FULL_AUDIT",
    }
}

code_enum! {
    pub enum RiskLevel {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
        Critical => "CRITICAL",
    }
}

code_enum! {
    /// Action recommended for a risk level
    pub enum FraudAction {
        Approve => "APPROVE",
        Review => "REVIEW",
        Investigate => "INVESTIGATE",
        Reject => "REJECT",
    }
}

impl FraudProfile {
    /// Lower bounds of (critical, high, medium)
    fn thresholds(&self) -> (u8, u8, u8) {
        match self {
            FraudProfile::Intake => (60, 40, 20),
            FraudProfile::FullAudit => (70, 50, 30),
        }
    }

    pub fn risk_level(&self, score: u8) -> RiskLevel {
        let (critical, high, medium) = self.thresholds();
        match score {
            s if s >= critical => RiskLevel::Critical,
            s if s >= high => RiskLevel::High,
            s if s >= medium => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }

    /// Label the profile's callers use for an action
    pub fn label(&self, action: FraudAction) -> &'static str {
        match (self, action) {
            (FraudProfile::Intake, FraudAction::Approve) => "AUTO_APPROVE",
            (FraudProfile::Intake, FraudAction::Review) => "MANUAL_REVIEW",
            (_, action) => action.as_str(),
        }
    }
}

impl RiskLevel {
    pub fn action(&self) -> FraudAction {
        match self {
            RiskLevel::Critical => FraudAction::Reject,
            RiskLevel::High => FraudAction::Investigate,
            RiskLevel::Medium => FraudAction::Review,
            RiskLevel::Low => FraudAction::Approve,
        }
    }
}

/// A detected rule hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FraudPattern {
    pub code: String,
    pub name: String,
    pub score: u8,
    pub details: String,
}

impl FraudPattern {
    fn new(code: &str, name: &str, score: u8, details: String) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            score,
            details,
        }
    }
}

/// Aggregated result of one profile run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FraudAnalysis {
    pub profile: FraudProfile,
    pub score: u8,
    pub risk_level: RiskLevel,
    pub recommendation: FraudAction,
    pub recommendation_label: String,
    pub patterns: Vec<FraudPattern>,
}

impl FraudAnalysis {
    pub fn from_patterns(profile: FraudProfile, patterns: Vec<FraudPattern>) -> Self {
        let total: u32 = patterns.iter().map(|p| u32::from(p.score)).sum();
        let score = total.min(100) as u8;
        let risk_level = profile.risk_level(score);
        let recommendation = risk_level.action();
        Self {
            profile,
            score,
            risk_level,
            recommendation,
            recommendation_label: profile.label(recommendation).to_string(),
            patterns,
        }
    }

    pub fn pattern_codes(&self) -> Vec<String> {
        self.patterns.iter().map(|p| p.code.clone()).collect()
    }

    /// Whether the claim clears the fraud check
    pub fn passed(&self) -> bool {
        matches!(self.risk_level, RiskLevel::Low | RiskLevel::Medium)
    }
}

/// History counts gathered before the rules run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryCounts {
    /// Other claims by the customer in the trailing 30 days
    pub recent_claims: u32,
    /// Other claims with the same diagnosis in the trailing 12 months
    pub same_diagnosis: u32,
    /// Earlier Friday-to-Monday admissions by the customer
    pub prior_weekend_admissions: u32,
    /// Other claims at the same hospital in the trailing 12 months
    pub same_hospital: u32,
    /// Claim number of an existing claim for the same treatment
    pub duplicate_of: Option<String>,
}

/// Facts the rules read
#[derive(Debug, Clone)]
pub struct FraudContext {
    pub claim_date: NaiveDate,
    pub treatment_start_date: NaiveDate,
    pub treatment_end_date: NaiveDate,
    pub diagnosis: DiagnosisInfo,
    pub hospital_name: String,
    pub claimed_amount: Won,
    pub hospitalization_days: u32,
    pub coverage_start_date: NaiveDate,
    pub risk_grade: RiskGrade,
    pub risk_score: u8,
    pub history: HistoryCounts,
}

impl FraudContext {
    fn weekend_admission(&self) -> bool {
        BusinessCalendar::is_weekend_admission(self.treatment_start_date, self.treatment_end_date)
    }
}

type Rule = fn(&FraudContext) -> Option<FraudPattern>;

const INTAKE_RULES: [Rule; 6] = [
    intake_diagnosis_risk,
    intake_high_amount,
    intake_frequency,
    intake_back_pain_repeat,
    intake_weekend_admission,
    intake_duplicate,
];

const FULL_AUDIT_RULES: [Rule; 9] = [
    frequency,
    diagnosis_repeat,
    weekend_admission_repeat,
    high_amount,
    early_claim,
    hospital_concentration,
    diagnosis_risk,
    customer_risk_tier,
    hospitalization_outlier,
];

/// Runs a profile's rule battery
pub fn evaluate(profile: FraudProfile, ctx: &FraudContext) -> FraudAnalysis {
    let rules: &[Rule] = match profile {
        FraudProfile::Intake => &INTAKE_RULES,
        FraudProfile::FullAudit => &FULL_AUDIT_RULES,
    };
    let patterns: Vec<FraudPattern> = rules.iter().filter_map(|rule| rule(ctx)).collect();
    let analysis = FraudAnalysis::from_patterns(profile, patterns);
    debug!(
        profile = %profile,
        score = analysis.score,
        risk_level = %analysis.risk_level,
        patterns = ?analysis.pattern_codes(),
        "fraud rules evaluated"
    );
    analysis
}

fn scaled_risk(base: Decimal, weight: u32) -> u8 {
    (base * Decimal::from(weight))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u8()
        .unwrap_or(u8::MAX)
}

// ---------------------------------------------------------------------------
// Intake pre-screen
// ---------------------------------------------------------------------------

fn intake_diagnosis_risk(ctx: &FraudContext) -> Option<FraudPattern> {
    let base = ctx.diagnosis.fraud_risk_base;
    (base > Decimal::new(3, 1)).then(|| {
        FraudPattern::new(
            "DIAG_RISK",
            "High-risk diagnosis",
            scaled_risk(base, 20),
            format!("{} ({}) risk weight {}", ctx.diagnosis.name, ctx.diagnosis.code, base),
        )
    })
}

fn intake_high_amount(ctx: &FraudContext) -> Option<FraudPattern> {
    (ctx.claimed_amount > Won::from_i64(5_000_000)).then(|| {
        FraudPattern::new(
            "FRD004",
            "High claim amount",
            15,
            format!("claimed {} won", ctx.claimed_amount),
        )
    })
}

fn intake_frequency(ctx: &FraudContext) -> Option<FraudPattern> {
    (ctx.history.recent_claims >= 2).then(|| {
        FraudPattern::new(
            "FRD001",
            "Frequent claims",
            25,
            format!("{} claims in the last 30 days", ctx.history.recent_claims),
        )
    })
}

fn intake_back_pain_repeat(ctx: &FraudContext) -> Option<FraudPattern> {
    (ctx.diagnosis.code == INTAKE_WATCHED_DIAGNOSIS && ctx.history.same_diagnosis >= 3).then(|| {
        FraudPattern::new(
            "FRD002",
            "Repeated low back pain claims",
            35,
            format!("{} {} claims in 12 months", ctx.history.same_diagnosis, ctx.diagnosis.code),
        )
    })
}

fn intake_weekend_admission(ctx: &FraudContext) -> Option<FraudPattern> {
    ctx.weekend_admission().then(|| {
        FraudPattern::new(
            "FRD003",
            "Weekend admission",
            20,
            "admitted Friday, discharged Monday".to_string(),
        )
    })
}

fn intake_duplicate(ctx: &FraudContext) -> Option<FraudPattern> {
    ctx.history.duplicate_of.as_ref().map(|existing| {
        FraudPattern::new(
            "FRD008",
            "Duplicate claim",
            50,
            format!("same treatment already claimed as {existing}"),
        )
    })
}

// ---------------------------------------------------------------------------
// Full audit
// ---------------------------------------------------------------------------

fn frequency(ctx: &FraudContext) -> Option<FraudPattern> {
    (ctx.history.recent_claims >= 3).then(|| {
        FraudPattern::new(
            "FRD001",
            "Frequent claims",
            30,
            format!("{} other claims in the last 30 days", ctx.history.recent_claims),
        )
    })
}

fn diagnosis_repeat(ctx: &FraudContext) -> Option<FraudPattern> {
    let high_risk = HIGH_RISK_DIAGNOSES.contains(&ctx.diagnosis.code.as_str());
    let (threshold, score) = if high_risk { (3, 40) } else { (5, 25) };
    (ctx.history.same_diagnosis >= threshold).then(|| {
        FraudPattern::new(
            "FRD002",
            "Repeated diagnosis",
            score,
            format!(
                "{} other {} claims in 12 months{}",
                ctx.history.same_diagnosis,
                ctx.diagnosis.code,
                if high_risk { " (high-risk code)" } else { "" }
            ),
        )
    })
}

fn weekend_admission_repeat(ctx: &FraudContext) -> Option<FraudPattern> {
    (ctx.weekend_admission() && ctx.history.prior_weekend_admissions >= 1).then(|| {
        FraudPattern::new(
            "FRD003",
            "Repeated weekend admission",
            25,
            format!(
                "Friday admission with Monday discharge, {} earlier occurrence(s)",
                ctx.history.prior_weekend_admissions
            ),
        )
    })
}

fn high_amount(ctx: &FraudContext) -> Option<FraudPattern> {
    let score = if ctx.claimed_amount >= Won::from_i64(10_000_000) {
        25
    } else if ctx.claimed_amount >= Won::from_i64(5_000_000) {
        15
    } else {
        return None;
    };
    Some(FraudPattern::new(
        "FRD004",
        "High claim amount",
        score,
        format!("claimed {} won", ctx.claimed_amount),
    ))
}

fn early_claim(ctx: &FraudContext) -> Option<FraudPattern> {
    let months = BusinessCalendar::elapsed_months(ctx.coverage_start_date, ctx.claim_date);
    let score = match months {
        m if m <= 3 => 30,
        m if m <= 6 => 20,
        _ => return None,
    };
    Some(FraudPattern::new(
        "FRD005",
        "Early claim after enrolment",
        score,
        format!("claim filed {months} month(s) after coverage start"),
    ))
}

fn hospital_concentration(ctx: &FraudContext) -> Option<FraudPattern> {
    let score = match ctx.history.same_hospital {
        n if n >= 10 => 30,
        n if n >= 5 => 15,
        _ => return None,
    };
    Some(FraudPattern::new(
        "FRD006",
        "Hospital concentration",
        score,
        format!(
            "{} other claims at {} in 12 months",
            ctx.history.same_hospital, ctx.hospital_name
        ),
    ))
}

fn diagnosis_risk(ctx: &FraudContext) -> Option<FraudPattern> {
    let base = ctx.diagnosis.fraud_risk_base;
    (base >= Decimal::new(3, 1)).then(|| {
        FraudPattern::new(
            "FRD_DIAG",
            "High-risk diagnosis",
            scaled_risk(base, 30),
            format!("{} ({}) risk weight {}", ctx.diagnosis.name, ctx.diagnosis.code, base),
        )
    })
}

fn customer_risk_tier(ctx: &FraudContext) -> Option<FraudPattern> {
    let score = if ctx.risk_grade == RiskGrade::HighRisk || ctx.risk_score >= 70 {
        25
    } else if ctx.risk_grade == RiskGrade::Watch || ctx.risk_score >= 40 {
        15
    } else {
        return None;
    };
    Some(FraudPattern::new(
        "FRD_CUST",
        "Customer on watch list",
        score,
        format!("grade {}, risk score {}", ctx.risk_grade, ctx.risk_score),
    ))
}

fn hospitalization_outlier(ctx: &FraudContext) -> Option<FraudPattern> {
    let standard = ctx.diagnosis.standard_treatment_days.filter(|d| *d > 0)?;
    (ctx.hospitalization_days >= standard * 2).then(|| {
        FraudPattern::new(
            "FRD_DAYS",
            "Hospitalization longer than usual",
            20,
            format!(
                "{} days against a standard of {}",
                ctx.hospitalization_days, standard
            ),
        )
    })
}

// ---------------------------------------------------------------------------
// Context gathering
// ---------------------------------------------------------------------------

/// Claim facts the scorer needs to query history
#[derive(Debug, Clone)]
pub struct FraudSubject {
    /// Set when the claim is already stored and must not count itself
    pub claim_id: Option<ClaimId>,
    pub customer_id: CustomerId,
    pub claim_date: NaiveDate,
    pub treatment_start_date: NaiveDate,
    pub diagnosis_code: String,
    pub hospital_name: String,
}

/// Gathers history through the port and runs a profile
pub struct FraudScorer<'a> {
    history: &'a dyn ClaimHistoryPort,
}

impl<'a> FraudScorer<'a> {
    pub fn new(history: &'a dyn ClaimHistoryPort) -> Self {
        Self { history }
    }

    pub async fn gather(
        &self,
        profile: FraudProfile,
        subject: &FraudSubject,
    ) -> Result<HistoryCounts, ClaimError> {
        let month_ago = BusinessCalendar::days_before(subject.claim_date, 30);
        let year_ago = BusinessCalendar::months_before(subject.claim_date, 12);
        let base = HistoryQuery::for_customer(subject.customer_id).excluding(subject.claim_id);

        let recent_claims = self
            .history
            .count_claims(&base.clone().since(month_ago))
            .await?;
        let same_diagnosis = self
            .history
            .count_claims(&base.clone().since(year_ago).diagnosis(&subject.diagnosis_code))
            .await?;

        let mut counts = HistoryCounts {
            recent_claims,
            same_diagnosis,
            ..HistoryCounts::default()
        };

        match profile {
            FraudProfile::Intake => {
                let key = DuplicateKey {
                    customer_id: subject.customer_id,
                    diagnosis_code: subject.diagnosis_code.clone(),
                    hospital_name: subject.hospital_name.clone(),
                    treatment_start_date: subject.treatment_start_date,
                    exclude: subject.claim_id,
                };
                counts.duplicate_of = self.history.find_duplicate(&key).await?;
            }
            FraudProfile::FullAudit => {
                counts.prior_weekend_admissions = self
                    .history
                    .count_claims(&base.clone().weekend_admissions())
                    .await?;
                counts.same_hospital = self
                    .history
                    .count_claims(&base.since(year_ago).hospital(&subject.hospital_name))
                    .await?;
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn context() -> FraudContext {
        FraudContext {
            claim_date: date(2024, 6, 20),
            treatment_start_date: date(2024, 6, 11),
            treatment_end_date: date(2024, 6, 14),
            diagnosis: DiagnosisInfo {
                code: "K35.8".into(),
                name: "Acute appendicitis".into(),
                fraud_risk_base: dec!(0.1),
                standard_treatment_days: Some(5),
            },
            hospital_name: "Seoul General".into(),
            claimed_amount: Won::from_i64(2_000_000),
            hospitalization_days: 3,
            coverage_start_date: date(2020, 1, 1),
            risk_grade: RiskGrade::Normal,
            risk_score: 0,
            history: HistoryCounts::default(),
        }
    }

    fn codes(analysis: &FraudAnalysis) -> Vec<String> {
        analysis.pattern_codes()
    }

    #[test]
    fn test_clean_claim_scores_zero_in_both_profiles() {
        for profile in FraudProfile::ALL {
            let analysis = evaluate(*profile, &context());
            assert_eq!(analysis.score, 0);
            assert_eq!(analysis.risk_level, RiskLevel::Low);
            assert!(analysis.passed());
        }
    }

    #[test]
    fn test_intake_labels() {
        let analysis = evaluate(FraudProfile::Intake, &context());
        assert_eq!(analysis.recommendation_label, "AUTO_APPROVE");
        let audit = evaluate(FraudProfile::FullAudit, &context());
        assert_eq!(audit.recommendation_label, "APPROVE");
    }

    #[test]
    fn test_full_audit_frequency_adds_thirty() {
        let mut ctx = context();
        ctx.history.recent_claims = 3;
        let analysis = evaluate(FraudProfile::FullAudit, &ctx);
        assert_eq!(codes(&analysis), vec!["FRD001"]);
        assert_eq!(analysis.score, 30);
        assert_eq!(analysis.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_intake_frequency_threshold_is_two() {
        let mut ctx = context();
        ctx.history.recent_claims = 2;
        assert_eq!(evaluate(FraudProfile::Intake, &ctx).score, 25);
        assert_eq!(evaluate(FraudProfile::FullAudit, &ctx).score, 0);
    }

    #[test]
    fn test_high_risk_diagnosis_repeat_uses_lower_threshold() {
        let mut ctx = context();
        ctx.diagnosis.code = "M51.1".into();
        ctx.history.same_diagnosis = 3;
        let analysis = evaluate(FraudProfile::FullAudit, &ctx);
        assert_eq!(analysis.patterns[0].score, 40);

        ctx.diagnosis.code = "J20.9".into();
        assert!(evaluate(FraudProfile::FullAudit, &ctx).patterns.is_empty());
        ctx.history.same_diagnosis = 5;
        assert_eq!(evaluate(FraudProfile::FullAudit, &ctx).score, 25);
    }

    #[test]
    fn test_weekend_admission_differs_by_profile() {
        let mut ctx = context();
        ctx.treatment_start_date = date(2024, 6, 14);
        ctx.treatment_end_date = date(2024, 6, 17);
        assert_eq!(evaluate(FraudProfile::Intake, &ctx).score, 20);
        assert_eq!(evaluate(FraudProfile::FullAudit, &ctx).score, 0);
        ctx.history.prior_weekend_admissions = 1;
        assert_eq!(evaluate(FraudProfile::FullAudit, &ctx).score, 25);
    }

    #[test]
    fn test_amount_bands() {
        let mut ctx = context();
        ctx.claimed_amount = Won::from_i64(5_000_000);
        assert_eq!(evaluate(FraudProfile::FullAudit, &ctx).score, 15);
        assert_eq!(evaluate(FraudProfile::Intake, &ctx).score, 0);
        ctx.claimed_amount = Won::from_i64(10_000_000);
        assert_eq!(evaluate(FraudProfile::FullAudit, &ctx).score, 25);
        assert_eq!(evaluate(FraudProfile::Intake, &ctx).score, 15);
    }

    #[test]
    fn test_early_claim_bands() {
        let mut ctx = context();
        ctx.coverage_start_date = date(2024, 4, 1);
        assert_eq!(evaluate(FraudProfile::FullAudit, &ctx).score, 30);
        ctx.coverage_start_date = date(2024, 1, 1);
        assert_eq!(evaluate(FraudProfile::FullAudit, &ctx).score, 20);
    }

    #[test]
    fn test_diagnosis_base_risk_weights() {
        let mut ctx = context();
        ctx.diagnosis.fraud_risk_base = dec!(0.45);
        // 0.45 × 30 = 13.5 rounds to 14; 0.45 × 20 = 9
        assert_eq!(evaluate(FraudProfile::FullAudit, &ctx).score, 14);
        assert_eq!(evaluate(FraudProfile::Intake, &ctx).score, 9);
        ctx.diagnosis.fraud_risk_base = dec!(0.3);
        assert_eq!(evaluate(FraudProfile::FullAudit, &ctx).score, 9);
        assert_eq!(evaluate(FraudProfile::Intake, &ctx).score, 0);
    }

    #[test]
    fn test_customer_tiers() {
        let mut ctx = context();
        ctx.risk_score = 40;
        assert_eq!(evaluate(FraudProfile::FullAudit, &ctx).score, 15);
        ctx.risk_grade = RiskGrade::HighRisk;
        assert_eq!(evaluate(FraudProfile::FullAudit, &ctx).score, 25);
    }

    #[test]
    fn test_hospitalization_outlier_needs_standard_days() {
        let mut ctx = context();
        ctx.hospitalization_days = 10;
        assert_eq!(codes(&evaluate(FraudProfile::FullAudit, &ctx)), vec!["FRD_DAYS"]);
        ctx.diagnosis.standard_treatment_days = None;
        assert!(evaluate(FraudProfile::FullAudit, &ctx).patterns.is_empty());
    }

    #[test]
    fn test_duplicate_dominates_intake() {
        let mut ctx = context();
        ctx.history.duplicate_of = Some("CLM-2024-00001".into());
        let analysis = evaluate(FraudProfile::Intake, &ctx);
        assert_eq!(analysis.score, 50);
        assert_eq!(analysis.risk_level, RiskLevel::High);
        assert_eq!(analysis.recommendation_label, "INVESTIGATE");
    }

    #[test]
    fn test_score_is_clamped() {
        let mut ctx = context();
        ctx.history = HistoryCounts {
            recent_claims: 10,
            same_diagnosis: 10,
            prior_weekend_admissions: 3,
            same_hospital: 12,
            duplicate_of: None,
        };
        ctx.treatment_start_date = date(2024, 6, 14);
        ctx.treatment_end_date = date(2024, 6, 17);
        ctx.claimed_amount = Won::from_i64(20_000_000);
        ctx.risk_grade = RiskGrade::HighRisk;
        let analysis = evaluate(FraudProfile::FullAudit, &ctx);
        assert_eq!(analysis.score, 100);
        assert_eq!(analysis.recommendation, FraudAction::Reject);
        assert!(!analysis.passed());
    }

    #[test]
    fn test_thresholds_per_profile() {
        assert_eq!(FraudProfile::Intake.risk_level(60), RiskLevel::Critical);
        assert_eq!(FraudProfile::FullAudit.risk_level(60), RiskLevel::High);
        assert_eq!(FraudProfile::Intake.risk_level(19), RiskLevel::Low);
        assert_eq!(FraudProfile::FullAudit.risk_level(29), RiskLevel::Low);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn pattern(score: u8) -> FraudPattern {
        FraudPattern::new("X", "x", score, String::new())
    }

    proptest! {
        #[test]
        fn test_score_monotone_and_bounded(
            scores in proptest::collection::vec(0u8..=50, 0..12),
            extra in 0u8..=50,
        ) {
            for profile in FraudProfile::ALL {
                let base: Vec<FraudPattern> = scores.iter().copied().map(pattern).collect();
                let before = FraudAnalysis::from_patterns(*profile, base.clone());
                let mut more = base;
                more.push(pattern(extra));
                let after = FraudAnalysis::from_patterns(*profile, more);
                prop_assert!(after.score >= before.score);
                prop_assert!(after.score <= 100);
            }
        }
    }
}
