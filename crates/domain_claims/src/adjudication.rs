//! Claim Adjudication Pipeline
//!
//! Turns a `ClaimSubmission` into a decided, persisted claim:
//!
//! ```text
//! validate input -> load policy -> validate policy
//!     -> price coverage (once per scoring model) -> intake fraud screen
//!     -> decide -> persist (single transaction) -> audit
//! ```
//!
//! A missing policy or a policy that does not pay for the treatment date is
//! an outcome, not an error: the result is REJECTED. Rejections against an
//! existing policy are persisted so they can be reviewed later.

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

use core_kernel::{
    audit::record_quietly, AuditEvent, AuditSink, BusinessCalendar, ClaimId, Timezone, UserId, Won,
};
use domain_policy::{
    validate_for_treatment, Customer, CoverageSet, DiagnosisInfo, Policy, PolicyValidation,
    TermBook,
};

use crate::analysis::{analyze_coverage, CoverageAnalysis, CoverageRequest};
use crate::claim::{Claim, ClaimStatus, ClaimSubmission, ClaimType};
use crate::error::ClaimError;
use crate::fraud::{self, FraudAction, FraudAnalysis, FraudContext, FraudProfile, FraudScorer, FraudSubject};
use crate::models::{ModelResult, ScoringModel};
use crate::ports::{AdjudicationRecord, ClaimHistoryPort, ClaimStore, PolicyPort, ReferencePort};

/// Tunables of the automatic decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjudicationConfig {
    /// Largest approved total that may be approved without review
    pub auto_approve_ceiling: Won,
    /// Intake fraud scores below this may be approved without review
    pub auto_approve_max_fraud_score: u8,
    /// Product whose terms are cited when the policy's product has none
    pub terms_product_code: String,
    pub timezone: Timezone,
}

impl Default for AdjudicationConfig {
    fn default() -> Self {
        Self {
            auto_approve_ceiling: Won::from_i64(3_000_000),
            auto_approve_max_fraud_score: 20,
            terms_product_code: "PREMIUM_HEALTH".to_string(),
            timezone: Timezone::default(),
        }
    }
}

/// Automatic decision for a validated claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub status: ClaimStatus,
    pub text: String,
    pub confidence: u8,
    pub auto_approved: bool,
}

/// Decides the claim's initial status from the three analyses
pub fn decide(
    validation: &PolicyValidation,
    coverage: &CoverageAnalysis,
    fraud: &FraudAnalysis,
    config: &AdjudicationConfig,
) -> Decision {
    if validation.exemption_applies {
        return Decision {
            status: ClaimStatus::Rejected,
            text: "claim falls in the exemption period".to_string(),
            confidence: 100,
            auto_approved: false,
        };
    }

    let confidence = 100u8.saturating_sub(fraud.score);
    let review = |text: String| Decision {
        status: ClaimStatus::PendingReview,
        text,
        confidence,
        auto_approved: false,
    };

    match fraud.recommendation {
        FraudAction::Reject => {
            return review("fraud suspected, referred for investigation".to_string());
        }
        FraudAction::Investigate | FraudAction::Review => {
            return review(format!(
                "fraud risk {}, manual review required",
                fraud.risk_level
            ));
        }
        FraudAction::Approve => {}
    }

    let approved = coverage.total_approved;
    if fraud.score < config.auto_approve_max_fraud_score
        && approved.is_positive()
        && approved <= config.auto_approve_ceiling
    {
        let mut text = coverage.approved_items().join(" + ");
        if validation.reduction_applies {
            text.push_str(&format!(
                " (reduction period: {} reduced)",
                validation.reduction_rate
            ));
        }
        return Decision {
            status: ClaimStatus::Approved,
            text,
            confidence,
            auto_approved: true,
        };
    }

    if approved.is_zero() {
        review("no payable amount, needs review".to_string())
    } else {
        review("high amount, needs review".to_string())
    }
}

/// Totals of an adjudication run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayoutSummary {
    pub total_claimed: Won,
    pub total_approved: Won,
    pub total_rejected: Won,
}

/// Result of `AdjudicationPipeline::adjudicate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjudicationOutcome {
    /// Unset when nothing was persisted
    pub claim_id: Option<ClaimId>,
    pub claim_number: Option<String>,
    pub status: ClaimStatus,
    pub decision: String,
    pub confidence: u8,
    pub auto_approved: bool,
    pub validation: PolicyValidation,
    pub coverage: Option<CoverageAnalysis>,
    pub fraud: Option<FraudAnalysis>,
    pub model_results: Vec<ModelResult>,
    pub summary: PayoutSummary,
    pub processing_time_ms: u64,
}

#[derive(Serialize)]
struct AnalysisSnapshot<'a> {
    validation: &'a PolicyValidation,
    coverage: Option<&'a CoverageAnalysis>,
    fraud: Option<&'a FraudAnalysis>,
    model_code: Option<&'a str>,
}

/// Orchestrates adjudication over the claims ports
pub struct AdjudicationPipeline {
    policies: Arc<dyn PolicyPort>,
    reference: Arc<dyn ReferencePort>,
    history: Arc<dyn ClaimHistoryPort>,
    store: Arc<dyn ClaimStore>,
    audit: Arc<dyn AuditSink>,
    config: AdjudicationConfig,
    calendar: BusinessCalendar,
}

impl AdjudicationPipeline {
    pub fn new(
        policies: Arc<dyn PolicyPort>,
        reference: Arc<dyn ReferencePort>,
        history: Arc<dyn ClaimHistoryPort>,
        store: Arc<dyn ClaimStore>,
        audit: Arc<dyn AuditSink>,
        config: AdjudicationConfig,
    ) -> Self {
        let calendar = BusinessCalendar::new(config.timezone);
        Self {
            policies,
            reference,
            history,
            store,
            audit,
            config,
            calendar,
        }
    }

    pub fn config(&self) -> &AdjudicationConfig {
        &self.config
    }

    #[instrument(
        skip(self, submission),
        fields(policy_number = %submission.policy_number, claim_type = %submission.claim_type)
    )]
    pub async fn adjudicate(
        &self,
        submission: ClaimSubmission,
        actor: UserId,
    ) -> Result<AdjudicationOutcome, ClaimError> {
        let started = Instant::now();
        submission.validate()?;

        let Some((policy, customer)) = self
            .policies
            .get_policy_by_number(&submission.policy_number)
            .await?
        else {
            info!("policy not found, claim rejected without persisting");
            return Ok(not_found_outcome(&submission, started));
        };

        let claim_date = submission.claim_date_or(self.calendar.today());
        let validation = validate_for_treatment(&policy, submission.treatment_start_date);
        if !validation.is_valid {
            return self
                .reject(submission, &policy, validation, claim_date, actor, started)
                .await;
        }

        let coverages = CoverageSet::new(self.policies.get_active_coverages(policy.id).await?);
        let surgery = match (&submission.claim_type, &submission.surgery_code) {
            (ClaimType::Surgery, Some(code)) => self.reference.get_surgery(code).await?,
            _ => None,
        };
        let terms = self.load_terms(&policy.product_code).await?;
        let models = ScoringModel::default_first(self.reference.get_scoring_models().await?);

        let request = CoverageRequest {
            submission: &submission,
            coverages: &coverages,
            surgery: surgery.as_ref(),
            reduction_rate: validation.reduction_rate,
            terms: &terms,
        };
        let mut primary: Option<CoverageAnalysis> = None;
        let mut model_results = Vec::with_capacity(models.len());
        for model in &models {
            let model_started = Instant::now();
            let analysis = analyze_coverage(&request, model.deductible_variation)?;
            let (recommendation, confidence) = model.recommend(&validation, &analysis);
            model_results.push(ModelResult {
                model_id: model.id,
                model_code: model.model_code.clone(),
                model_name: model.model_name.clone(),
                recommendation,
                confidence,
                total_approved: analysis.total_approved,
                total_rejected: analysis.total_rejected,
                breakdown: analysis.breakdown.clone(),
                reasoning: model.reasoning(&validation, &analysis, recommendation),
                response_time_ms: model_started.elapsed().as_millis() as u64,
            });
            if primary.is_none() {
                primary = Some(analysis);
            }
        }
        let coverage = primary.ok_or_else(|| ClaimError::invalid("scoring_models", "no model evaluated"))?;

        let fraud = self
            .screen(&submission, &policy, &customer, claim_date)
            .await?;
        let decision = decide(&validation, &coverage, &fraud, &self.config);

        let claim_number = self.store.next_claim_number(claim_date.year()).await?;
        let mut claim = Claim::from_submission(
            claim_number,
            &submission,
            policy.id,
            customer.id,
            claim_date,
        );
        claim.total_approved_amount = coverage.total_approved;
        claim.total_rejected_amount = claim.total_claimed_amount.saturating_sub(coverage.total_approved);
        claim.status = decision.status;
        claim.fraud_score = fraud.score;
        claim.fraud_flags = fraud.pattern_codes();
        claim.fraud_check_passed = Some(fraud.passed());
        claim.ai_recommendation = model_results
            .first()
            .map(|r| r.recommendation.as_str().to_string());
        claim.confidence_score = decision.confidence;
        claim.auto_processable = decision.auto_approved;
        claim.decision = Some(decision.text.clone());
        claim.analysis = serde_json::to_value(AnalysisSnapshot {
            validation: &validation,
            coverage: Some(&coverage),
            fraud: Some(&fraud),
            model_code: models.first().map(|m| m.model_code.as_str()),
        })?;
        if decision.auto_approved {
            claim.approved_by = Some(UserId::system());
            claim.approved_at = Some(Utc::now());
        }

        let claim_number = claim.claim_number.clone();
        let summary = PayoutSummary {
            total_claimed: claim.total_claimed_amount,
            total_approved: claim.total_approved_amount,
            total_rejected: claim.total_rejected_amount,
        };
        let claim_id = self
            .store
            .persist_adjudication(AdjudicationRecord {
                claim,
                model_results: model_results.clone(),
                usage: coverage.usage.clone(),
            })
            .await?;

        info!(
            claim_number = %claim_number,
            status = %decision.status,
            fraud_score = fraud.score,
            approved = %summary.total_approved,
            "claim adjudicated"
        );
        self.audit_submission(actor, claim_id, &claim_number, decision.status, summary.total_approved)
            .await;

        Ok(AdjudicationOutcome {
            claim_id: Some(claim_id),
            claim_number: Some(claim_number),
            status: decision.status,
            decision: decision.text,
            confidence: decision.confidence,
            auto_approved: decision.auto_approved,
            validation,
            coverage: Some(coverage),
            fraud: Some(fraud),
            model_results,
            summary,
            processing_time_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn load_terms(&self, product_code: &str) -> Result<TermBook, ClaimError> {
        let mut terms = self.reference.get_policy_terms(product_code).await?;
        if terms.is_empty() && product_code != self.config.terms_product_code {
            terms = self
                .reference
                .get_policy_terms(&self.config.terms_product_code)
                .await?;
        }
        Ok(TermBook::new(terms))
    }

    async fn screen(
        &self,
        submission: &ClaimSubmission,
        policy: &Policy,
        customer: &Customer,
        claim_date: chrono::NaiveDate,
    ) -> Result<FraudAnalysis, ClaimError> {
        let diagnosis = self
            .reference
            .get_diagnosis(&submission.diagnosis_code)
            .await?
            .unwrap_or_else(|| DiagnosisInfo::unknown(&submission.diagnosis_code));
        let subject = FraudSubject {
            claim_id: None,
            customer_id: customer.id,
            claim_date,
            treatment_start_date: submission.treatment_start_date,
            diagnosis_code: submission.diagnosis_code.clone(),
            hospital_name: submission.hospital_name.clone(),
        };
        let history = FraudScorer::new(self.history.as_ref())
            .gather(FraudProfile::Intake, &subject)
            .await?;
        let context = FraudContext {
            claim_date,
            treatment_start_date: submission.treatment_start_date,
            treatment_end_date: submission.treatment_end_date,
            diagnosis,
            hospital_name: submission.hospital_name.clone(),
            claimed_amount: submission.total_medical_expense,
            hospitalization_days: submission.hospitalization_days,
            coverage_start_date: policy.coverage_start_date,
            risk_grade: customer.risk_grade,
            risk_score: customer.risk_score,
            history,
        };
        Ok(fraud::evaluate(FraudProfile::Intake, &context))
    }

    async fn reject(
        &self,
        submission: ClaimSubmission,
        policy: &Policy,
        validation: PolicyValidation,
        claim_date: chrono::NaiveDate,
        actor: UserId,
        started: Instant,
    ) -> Result<AdjudicationOutcome, ClaimError> {
        let text = validation.rejection_summary();
        let claim_number = self.store.next_claim_number(claim_date.year()).await?;
        let mut claim = Claim::from_submission(
            claim_number,
            &submission,
            policy.id,
            policy.customer_id,
            claim_date,
        );
        claim.status = ClaimStatus::Rejected;
        claim.total_rejected_amount = claim.total_claimed_amount;
        claim.confidence_score = 100;
        claim.decision = Some(text.clone());
        claim.analysis = serde_json::to_value(AnalysisSnapshot {
            validation: &validation,
            coverage: None,
            fraud: None,
            model_code: None,
        })?;

        let claim_number = claim.claim_number.clone();
        let summary = PayoutSummary {
            total_claimed: claim.total_claimed_amount,
            total_approved: Won::ZERO,
            total_rejected: claim.total_rejected_amount,
        };
        let claim_id = self
            .store
            .persist_adjudication(AdjudicationRecord {
                claim,
                model_results: Vec::new(),
                usage: Vec::new(),
            })
            .await?;

        info!(claim_number = %claim_number, reason = %text, "claim rejected by policy validation");
        self.audit_submission(actor, claim_id, &claim_number, ClaimStatus::Rejected, Won::ZERO)
            .await;

        Ok(AdjudicationOutcome {
            claim_id: Some(claim_id),
            claim_number: Some(claim_number),
            status: ClaimStatus::Rejected,
            decision: text,
            confidence: 100,
            auto_approved: false,
            validation,
            coverage: None,
            fraud: None,
            model_results: Vec::new(),
            summary,
            processing_time_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn audit_submission(
        &self,
        actor: UserId,
        claim_id: ClaimId,
        claim_number: &str,
        status: ClaimStatus,
        approved: Won,
    ) {
        let event = AuditEvent::new(actor, "CLAIM_SUBMITTED", "claim", claim_id).with_after(json!({
            "claim_number": claim_number,
            "status": status.as_str(),
            "total_approved": approved.to_string(),
        }));
        record_quietly(self.audit.as_ref(), event).await;
    }
}

fn not_found_outcome(submission: &ClaimSubmission, started: Instant) -> AdjudicationOutcome {
    let validation = PolicyValidation::policy_not_found();
    AdjudicationOutcome {
        claim_id: None,
        claim_number: None,
        status: ClaimStatus::Rejected,
        decision: validation.rejection_summary(),
        confidence: 100,
        auto_approved: false,
        validation,
        coverage: None,
        fraud: None,
        model_results: Vec::new(),
        summary: PayoutSummary {
            total_claimed: submission.total_medical_expense,
            total_approved: Won::ZERO,
            total_rejected: submission.total_medical_expense,
        },
        processing_time_ms: started.elapsed().as_millis() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Percent;
    use crate::fraud::FraudPattern;

    fn validation() -> PolicyValidation {
        PolicyValidation {
            is_valid: true,
            issues: Vec::new(),
            exemption_applies: false,
            reduction_applies: false,
            reduction_rate: Percent::ZERO,
        }
    }

    fn coverage(approved: i64) -> CoverageAnalysis {
        CoverageAnalysis {
            breakdown: Vec::new(),
            total_claimed: Won::from_i64(approved),
            total_approved: Won::from_i64(approved),
            total_rejected: Won::ZERO,
            usage: Vec::new(),
        }
    }

    fn fraud(score: u8) -> FraudAnalysis {
        let patterns = if score == 0 {
            Vec::new()
        } else {
            vec![FraudPattern {
                code: "X".into(),
                name: "x".into(),
                score,
                details: String::new(),
            }]
        };
        FraudAnalysis::from_patterns(FraudProfile::Intake, patterns)
    }

    #[test]
    fn test_low_risk_small_claim_auto_approves() {
        let d = decide(&validation(), &coverage(2_000_000), &fraud(10), &AdjudicationConfig::default());
        assert_eq!(d.status, ClaimStatus::Approved);
        assert!(d.auto_approved);
        assert_eq!(d.confidence, 90);
    }

    #[test]
    fn test_ceiling_sends_to_review() {
        let d = decide(&validation(), &coverage(4_000_000), &fraud(10), &AdjudicationConfig::default());
        assert_eq!(d.status, ClaimStatus::PendingReview);
        assert_eq!(d.text, "high amount, needs review");
    }

    #[test]
    fn test_ceiling_is_inclusive() {
        let d = decide(&validation(), &coverage(3_000_000), &fraud(0), &AdjudicationConfig::default());
        assert_eq!(d.status, ClaimStatus::Approved);
    }

    #[test]
    fn test_medium_fraud_risk_needs_review() {
        let d = decide(&validation(), &coverage(100_000), &fraud(25), &AdjudicationConfig::default());
        assert_eq!(d.status, ClaimStatus::PendingReview);
        assert_eq!(d.text, "fraud risk MEDIUM, manual review required");
        assert_eq!(d.confidence, 75);
    }

    #[test]
    fn test_critical_fraud_is_referred() {
        let d = decide(&validation(), &coverage(100_000), &fraud(80), &AdjudicationConfig::default());
        assert_eq!(d.status, ClaimStatus::PendingReview);
        assert!(d.text.starts_with("fraud suspected"));
    }

    #[test]
    fn test_exemption_rejects_outright() {
        let mut v = validation();
        v.exemption_applies = true;
        let d = decide(&v, &coverage(100_000), &fraud(0), &AdjudicationConfig::default());
        assert_eq!(d.status, ClaimStatus::Rejected);
        assert_eq!(d.confidence, 100);
    }

    #[test]
    fn test_nothing_payable_is_reviewed() {
        let d = decide(&validation(), &coverage(0), &fraud(0), &AdjudicationConfig::default());
        assert_eq!(d.status, ClaimStatus::PendingReview);
        assert!(!d.auto_approved);
    }
}
