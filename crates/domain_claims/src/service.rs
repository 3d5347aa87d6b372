//! Claim services outside the adjudication run

use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use core_kernel::{audit::record_quietly, AuditEvent, AuditSink, ClaimId, PortError, UserId};
use domain_policy::DiagnosisInfo;

use crate::claim::{Claim, ClaimStatus};
use crate::error::ClaimError;
use crate::fraud::{self, FraudAnalysis, FraudContext, FraudProfile, FraudScorer, FraudSubject};
use crate::ports::{ClaimHistoryPort, ClaimStore, PolicyPort, ReferencePort};

pub struct ClaimService {
    policies: Arc<dyn PolicyPort>,
    reference: Arc<dyn ReferencePort>,
    history: Arc<dyn ClaimHistoryPort>,
    store: Arc<dyn ClaimStore>,
    audit: Arc<dyn AuditSink>,
}

fn not_found(id: ClaimId) -> impl FnOnce(PortError) -> ClaimError {
    move |e| {
        if e.is_not_found() {
            ClaimError::ClaimNotFound(id.to_string())
        } else {
            ClaimError::Port(e)
        }
    }
}

impl ClaimService {
    pub fn new(
        policies: Arc<dyn PolicyPort>,
        reference: Arc<dyn ReferencePort>,
        history: Arc<dyn ClaimHistoryPort>,
        store: Arc<dyn ClaimStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            policies,
            reference,
            history,
            store,
            audit,
        }
    }

    pub async fn get_claim(&self, id: ClaimId) -> Result<Claim, ClaimError> {
        self.store.get_claim(id).await.map_err(not_found(id))
    }

    /// Runs the full-audit fraud profile against a stored claim and records
    /// the result
    #[instrument(skip(self))]
    pub async fn run_fraud_audit(
        &self,
        claim_id: ClaimId,
        actor: UserId,
    ) -> Result<FraudAnalysis, ClaimError> {
        let claim = self.get_claim(claim_id).await?;
        let policy = self.policies.get_policy(claim.policy_id).await?;
        let customer = self.policies.get_customer(claim.customer_id).await?;
        let diagnosis = self
            .reference
            .get_diagnosis(&claim.diagnosis_code)
            .await?
            .unwrap_or_else(|| DiagnosisInfo::unknown(&claim.diagnosis_code));

        let subject = FraudSubject {
            claim_id: Some(claim.id),
            customer_id: claim.customer_id,
            claim_date: claim.claim_date,
            treatment_start_date: claim.treatment_start_date,
            diagnosis_code: claim.diagnosis_code.clone(),
            hospital_name: claim.hospital_name.clone(),
        };
        let history = FraudScorer::new(self.history.as_ref())
            .gather(FraudProfile::FullAudit, &subject)
            .await?;
        let context = FraudContext {
            claim_date: claim.claim_date,
            treatment_start_date: claim.treatment_start_date,
            treatment_end_date: claim.treatment_end_date,
            diagnosis,
            hospital_name: claim.hospital_name.clone(),
            claimed_amount: claim.total_claimed_amount,
            hospitalization_days: claim.hospitalization_days,
            coverage_start_date: policy.coverage_start_date,
            risk_grade: customer.risk_grade,
            risk_score: customer.risk_score,
            history,
        };
        let analysis = fraud::evaluate(FraudProfile::FullAudit, &context);

        self.store
            .record_fraud_audit(claim.id, &analysis)
            .await
            .map_err(not_found(claim.id))?;

        if analysis.passed() {
            info!(claim_number = %claim.claim_number, score = analysis.score, "fraud audit passed");
        } else {
            warn!(
                claim_number = %claim.claim_number,
                score = analysis.score,
                risk_level = %analysis.risk_level,
                patterns = ?analysis.pattern_codes(),
                "fraud audit flagged claim"
            );
        }

        let event = AuditEvent::new(actor, "FRAUD_AUDIT", "claim", claim.id)
            .with_before(json!({ "fraud_score": claim.fraud_score }))
            .with_after(json!({
                "fraud_score": analysis.score,
                "risk_level": analysis.risk_level.as_str(),
                "recommendation": analysis.recommendation.as_str(),
            }));
        record_quietly(self.audit.as_ref(), event).await;

        Ok(analysis)
    }

    /// Hands a claim to the special investigation unit
    #[instrument(skip(self, reason))]
    pub async fn refer_to_siu(
        &self,
        claim_id: ClaimId,
        reason: &str,
        actor: UserId,
    ) -> Result<Claim, ClaimError> {
        if reason.trim().is_empty() {
            return Err(ClaimError::invalid("reason", "is required"));
        }
        let claim = self.get_claim(claim_id).await?;
        claim.ensure_transition(ClaimStatus::SiuReferred)?;

        let referred = self
            .store
            .refer_to_siu(claim_id, reason)
            .await
            .map_err(not_found(claim_id))?;

        info!(claim_number = %referred.claim_number, "claim referred to SIU");
        let event = AuditEvent::new(actor, "SIU_REFERRAL", "claim", claim_id)
            .with_before(json!({ "status": claim.status.as_str() }))
            .with_after(json!({ "status": referred.status.as_str(), "reason": reason }));
        record_quietly(self.audit.as_ref(), event).await;

        Ok(referred)
    }
}
