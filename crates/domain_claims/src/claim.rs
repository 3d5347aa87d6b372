//! Claim aggregate

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{code_enum, BusinessCalendar, ClaimId, CustomerId, PolicyId, UserId, Won};
use crate::error::ClaimError;

code_enum! {
    /// Kind of medical event claimed
    pub enum ClaimType {
        Hospitalization => "HOSPITALIZATION",
        Outpatient => "OUTPATIENT",
        Surgery => "SURGERY",
        Diagnosis => "DIAGNOSIS",
    }
}

code_enum! {
    /// Claim status
    pub enum ClaimStatus {
        /// Submitted, not yet decided
        Received => "RECEIVED",
        /// Waiting on a human decision
        PendingReview => "PENDING_REVIEW",
        Approved => "APPROVED",
        Rejected => "REJECTED",
        /// Sent back to the claimant for rework
        Returned => "RETURNED",
        /// Handed to the special investigation unit
        SiuReferred => "SIU_REFERRED",
    }
}

code_enum! {
    /// Progress of the approval workflow as mirrored on the claim
    pub enum ClaimApprovalStatus {
        InProgress => "IN_PROGRESS",
        Approved => "APPROVED",
        Rejected => "REJECTED",
        Returned => "RETURNED",
        Cancelled => "CANCELLED",
    }
}

code_enum! {
    /// Side flag set by an approver's HOLD action
    pub enum HoldStatus {
        NotHeld => "NONE",
        OnHold => "ON_HOLD",
    }
}

impl ClaimStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClaimStatus::Approved | ClaimStatus::Rejected | ClaimStatus::Returned
        )
    }
}

impl Default for HoldStatus {
    fn default() -> Self {
        HoldStatus::NotHeld
    }
}

/// Claim as submitted by the claimant or intake operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimSubmission {
    pub policy_number: String,
    pub customer_name: String,
    pub claim_type: ClaimType,
    /// Defaults to today's business date
    pub claim_date: Option<NaiveDate>,
    pub treatment_start_date: NaiveDate,
    pub treatment_end_date: NaiveDate,
    pub hospital_name: String,
    pub diagnosis_code: String,
    pub diagnosis_name: Option<String>,
    pub surgery_code: Option<String>,
    pub surgery_name: Option<String>,
    #[serde(default)]
    pub hospitalization_days: u32,
    pub total_medical_expense: Won,
    pub insured_expense: Won,
    pub uninsured_expense: Won,
}

impl ClaimSubmission {
    /// Checks required fields and amount consistency
    pub fn validate(&self) -> Result<(), ClaimError> {
        require("policy_number", &self.policy_number)?;
        require("customer_name", &self.customer_name)?;
        require("diagnosis_code", &self.diagnosis_code)?;

        BusinessCalendar::check_period(self.treatment_start_date, self.treatment_end_date)
            .map_err(|e| ClaimError::invalid("treatment_end_date", e.to_string()))?;

        for (field, amount) in [
            ("total_medical_expense", self.total_medical_expense),
            ("insured_expense", self.insured_expense),
            ("uninsured_expense", self.uninsured_expense),
        ] {
            if amount.is_negative() {
                return Err(ClaimError::invalid(field, "must not be negative"));
            }
        }

        if self.insured_expense + self.uninsured_expense > self.total_medical_expense {
            return Err(ClaimError::invalid(
                "total_medical_expense",
                "insured and uninsured portions exceed the total",
            ));
        }
        Ok(())
    }

    pub fn claim_date_or(&self, today: NaiveDate) -> NaiveDate {
        self.claim_date.unwrap_or(today)
    }
}

fn require(field: &str, value: &str) -> Result<(), ClaimError> {
    if value.trim().is_empty() {
        return Err(ClaimError::invalid(field, "is required"));
    }
    Ok(())
}

/// A stored claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub claim_number: String,
    pub policy_id: PolicyId,
    pub customer_id: CustomerId,
    pub claim_type: ClaimType,
    pub claim_date: NaiveDate,
    pub treatment_start_date: NaiveDate,
    pub treatment_end_date: NaiveDate,
    pub hospital_name: String,
    pub diagnosis_code: String,
    pub diagnosis_name: Option<String>,
    pub surgery_code: Option<String>,
    pub surgery_name: Option<String>,
    pub hospitalization_days: u32,
    pub total_medical_expense: Won,
    pub insured_expense: Won,
    pub uninsured_expense: Won,
    pub total_claimed_amount: Won,
    pub total_approved_amount: Won,
    pub total_rejected_amount: Won,
    pub status: ClaimStatus,
    pub fraud_score: u8,
    pub fraud_flags: Vec<String>,
    pub fraud_check_passed: Option<bool>,
    pub ai_recommendation: Option<String>,
    pub confidence_score: u8,
    pub auto_processable: bool,
    pub decision: Option<String>,
    /// Snapshot of the adjudication run for audit and replay
    pub analysis: serde_json::Value,
    pub approval_status: Option<ClaimApprovalStatus>,
    pub current_approver_id: Option<UserId>,
    pub decision_reason: Option<String>,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub hold_status: HoldStatus,
    pub hold_reason: Option<String>,
    pub siu_referral_reason: Option<String>,
    pub siu_referred_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Claim {
    /// A freshly received claim carrying the submission's facts
    pub fn from_submission(
        claim_number: String,
        submission: &ClaimSubmission,
        policy_id: PolicyId,
        customer_id: CustomerId,
        claim_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ClaimId::new_v7(),
            claim_number,
            policy_id,
            customer_id,
            claim_type: submission.claim_type,
            claim_date,
            treatment_start_date: submission.treatment_start_date,
            treatment_end_date: submission.treatment_end_date,
            hospital_name: submission.hospital_name.clone(),
            diagnosis_code: submission.diagnosis_code.clone(),
            diagnosis_name: submission.diagnosis_name.clone(),
            surgery_code: submission.surgery_code.clone(),
            surgery_name: submission.surgery_name.clone(),
            hospitalization_days: submission.hospitalization_days,
            total_medical_expense: submission.total_medical_expense,
            insured_expense: submission.insured_expense,
            uninsured_expense: submission.uninsured_expense,
            total_claimed_amount: submission.total_medical_expense,
            total_approved_amount: Won::ZERO,
            total_rejected_amount: Won::ZERO,
            status: ClaimStatus::Received,
            fraud_score: 0,
            fraud_flags: Vec::new(),
            fraud_check_passed: None,
            ai_recommendation: None,
            confidence_score: 0,
            auto_processable: false,
            decision: None,
            analysis: serde_json::Value::Null,
            approval_status: None,
            current_approver_id: None,
            decision_reason: None,
            approved_by: None,
            approved_at: None,
            hold_status: HoldStatus::NotHeld,
            hold_reason: None,
            siu_referral_reason: None,
            siu_referred_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks if a status transition is allowed
    pub fn can_transition_to(&self, target: ClaimStatus) -> bool {
        use ClaimStatus::*;
        matches!(
            (self.status, target),
            (Received, PendingReview)
                | (Received, Approved)
                | (Received, Rejected)
                | (PendingReview, Approved)
                | (PendingReview, Rejected)
                | (PendingReview, Returned)
                | (Received, SiuReferred)
                | (PendingReview, SiuReferred)
        )
    }

    pub fn ensure_transition(&self, target: ClaimStatus) -> Result<(), ClaimError> {
        if !self.can_transition_to(target) {
            return Err(ClaimError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }
        Ok(())
    }
}

/// Formats a claim number, e.g. `CLM-2024-00042`
pub fn format_claim_number(year: i32, sequence: u64) -> String {
    format!("CLM-{}-{:05}", year, sequence % 100_000)
}
