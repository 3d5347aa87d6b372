//! Test Data Builders
//!
//! Builders for submissions and stored claims. Tests set only the fields
//! they care about; everything else falls back to the fixtures.

use chrono::NaiveDate;

use core_kernel::{CustomerId, PolicyId, Won};
use domain_claims::{Claim, ClaimStatus, ClaimSubmission, ClaimType};

use crate::fixtures::{date, PolicyFixtures, ReferenceFixtures};

/// Builder for claim submissions
///
/// Defaults to a four-day hospitalization for pneumonia at 1,000,000 won of
/// insured expense, which the standard package pays without any flags.
#[derive(Debug, Clone)]
pub struct SubmissionBuilder {
    submission: ClaimSubmission,
}

impl Default for SubmissionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionBuilder {
    pub fn new() -> Self {
        let diagnosis = ReferenceFixtures::pneumonia();
        Self {
            submission: ClaimSubmission {
                policy_number: PolicyFixtures::POLICY_NUMBER.into(),
                customer_name: "Kim Minji".into(),
                claim_type: ClaimType::Hospitalization,
                claim_date: Some(date(2024, 6, 20)),
                treatment_start_date: date(2024, 6, 11),
                treatment_end_date: date(2024, 6, 14),
                hospital_name: "Seoul General Hospital".into(),
                diagnosis_code: diagnosis.code,
                diagnosis_name: Some(diagnosis.name),
                surgery_code: None,
                surgery_name: None,
                hospitalization_days: 4,
                total_medical_expense: Won::from_i64(1_000_000),
                insured_expense: Won::from_i64(1_000_000),
                uninsured_expense: Won::ZERO,
            },
        }
    }

    pub fn with_policy_number(mut self, number: impl Into<String>) -> Self {
        self.submission.policy_number = number.into();
        self
    }

    pub fn with_claim_type(mut self, claim_type: ClaimType) -> Self {
        self.submission.claim_type = claim_type;
        self
    }

    pub fn with_claim_date(mut self, claim_date: NaiveDate) -> Self {
        self.submission.claim_date = Some(claim_date);
        self
    }

    /// Sets the treatment period and derives inclusive hospitalization days
    pub fn with_treatment(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.submission.treatment_start_date = start;
        self.submission.treatment_end_date = end;
        self.submission.hospitalization_days = ((end - start).num_days() + 1).max(0) as u32;
        self
    }

    pub fn with_hospitalization_days(mut self, days: u32) -> Self {
        self.submission.hospitalization_days = days;
        self
    }

    pub fn with_hospital(mut self, name: impl Into<String>) -> Self {
        self.submission.hospital_name = name.into();
        self
    }

    pub fn with_diagnosis(mut self, code: impl Into<String>, name: Option<&str>) -> Self {
        self.submission.diagnosis_code = code.into();
        self.submission.diagnosis_name = name.map(str::to_string);
        self
    }

    pub fn with_surgery(mut self, code: impl Into<String>, name: impl Into<String>) -> Self {
        self.submission.surgery_code = Some(code.into());
        self.submission.surgery_name = Some(name.into());
        self
    }

    /// Sets both expense portions; the total is their sum
    pub fn with_expenses(mut self, insured: i64, uninsured: i64) -> Self {
        self.submission.insured_expense = Won::from_i64(insured);
        self.submission.uninsured_expense = Won::from_i64(uninsured);
        self.submission.total_medical_expense = Won::from_i64(insured + uninsured);
        self
    }

    pub fn build(self) -> ClaimSubmission {
        self.submission
    }
}

/// Builder for stored claims, used to seed approval tests
#[derive(Debug, Clone)]
pub struct ClaimBuilder {
    claim: Claim,
}

impl ClaimBuilder {
    /// A claim for the given policy, already adjudicated and awaiting review
    pub fn new(policy_id: PolicyId, customer_id: CustomerId) -> Self {
        let submission = SubmissionBuilder::new().build();
        let claim_date = submission.claim_date_or(date(2024, 6, 20));
        let mut claim = Claim::from_submission(
            "CLM-2024-00001".into(),
            &submission,
            policy_id,
            customer_id,
            claim_date,
        );
        claim.status = ClaimStatus::PendingReview;
        Self { claim }
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.claim.claim_number = number.into();
        self
    }

    pub fn with_claim_type(mut self, claim_type: ClaimType) -> Self {
        self.claim.claim_type = claim_type;
        self
    }

    pub fn with_status(mut self, status: ClaimStatus) -> Self {
        self.claim.status = status;
        self
    }

    /// Sets claimed and approved totals
    pub fn with_amounts(mut self, claimed: i64, approved: i64) -> Self {
        self.claim.total_medical_expense = Won::from_i64(claimed);
        self.claim.insured_expense = Won::from_i64(claimed);
        self.claim.total_claimed_amount = Won::from_i64(claimed);
        self.claim.total_approved_amount = Won::from_i64(approved);
        self
    }

    pub fn with_fraud_score(mut self, score: u8) -> Self {
        self.claim.fraud_score = score;
        self
    }

    pub fn build(self) -> Claim {
        self.claim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_defaults_validate() {
        let submission = SubmissionBuilder::new().build();
        assert!(submission.validate().is_ok());
        assert_eq!(submission.hospitalization_days, 4);
    }

    #[test]
    fn test_treatment_derives_days() {
        let submission = SubmissionBuilder::new()
            .with_treatment(date(2024, 3, 1), date(2024, 3, 10))
            .build();
        assert_eq!(submission.hospitalization_days, 10);
    }

    #[test]
    fn test_expenses_sum_to_total() {
        let submission = SubmissionBuilder::new().with_expenses(800_000, 200_000).build();
        assert_eq!(submission.total_medical_expense, Won::from_i64(1_000_000));
        assert!(submission.validate().is_ok());
    }

    #[test]
    fn test_claim_builder_amounts() {
        let claim = ClaimBuilder::new(PolicyId::new(), CustomerId::new())
            .with_amounts(5_000_000, 4_500_000)
            .with_fraud_score(55)
            .build();
        assert_eq!(claim.status, ClaimStatus::PendingReview);
        assert_eq!(claim.total_claimed_amount, Won::from_i64(5_000_000));
        assert_eq!(claim.fraud_score, 55);
    }
}
