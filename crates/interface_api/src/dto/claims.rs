//! Claims DTOs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::Won;
use domain_claims::{ClaimSubmission, ClaimType};

use crate::error::ApiError;

/// Body of `POST /claims`
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct SubmitClaimRequest {
    #[validate(length(min = 1, max = 50))]
    pub policy_number: String,
    #[validate(length(min = 1, max = 100))]
    pub customer_name: String,
    pub claim_type: ClaimType,
    pub claim_date: Option<NaiveDate>,
    pub treatment_start_date: NaiveDate,
    pub treatment_end_date: NaiveDate,
    #[validate(length(min = 1, max = 200))]
    pub hospital_name: String,
    #[validate(length(min = 1, max = 20))]
    pub diagnosis_code: String,
    pub diagnosis_name: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub surgery_code: Option<String>,
    pub surgery_name: Option<String>,
    #[serde(default)]
    #[validate(range(max = 365))]
    pub hospitalization_days: u32,
    pub total_medical_expense: Decimal,
    #[serde(default)]
    pub insured_expense: Decimal,
    #[serde(default)]
    pub uninsured_expense: Decimal,
}

impl SubmitClaimRequest {
    pub fn into_submission(self) -> Result<ClaimSubmission, ApiError> {
        let amount = |value: Decimal, field: &str| {
            Won::non_negative(value, field)
                .map_err(|e| ApiError::Validation(e.to_string(), vec![field.to_string()]))
        };

        Ok(ClaimSubmission {
            total_medical_expense: amount(self.total_medical_expense, "total_medical_expense")?,
            insured_expense: amount(self.insured_expense, "insured_expense")?,
            uninsured_expense: amount(self.uninsured_expense, "uninsured_expense")?,
            policy_number: self.policy_number,
            customer_name: self.customer_name,
            claim_type: self.claim_type,
            claim_date: self.claim_date,
            treatment_start_date: self.treatment_start_date,
            treatment_end_date: self.treatment_end_date,
            hospital_name: self.hospital_name,
            diagnosis_code: self.diagnosis_code,
            diagnosis_name: self.diagnosis_name,
            surgery_code: self.surgery_code,
            surgery_name: self.surgery_name,
            hospitalization_days: self.hospitalization_days,
        })
    }
}

/// Body of `POST /claims/:id/siu-referral`
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct SiuReferralRequest {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> SubmitClaimRequest {
        SubmitClaimRequest {
            policy_number: "POL-2020-0001".into(),
            customer_name: "Kim Minji".into(),
            claim_type: ClaimType::Hospitalization,
            claim_date: None,
            treatment_start_date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            treatment_end_date: NaiveDate::from_ymd_opt(2024, 6, 13).unwrap(),
            hospital_name: "Seoul General".into(),
            diagnosis_code: "J18.9".into(),
            diagnosis_name: None,
            surgery_code: None,
            surgery_name: None,
            hospitalization_days: 4,
            total_medical_expense: dec!(1000000),
            insured_expense: dec!(800000),
            uninsured_expense: dec!(200000),
        }
    }

    #[test]
    fn test_valid_request_converts() {
        let request = request();
        assert!(request.validate().is_ok());
        let submission = request.into_submission().unwrap();
        assert_eq!(submission.total_medical_expense, Won::from_i64(1_000_000));
        assert_eq!(submission.hospitalization_days, 4);
    }

    #[test]
    fn test_blank_policy_number_fails_validation() {
        let mut request = request();
        request.policy_number.clear();
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("policy_number"));
    }

    #[test]
    fn test_negative_amount_is_rejected() {
        let mut request = request();
        request.uninsured_expense = dec!(-1);
        assert!(matches!(
            request.into_submission(),
            Err(ApiError::Validation(..))
        ));
    }

    #[test]
    fn test_blank_referral_reason_fails_validation() {
        let request = SiuReferralRequest { reason: String::new() };
        assert!(request.validate().is_err());
    }
}
