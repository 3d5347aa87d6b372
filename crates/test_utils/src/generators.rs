//! Property-Based Test Generators
//!
//! Proptest strategies producing values that respect domain invariants:
//! non-negative amounts, percentages within 0..=100 and submissions whose
//! expense portions never exceed the total.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::{Percent, Won};
use domain_approval::ApprovalAction;
use domain_claims::{ClaimSubmission, ClaimType};

use crate::builders::SubmissionBuilder;

/// Whole-won amounts up to 100,000,000
pub fn won_strategy() -> impl Strategy<Value = Won> {
    (0i64..=100_000_000i64).prop_map(Won::from_i64)
}

/// Amounts above zero
pub fn positive_won_strategy() -> impl Strategy<Value = Won> {
    (1i64..=100_000_000i64).prop_map(Won::from_i64)
}

/// Percentages with two decimal places
pub fn percent_strategy() -> impl Strategy<Value = Percent> {
    (0i64..=10_000i64).prop_filter_map("percent out of range", |n| {
        Percent::new(Decimal::new(n, 2)).ok()
    })
}

pub fn fraud_score_strategy() -> impl Strategy<Value = u8> {
    0u8..=100u8
}

pub fn claim_type_strategy() -> impl Strategy<Value = ClaimType> {
    proptest::sample::select(ClaimType::ALL.to_vec())
}

pub fn approval_action_strategy() -> impl Strategy<Value = ApprovalAction> {
    proptest::sample::select(ApprovalAction::ALL.to_vec())
}

/// Treatment start within 2024 and a stay of up to 60 days
pub fn treatment_period_strategy() -> impl Strategy<Value = (NaiveDate, NaiveDate)> {
    (0i64..365, 0i64..60).prop_map(|(offset, length)| {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
        let start = base + Duration::days(offset);
        (start, start + Duration::days(length))
    })
}

/// Valid hospitalization submissions against the fixture policy
pub fn submission_strategy() -> impl Strategy<Value = ClaimSubmission> {
    (
        treatment_period_strategy(),
        0i64..=20_000_000i64,
        0i64..=5_000_000i64,
    )
        .prop_map(|((start, end), insured, uninsured)| {
            SubmissionBuilder::new()
                .with_treatment(start, end)
                .with_claim_date(end + Duration::days(3))
                .with_expenses(insured, uninsured)
                .build()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_generated_submissions_validate(submission in submission_strategy()) {
            prop_assert!(submission.validate().is_ok());
            prop_assert!(submission.hospitalization_days >= 1);
        }

        #[test]
        fn test_generated_percents_in_range(p in percent_strategy()) {
            prop_assert!(p.value() >= Decimal::ZERO);
            prop_assert!(p.value() <= Decimal::ONE_HUNDRED);
        }
    }
}
