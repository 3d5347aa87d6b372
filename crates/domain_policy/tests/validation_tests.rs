//! Tests for treatment-date policy validation

use chrono::NaiveDate;
use core_kernel::{CustomerId, Percent, PolicyId};
use domain_policy::{
    validate_for_treatment, Policy, PolicyStatus, PolicyValidation, PremiumStatus,
    ValidationIssue,
};
use rust_decimal_macros::dec;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn policy() -> Policy {
    Policy {
        id: PolicyId::new(),
        policy_number: "POL-2023-000123".into(),
        customer_id: CustomerId::new(),
        product_code: "PREMIUM_HEALTH".into(),
        product_name: "Premium Health".into(),
        coverage_start_date: date(2023, 1, 1),
        coverage_end_date: date(2043, 12, 31),
        exemption_end_date: Some(date(2023, 3, 31)),
        reduction_end_date: Some(date(2023, 12, 31)),
        reduction_rate: None,
        premium_status: PremiumStatus::Paid,
        status: PolicyStatus::Active,
    }
}

mod in_force {
    use super::*;

    #[test]
    fn test_clean_policy_is_valid() {
        let result = validate_for_treatment(&policy(), date(2024, 6, 1));
        assert!(result.is_valid);
        assert!(result.issues.is_empty());
        assert!(!result.reduction_applies);
        assert_eq!(result.reduction_rate, Percent::ZERO);
    }

    #[test]
    fn test_lapsed_policy_is_invalid() {
        let mut p = policy();
        p.status = PolicyStatus::Lapsed;
        let result = validate_for_treatment(&p, date(2024, 6, 1));
        assert!(!result.is_valid);
        assert_eq!(
            result.issues,
            vec![ValidationIssue::PolicyNotActive { status: PolicyStatus::Lapsed }]
        );
    }

    #[test]
    fn test_overdue_premium_is_invalid() {
        let mut p = policy();
        p.premium_status = PremiumStatus::Overdue;
        assert!(!validate_for_treatment(&p, date(2024, 6, 1)).is_valid);
    }

    #[test]
    fn test_treatment_outside_window() {
        let early = validate_for_treatment(&policy(), date(2022, 12, 31));
        assert!(early
            .issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::BeforeCoverageStart { .. })));

        let late = validate_for_treatment(&policy(), date(2044, 1, 1));
        assert!(matches!(late.issues[0], ValidationIssue::AfterCoverageEnd { .. }));
        assert!(!late.is_valid);
    }
}

mod waiting_periods {
    use super::*;

    #[test]
    fn test_exemption_is_blocking_and_suppresses_reduction() {
        let result = validate_for_treatment(&policy(), date(2023, 3, 31));
        assert!(!result.is_valid);
        assert!(result.exemption_applies);
        assert!(!result.reduction_applies);
        assert!(result.rejection_summary().contains("exemption period"));
    }

    #[test]
    fn test_reduction_is_reported_but_not_blocking() {
        let result = validate_for_treatment(&policy(), date(2023, 4, 1));
        assert!(result.is_valid);
        assert!(result.reduction_applies);
        assert_eq!(result.reduction_rate, Percent::whole(50));
        assert_eq!(result.rejection_summary(), "");
    }

    #[test]
    fn test_explicit_reduction_rate_is_used() {
        let mut p = policy();
        p.reduction_rate = Some(Percent::new(dec!(30)).unwrap());
        let result = validate_for_treatment(&p, date(2023, 10, 1));
        assert_eq!(result.reduction_rate.value(), dec!(30));
    }
}

#[test]
fn test_policy_not_found_outcome() {
    let result = PolicyValidation::policy_not_found();
    assert!(!result.is_valid);
    assert_eq!(result.rejection_summary(), "policy not found");
}

#[test]
fn test_issue_serializes_with_code_tag() {
    let json = serde_json::to_value(ValidationIssue::PremiumOverdue).unwrap();
    assert_eq!(json["code"], "PREMIUM_OVERDUE");
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_exemption_and_reduction_never_both_apply(offset in 0i64..3000) {
            let treatment = date(2022, 6, 1) + chrono::Duration::days(offset);
            let result = validate_for_treatment(&policy(), treatment);
            prop_assert!(!(result.exemption_applies && result.reduction_applies));
            prop_assert_eq!(result.reduction_applies, !result.reduction_rate.is_zero());
        }

        #[test]
        fn test_dates_outside_coverage_are_never_valid(days_before in 1i64..2000) {
            let treatment = date(2023, 1, 1) - chrono::Duration::days(days_before);
            prop_assert!(!validate_for_treatment(&policy(), treatment).is_valid);
        }
    }
}
