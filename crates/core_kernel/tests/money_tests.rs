//! Tests for won amounts and percentage rates

use core_kernel::{MoneyError, Percent, Won};
use rust_decimal_macros::dec;

mod construction {
    use super::*;

    #[test]
    fn test_new_rounds_to_whole_won() {
        assert_eq!(Won::new(dec!(1234.5)).amount(), dec!(1235));
        assert_eq!(Won::new(dec!(1234.4999)).amount(), dec!(1234));
    }

    #[test]
    fn test_non_negative_reports_field() {
        let err = Won::non_negative(dec!(-100), "insured_expense").unwrap_err();
        assert_eq!(err, MoneyError::Negative("insured_expense".to_string()));
    }

    #[test]
    fn test_zero_checks() {
        assert!(Won::ZERO.is_zero());
        assert!(!Won::ZERO.is_positive());
        assert!(Won::from_i64(1).is_positive());
    }
}

mod arithmetic {
    use super::*;

    #[test]
    fn test_sum_of_line_items() {
        let total: Won = [100_000, 250_000, 1_000]
            .into_iter()
            .map(Won::from_i64)
            .sum();
        assert_eq!(total, Won::from_i64(351_000));
    }

    #[test]
    fn test_times_days() {
        assert_eq!(Won::from_i64(30_000).times(7), Won::from_i64(210_000));
    }

    #[test]
    fn test_reduction_half() {
        let approved = Won::from_i64(1_100_000);
        let cut = approved.percent_of(Percent::whole(50));
        assert_eq!(approved - cut, Won::from_i64(550_000));
    }

    #[test]
    fn test_scaled_rate_rounds() {
        // 10% perturbed by +2% is 10.2%
        let deductible = Won::from_i64(123_456).scaled_percent_of(dec!(10.2));
        assert_eq!(deductible, Won::from_i64(12_593));
    }
}

mod percent {
    use super::*;

    #[test]
    fn test_display_trims_trailing_zeros() {
        assert_eq!(Percent::new(dec!(50.00)).unwrap().to_string(), "50%");
        assert_eq!(Percent::new(dec!(12.5)).unwrap().to_string(), "12.5%");
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(matches!(Percent::new(dec!(101)), Err(MoneyError::RateOutOfRange(_))));
    }

    #[test]
    fn test_whole_clamps() {
        assert_eq!(Percent::whole(250), Percent::FULL);
    }
}
