//! Coverage Calculator
//!
//! Pure payout functions for the three benefit kinds. Every function
//! returns a `PayoutLineItem` whose `approved + rejected` equals `claimed`
//! exactly; amounts are rounded to the won at each step.
//!
//! ```text
//! real loss : deductible = max(flat, claimed × rate)
//!             approved   = (claimed - deductible) × payout [× (100 - reduction)] ≤ limit - used
//! daily     : approved   = daily × min(requested, max - used) [× (100 - reduction)]
//! lump sum  : approved   = insured [× (100 - reduction)]
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_kernel::{Percent, Won};
use domain_policy::{CalculationKind, TermBook, TermCitation};

use crate::error::ClaimError;

/// Caller passed inputs outside the calculator's contract
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalculationError {
    #[error("{field} must not be negative")]
    Negative { field: &'static str },

    #[error("{field} must be within 0..=100, got {value}")]
    RateOutOfRange { field: &'static str, value: Decimal },
}

impl From<CalculationError> for ClaimError {
    fn from(e: CalculationError) -> Self {
        let field = match &e {
            CalculationError::Negative { field } | CalculationError::RateOutOfRange { field, .. } => {
                *field
            }
        };
        ClaimError::invalid(field, e.to_string())
    }
}

/// One row of a payout breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutLineItem {
    pub item: String,
    pub coverage_code: String,
    pub kind: CalculationKind,
    pub claimed_amount: Won,
    pub approved_amount: Won,
    pub rejected_amount: Won,
    /// Human-readable derivation, e.g. `(1,200,000 - 100,000) × 100% = 1,100,000`
    pub calculation: String,
    pub rejection_reason: Option<String>,
    pub term_reference: Option<TermCitation>,
}

impl PayoutLineItem {
    /// Attaches the governing policy term, if the book has one
    pub fn cite(mut self, terms: &TermBook) -> Self {
        if let Some(term) = terms.find_for_coverage(&self.coverage_code) {
            self.term_reference = Some(term.cite(&self.calculation));
        }
        self
    }
}

/// Inputs for a reimbursement line
#[derive(Debug, Clone)]
pub struct RealLossInput {
    pub item: String,
    pub coverage_code: String,
    pub claimed: Won,
    pub flat_deductible: Won,
    /// Percentage of the claim withheld; may carry a model perturbation
    pub deductible_rate: Decimal,
    pub payout_rate: Percent,
    pub reduction_rate: Percent,
    pub limit: Option<Won>,
    pub used: Won,
}

/// Inputs for a daily-allowance line
#[derive(Debug, Clone)]
pub struct DailyInput {
    pub item: String,
    pub coverage_code: String,
    pub daily_amount: Won,
    pub requested_days: u32,
    pub max_days: u32,
    pub used_days: u32,
    pub reduction_rate: Percent,
}

/// Inputs for a fixed-benefit surgery line
#[derive(Debug, Clone)]
pub struct LumpSumInput {
    pub item: String,
    pub coverage_code: String,
    pub insured_amount: Won,
    pub tier: u8,
    pub reduction_rate: Percent,
}

pub fn real_loss(input: &RealLossInput) -> Result<PayoutLineItem, CalculationError> {
    non_negative("claimed", input.claimed)?;
    non_negative("flat_deductible", input.flat_deductible)?;
    non_negative("used", input.used)?;
    if let Some(limit) = input.limit {
        non_negative("limit", limit)?;
    }
    if input.deductible_rate < Decimal::ZERO || input.deductible_rate > Decimal::ONE_HUNDRED {
        return Err(CalculationError::RateOutOfRange {
            field: "deductible_rate",
            value: input.deductible_rate,
        });
    }

    let rate_deductible = input.claimed.scaled_percent_of(input.deductible_rate);
    let deductible = input.flat_deductible.max(rate_deductible);
    let payable = input.claimed.saturating_sub(deductible);

    let mut approved = payable.percent_of(input.payout_rate);
    let mut calculation = format!(
        "({} - {}) × {}",
        input.claimed, deductible, input.payout_rate
    );
    if !input.reduction_rate.is_zero() {
        approved = approved - approved.percent_of(input.reduction_rate);
        calculation.push_str(&format!(" × {}(reduced)", input.reduction_rate.complement()));
    }

    let mut limited = false;
    if let Some(limit) = input.limit {
        let remaining = limit.saturating_sub(input.used);
        if approved > remaining {
            approved = remaining;
            limited = true;
            calculation.push_str(&format!(" → limit remaining {}", remaining));
        }
    }
    let approved = approved.min(input.claimed);
    let rejected = input.claimed - approved;
    calculation.push_str(&format!(" = {}", approved));

    let rejection_reason = if limited {
        Some("annual limit reached".to_string())
    } else if rejected.is_positive() {
        Some("deductible and payout rate applied".to_string())
    } else {
        None
    };

    Ok(PayoutLineItem {
        item: input.item.clone(),
        coverage_code: input.coverage_code.clone(),
        kind: CalculationKind::RealLoss,
        claimed_amount: input.claimed,
        approved_amount: approved,
        rejected_amount: rejected,
        calculation,
        rejection_reason,
        term_reference: None,
    })
}

pub fn daily_allowance(input: &DailyInput) -> Result<PayoutLineItem, CalculationError> {
    non_negative("daily_amount", input.daily_amount)?;

    let remaining = input.max_days.saturating_sub(input.used_days);
    let payable_days = input.requested_days.min(remaining);

    let claimed = input.daily_amount.times(input.requested_days);
    let mut approved = input.daily_amount.times(payable_days);
    let mut calculation = format!("{} × {} days", input.daily_amount, payable_days);
    if !input.reduction_rate.is_zero() {
        approved = approved.percent_of(input.reduction_rate.complement());
        calculation.push_str(&format!(" × {}(reduced)", input.reduction_rate.complement()));
    }
    calculation.push_str(&format!(" = {}", approved));

    let rejection_reason = if payable_days < input.requested_days {
        Some(format!("maximum covered days exceeded ({} days)", input.max_days))
    } else if !input.reduction_rate.is_zero() {
        Some("reduction period applied".to_string())
    } else {
        None
    };

    Ok(PayoutLineItem {
        item: input.item.clone(),
        coverage_code: input.coverage_code.clone(),
        kind: CalculationKind::Daily,
        claimed_amount: claimed,
        approved_amount: approved,
        rejected_amount: claimed - approved,
        calculation,
        rejection_reason,
        term_reference: None,
    })
}

pub fn lump_sum(input: &LumpSumInput) -> Result<PayoutLineItem, CalculationError> {
    non_negative("insured_amount", input.insured_amount)?;

    let claimed = input.insured_amount;
    let mut calculation = format!("class {} surgery fixed: {}", input.tier, claimed);
    let (approved, rejection_reason) = if input.reduction_rate.is_zero() {
        (claimed, None)
    } else {
        let reduced = claimed.percent_of(input.reduction_rate.complement());
        calculation.push_str(&format!(
            " × {}(reduced) = {}",
            input.reduction_rate.complement(),
            reduced
        ));
        (reduced, Some("reduction period applied".to_string()))
    };

    Ok(PayoutLineItem {
        item: input.item.clone(),
        coverage_code: input.coverage_code.clone(),
        kind: CalculationKind::LumpSum,
        claimed_amount: claimed,
        approved_amount: approved,
        rejected_amount: claimed - approved,
        calculation,
        rejection_reason,
        term_reference: None,
    })
}

fn non_negative(field: &'static str, amount: Won) -> Result<(), CalculationError> {
    if amount.is_negative() {
        return Err(CalculationError::Negative { field });
    }
    Ok(())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn percent() -> impl Strategy<Value = Percent> {
        (0u8..=100).prop_map(Percent::whole)
    }

    proptest! {
        #[test]
        fn test_real_loss_conserves_claimed_amount(
            claimed in 0i64..100_000_000,
            flat in 0i64..1_000_000,
            rate in 0u32..=100,
            payout in percent(),
            reduction in percent(),
            limit in proptest::option::of(0i64..100_000_000),
            used in 0i64..100_000_000,
        ) {
            let line = real_loss(&RealLossInput {
                item: "x".into(),
                coverage_code: "DIS_HOSP_INS".into(),
                claimed: Won::from_i64(claimed),
                flat_deductible: Won::from_i64(flat),
                deductible_rate: Decimal::from(rate),
                payout_rate: payout,
                reduction_rate: reduction,
                limit: limit.map(Won::from_i64),
                used: Won::from_i64(used),
            }).unwrap();
            prop_assert_eq!(line.approved_amount + line.rejected_amount, line.claimed_amount);
            prop_assert!(!line.approved_amount.is_negative());
            prop_assert!(line.approved_amount <= line.claimed_amount);
        }

        #[test]
        fn test_daily_is_zero_once_days_exhausted(
            daily in 0i64..500_000,
            requested in 0u32..365,
            max_days in 0u32..365,
            extra in 0u32..100,
        ) {
            let line = daily_allowance(&DailyInput {
                item: "x".into(),
                coverage_code: "DIS_HOSP_DAILY".into(),
                daily_amount: Won::from_i64(daily),
                requested_days: requested,
                max_days,
                used_days: max_days + extra,
                reduction_rate: Percent::ZERO,
            }).unwrap();
            prop_assert_eq!(line.approved_amount, Won::ZERO);
        }

        #[test]
        fn test_daily_scales_with_payable_days(
            daily in 0i64..500_000,
            requested in 0u32..365,
            used in 0u32..365,
        ) {
            let line = daily_allowance(&DailyInput {
                item: "x".into(),
                coverage_code: "DIS_HOSP_DAILY".into(),
                daily_amount: Won::from_i64(daily),
                requested_days: requested,
                max_days: 180,
                used_days: used,
                reduction_rate: Percent::ZERO,
            }).unwrap();
            let payable = requested.min(180u32.saturating_sub(used));
            prop_assert_eq!(line.approved_amount, Won::from_i64(daily).times(payable));
            prop_assert_eq!(line.approved_amount + line.rejected_amount, line.claimed_amount);
        }

        #[test]
        fn test_calculation_is_repeatable(claimed in 0i64..10_000_000, reduction in percent()) {
            let input = RealLossInput {
                item: "x".into(),
                coverage_code: "OUT_INS".into(),
                claimed: Won::from_i64(claimed),
                flat_deductible: Won::from_i64(10_000),
                deductible_rate: Decimal::from(20),
                payout_rate: Percent::whole(90),
                reduction_rate: reduction,
                limit: Some(Won::from_i64(250_000)),
                used: Won::ZERO,
            };
            prop_assert_eq!(real_loss(&input).unwrap(), real_loss(&input).unwrap());
        }
    }
}
