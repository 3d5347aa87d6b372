//! Won amounts and percentage rates
//!
//! Benefit arithmetic is done in whole Korean won on top of rust_decimal so
//! that deductible, payout-rate and reduction steps never accumulate
//! floating-point error. Every intermediate result is rounded to the won
//! with half-away-from-zero, matching how benefit statements are printed.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use thiserror::Error;

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Negative amount not allowed: {0}")]
    Negative(String),

    #[error("Rate out of range 0..=100: {0}")]
    RateOutOfRange(String),

    #[error("Overflow during calculation")]
    Overflow,
}

/// An amount in Korean won
///
/// Always held at zero decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Won(Decimal);

impl Won {
    pub const ZERO: Won = Won(Decimal::ZERO);

    /// Creates an amount, rounding to the nearest won
    pub fn new(amount: Decimal) -> Self {
        Self(round_won(amount))
    }

    /// Creates an amount from an integer number of won
    pub fn from_i64(amount: i64) -> Self {
        Self(Decimal::from(amount))
    }

    /// Creates an amount, rejecting negative input
    pub fn non_negative(amount: Decimal, field: &str) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative(field.to_string()));
        }
        Ok(Self::new(amount))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Subtraction floored at zero
    pub fn saturating_sub(self, other: Won) -> Won {
        if other.0 >= self.0 {
            Won::ZERO
        } else {
            Won(self.0 - other.0)
        }
    }

    /// Multiplies by an integer count (days, occurrences)
    pub fn times(self, count: u32) -> Won {
        Won(self.0 * Decimal::from(count))
    }

    /// Applies a percentage, rounding the product to the won
    pub fn percent_of(self, rate: Percent) -> Won {
        Won::new(self.0 * rate.value() / dec!(100))
    }

    /// Applies a percentage given as a raw decimal (used for scaled rates)
    pub fn scaled_percent_of(self, rate: Decimal) -> Won {
        Won::new(self.0 * rate / dec!(100))
    }

    /// Formats with thousands separators, e.g. `1,200,000`
    pub fn grouped(&self) -> String {
        group_digits(self.0)
    }
}

impl fmt::Display for Won {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.grouped())
    }
}

impl From<Won> for Decimal {
    fn from(w: Won) -> Decimal {
        w.0
    }
}

impl Add for Won {
    type Output = Won;

    fn add(self, other: Won) -> Won {
        Won(self.0 + other.0)
    }
}

impl AddAssign for Won {
    fn add_assign(&mut self, other: Won) {
        self.0 += other.0;
    }
}

impl Sub for Won {
    type Output = Won;

    fn sub(self, other: Won) -> Won {
        Won(self.0 - other.0)
    }
}

impl Sum for Won {
    fn sum<I: Iterator<Item = Won>>(iter: I) -> Won {
        iter.fold(Won::ZERO, |acc, w| acc + w)
    }
}

/// A percentage in the range 0..=100 (e.g. 50 for a 50% reduction)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percent(Decimal);

impl Percent {
    pub const ZERO: Percent = Percent(Decimal::ZERO);
    pub const FULL: Percent = Percent(Decimal::ONE_HUNDRED);

    /// Creates a percentage, validating the 0..=100 range
    pub fn new(value: Decimal) -> Result<Self, MoneyError> {
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
            return Err(MoneyError::RateOutOfRange(value.to_string()));
        }
        Ok(Self(value))
    }

    /// Creates a percentage from a trusted whole-number constant
    pub fn whole(value: u8) -> Self {
        Self(Decimal::from(value.min(100)))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// The complement, `100 - self`
    pub fn complement(&self) -> Percent {
        Percent(Decimal::ONE_HUNDRED - self.0)
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

/// Rounds to whole won, half away from zero
pub fn round_won(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

fn group_digits(amount: Decimal) -> String {
    let rounded = round_won(amount);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let digits = rounded.abs().trunc().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if negative {
        format!("-{out}")
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounds_half_away_from_zero() {
        assert_eq!(Won::new(dec!(10.5)).amount(), dec!(11));
        assert_eq!(Won::new(dec!(10.49)).amount(), dec!(10));
        assert_eq!(Won::new(dec!(-10.5)).amount(), dec!(-11));
    }

    #[test]
    fn test_grouping() {
        assert_eq!(Won::from_i64(1_200_000).to_string(), "1,200,000");
        assert_eq!(Won::from_i64(999).to_string(), "999");
        assert_eq!(Won::from_i64(1000).to_string(), "1,000");
        assert_eq!(Won::ZERO.to_string(), "0");
    }

    #[test]
    fn test_percent_bounds() {
        assert!(Percent::new(dec!(-1)).is_err());
        assert!(Percent::new(dec!(100.1)).is_err());
        assert_eq!(Percent::new(dec!(50)).unwrap().complement(), Percent::whole(50));
    }

    #[test]
    fn test_percent_of_rounds() {
        let amount = Won::from_i64(1_100_001);
        assert_eq!(amount.percent_of(Percent::whole(50)).amount(), dec!(550001));
    }

    #[test]
    fn test_saturating_sub_floors_at_zero() {
        assert_eq!(Won::from_i64(10).saturating_sub(Won::from_i64(20)), Won::ZERO);
    }

    #[test]
    fn test_non_negative_rejects_negative() {
        assert!(Won::non_negative(dec!(-1), "claimed").is_err());
        assert!(Won::non_negative(dec!(0), "claimed").is_ok());
    }
}
