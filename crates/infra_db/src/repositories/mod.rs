//! Repositories
//!
//! Each repository owns the SQL for one area of the schema and maps rows
//! (`sqlx::FromRow`) into domain types. Statuses and kinds are stored as
//! their text codes; money as `NUMERIC`.

pub mod policy;
pub mod reference;
pub mod claims;
pub mod approval;
pub mod audit;

pub use policy::PolicyRepository;
pub use reference::ReferenceRepository;
pub use claims::ClaimRepository;
pub use approval::ApprovalRepository;
pub use audit::AuditRepository;

use rust_decimal::Decimal;
use std::str::FromStr;

use core_kernel::{Percent, Won};

use crate::error::DatabaseError;

/// Parses a text code column
pub(crate) fn code<T>(column: &str, value: &str) -> Result<T, DatabaseError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| DatabaseError::corrupt(column, e))
}

pub(crate) fn opt_code<T>(column: &str, value: Option<&str>) -> Result<Option<T>, DatabaseError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.map(|v| code(column, v)).transpose()
}

pub(crate) fn percent(column: &str, value: Decimal) -> Result<Percent, DatabaseError> {
    Percent::new(value).map_err(|e| DatabaseError::corrupt(column, e))
}

pub(crate) fn won(value: Decimal) -> Won {
    Won::new(value)
}

pub(crate) fn opt_won(value: Option<Decimal>) -> Option<Won> {
    value.map(Won::new)
}

/// Narrows an integer column into the domain's unsigned width
pub(crate) fn unsigned<T, U>(column: &str, value: T) -> Result<U, DatabaseError>
where
    U: TryFrom<T>,
    T: Copy + std::fmt::Display,
{
    U::try_from(value).map_err(|_| DatabaseError::corrupt(column, format!("{value} out of range")))
}

pub(crate) fn json<T: serde::de::DeserializeOwned>(
    column: &str,
    value: serde_json::Value,
) -> Result<T, DatabaseError> {
    serde_json::from_value(value).map_err(|e| DatabaseError::corrupt(column, e))
}

pub(crate) fn to_json<T: serde::Serialize>(column: &str, value: &T) -> Result<serde_json::Value, DatabaseError> {
    serde_json::to_value(value).map_err(|e| DatabaseError::corrupt(column, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_unknown_code_is_corrupt() {
        let result: Result<domain_policy::PolicyStatus, _> = code("status", "ACTIVE?");
        assert!(matches!(result, Err(DatabaseError::CorruptRow(_))));
        let ok: domain_policy::PolicyStatus = code("status", "ACTIVE").unwrap();
        assert_eq!(ok, domain_policy::PolicyStatus::Active);
    }

    #[test]
    fn test_unsigned_narrowing() {
        let ok: u8 = unsigned("risk_score", 42i16).unwrap();
        assert_eq!(ok, 42);
        let err: Result<u8, _> = unsigned("risk_score", -1i16);
        assert!(matches!(err, Err(DatabaseError::CorruptRow(_))));
    }

    #[test]
    fn test_percent_range() {
        assert!(percent("payout_rate", dec!(80)).is_ok());
        assert!(percent("payout_rate", dec!(120)).is_err());
    }
}
