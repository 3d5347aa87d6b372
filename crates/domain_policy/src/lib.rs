//! Policy Domain
//!
//! The claims platform reads policies; it never issues or endorses them.
//! This crate holds the contract view needed to adjudicate a claim:
//!
//! - **Policy / Customer**: contract dates, waiting periods, premium standing
//! - **PolicyCoverage**: benefit lines with deductibles, rates, limits and usage counters
//! - **PolicyTerm**: policy wording cited on payout lines
//! - **Reference data**: diagnosis fraud weights and surgery tiers
//! - **Validation**: whether a policy pays for a given treatment date

pub mod policy;
pub mod coverage;
pub mod terms;
pub mod reference;
pub mod validation;

pub use policy::{Customer, Policy, PolicyStatus, PremiumStatus, RiskGrade};
pub use coverage::{CalculationKind, CoverageSet, PolicyCoverage, DEFAULT_MAX_DAYS};
pub use terms::{PolicyTerm, TermBook, TermCategory, TermCitation};
pub use reference::{DiagnosisInfo, SurgeryInfo};
pub use validation::{validate_for_treatment, PolicyValidation, ValidationIssue};
