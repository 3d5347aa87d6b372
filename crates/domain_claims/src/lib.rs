//! Claims Domain
//!
//! Adjudication of health insurance claims, from submission to the initial
//! decision.
//!
//! # Claim Lifecycle
//!
//! ```text
//! RECEIVED -> APPROVED                        (automatic)
//!          -> REJECTED                        (policy does not pay)
//!          -> PENDING_REVIEW -> APPROVED | REJECTED | RETURNED   (approval workflow)
//!          -> SIU_REFERRED
//! ```
//!
//! The pipeline prices the claim with the coverage calculator, screens it
//! with the intake fraud profile and decides. Claims that need a human go
//! through the approval workflow in `domain_approval`.

pub mod claim;
pub mod calculator;
pub mod analysis;
pub mod fraud;
pub mod models;
pub mod ports;
pub mod adjudication;
pub mod service;
pub mod error;

pub use claim::{
    format_claim_number, Claim, ClaimApprovalStatus, ClaimStatus, ClaimSubmission, ClaimType,
    HoldStatus,
};
pub use calculator::{PayoutLineItem, CalculationError};
pub use analysis::{scale_usage, CoverageAnalysis};
pub use fraud::{FraudAction, FraudAnalysis, FraudPattern, FraudProfile, RiskLevel};
pub use models::{ModelRecommendation, ModelResult, ReasoningStyle, ScoringModel};
pub use ports::{
    AdjudicationRecord, ClaimHistoryPort, ClaimStore, CoverageUsage, DuplicateKey, HistoryQuery,
    PolicyPort, ReferencePort,
};
pub use adjudication::{
    AdjudicationConfig, AdjudicationOutcome, AdjudicationPipeline, Decision, PayoutSummary,
};
pub use service::ClaimService;
pub use error::ClaimError;
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::MockClaimsBackend;
