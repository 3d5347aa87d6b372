//! Approval Domain
//!
//! Multi-step sign-off of claims that the adjudication pipeline left for a
//! human.
//!
//! # Approval Lifecycle
//!
//! ```text
//! PENDING -> IN_PROGRESS -> APPROVED
//!                        -> REJECTED
//!                        -> RETURNED
//!                        -> CANCELLED
//! ```
//!
//! A claim has at most one PENDING or IN_PROGRESS approval at a time. HOLD
//! does not change the approval; it flags the claim.

pub mod template;
pub mod workflow;
pub mod ports;
pub mod engine;
pub mod error;

pub use template::{select_template, ApprovalStep, ApprovalTemplate, AUTO_APPROVE_TEMPLATE};
pub use workflow::{
    ApprovalAction, ApprovalHistoryRecord, ApprovalInstance, ApprovalStatus, ApprovalStatusView,
    Approver, ClaimSummary, InboxEntry, InboxFilter, InboxItem, InboxPage, InboxStatus, Urgency,
};
pub use ports::{
    ActionEffect, ActionPlan, ApprovalStore, ApproverDirectory, CancelPlan, FinalOutcome,
    StartPlan, TemplatePort,
};
pub use engine::{ActionRequest, ApprovalEngine, StartOutcome, StartRequest, CANCEL_OVERRIDE_LEVEL};
pub use error::ApprovalError;
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::MockApprovalBackend;
