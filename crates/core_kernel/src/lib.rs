//! Core Kernel - Foundational types shared by the claims platform
//!
//! This crate provides the building blocks used across all domain modules:
//! - Won amounts and percentage rates with exact decimal arithmetic
//! - The business calendar (Asia/Seoul) used for treatment and claim dates
//! - Strongly-typed identifiers and code-valued enums
//! - Port abstractions for the hexagonal architecture, including the audit sink

#[macro_use]
pub mod codes;
pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod ports;
pub mod audit;
pub mod error;

pub use money::{Won, Percent, MoneyError};
pub use temporal::{BusinessCalendar, Timezone, TemporalError};
pub use identifiers::{
    ClaimId, PolicyId, CustomerId, CoverageId, ApprovalId, InboxEntryId,
    TemplateId, UserId, HistoryId, ScoringModelId, AuditEventId,
};
pub use ports::{PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth};
pub use codes::UnknownCode;
pub use audit::{AuditEvent, AuditSink};
pub use error::{CoreError, ErrorKind};
