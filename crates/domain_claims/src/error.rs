//! Claims domain errors

use thiserror::Error;

use core_kernel::{ErrorKind, MoneyError, PortError, UnknownCode};

/// Errors that can occur in the claims domain
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Claim not found: {0}")]
    ClaimNotFound(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error(transparent)]
    Money(#[from] MoneyError),

    #[error(transparent)]
    UnknownCode(#[from] UnknownCode),

    #[error("Failed to serialize analysis: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Port error: {0}")]
    Port(#[from] PortError),
}

impl ClaimError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ClaimError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ClaimError::InvalidInput { .. }
            | ClaimError::Money(_)
            | ClaimError::UnknownCode(_) => ErrorKind::Validation,
            ClaimError::ClaimNotFound(_) => ErrorKind::NotFound,
            ClaimError::InvalidStatusTransition { .. } => ErrorKind::BusinessRule,
            ClaimError::Serialization(_) => ErrorKind::Infrastructure,
            ClaimError::Port(e) => ErrorKind::from(e),
        }
    }
}
