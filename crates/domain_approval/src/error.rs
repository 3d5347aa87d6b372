//! Approval workflow errors

use thiserror::Error;

use core_kernel::{ApprovalId, ClaimId, ErrorKind, PortError, UserId};

/// Errors raised by the approval engine
#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("Claim not found: {0}")]
    ClaimNotFound(ClaimId),

    #[error("Approval not found: {0}")]
    ApprovalNotFound(ApprovalId),

    #[error("No approval has been started for claim {0}")]
    NoApprovalForClaim(ClaimId),

    #[error("An approval is already in progress for claim {0}")]
    DuplicateWorkflow(ClaimId),

    #[error("No approval line template applies to the claim")]
    NoApplicableTemplate,

    #[error("No active approvers hold role {role}")]
    NoApproversAvailable { role: String },

    #[error("Approval is not in progress (status: {status})")]
    ApprovalNotActive { status: String },

    #[error("User {0} has no pending approval for the current step")]
    NotAuthorizedToApprove(UserId),

    #[error("User {0} cannot receive a delegation for this step")]
    InvalidDelegate(UserId),

    #[error("User {0} may not cancel this approval")]
    NotAuthorizedToCancel(UserId),

    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("{0} is not supported")]
    NotImplemented(String),

    #[error("Port error: {0}")]
    Port(#[from] PortError),
}

impl ApprovalError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ApprovalError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApprovalError::ClaimNotFound(_)
            | ApprovalError::ApprovalNotFound(_)
            | ApprovalError::NoApprovalForClaim(_) => ErrorKind::NotFound,
            ApprovalError::InvalidInput { .. } => ErrorKind::Validation,
            ApprovalError::DuplicateWorkflow(_)
            | ApprovalError::NoApplicableTemplate
            | ApprovalError::NoApproversAvailable { .. }
            | ApprovalError::ApprovalNotActive { .. }
            | ApprovalError::NotAuthorizedToApprove(_)
            | ApprovalError::InvalidDelegate(_)
            | ApprovalError::NotAuthorizedToCancel(_) => ErrorKind::BusinessRule,
            ApprovalError::NotImplemented(_) => ErrorKind::NotImplemented,
            ApprovalError::Port(e) => ErrorKind::from(e),
        }
    }

    /// Whether the caller lacks the right to act, as opposed to the
    /// workflow being in the wrong state
    pub fn is_forbidden(&self) -> bool {
        matches!(
            self,
            ApprovalError::NotAuthorizedToApprove(_)
                | ApprovalError::InvalidDelegate(_)
                | ApprovalError::NotAuthorizedToCancel(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            ApprovalError::DuplicateWorkflow(ClaimId::new()).kind(),
            ErrorKind::BusinessRule
        );
        assert_eq!(
            ApprovalError::NotImplemented("SKIP".into()).kind(),
            ErrorKind::NotImplemented
        );
        assert_eq!(
            ApprovalError::from(PortError::conflict("step already taken")).kind(),
            ErrorKind::Conflict
        );
        assert!(ApprovalError::NotAuthorizedToApprove(UserId::new()).is_forbidden());
        assert!(!ApprovalError::NoApplicableTemplate.is_forbidden());
    }
}
