//! Core error types used across the system

use thiserror::Error;
use crate::money::MoneyError;
use crate::temporal::TemporalError;

/// Coarse classification shared by every domain error
///
/// The HTTP layer maps kinds onto status codes; callers use it to tell
/// expected business outcomes apart from infrastructure failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Validation,
    BusinessRule,
    Conflict,
    NotImplemented,
    Infrastructure,
}

/// Core error type for the kernel
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    #[error("Temporal error: {0}")]
    Temporal(#[from] TemporalError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        CoreError::NotFound(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        CoreError::Configuration(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Money(_) | CoreError::Temporal(_) | CoreError::Validation(_) => {
                ErrorKind::Validation
            }
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::Configuration(_) => ErrorKind::Infrastructure,
        }
    }
}

impl From<&crate::ports::PortError> for ErrorKind {
    fn from(err: &crate::ports::PortError) -> Self {
        use crate::ports::PortError;
        match err {
            PortError::NotFound { .. } => ErrorKind::NotFound,
            PortError::Validation { .. } => ErrorKind::Validation,
            PortError::Conflict { .. } => ErrorKind::Conflict,
            _ => ErrorKind::Infrastructure,
        }
    }
}
