//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use core_kernel::ErrorKind;
use domain_approval::ApprovalError;
use domain_claims::ClaimError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String, Vec<String>),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ApiError {
    fn from_kind(kind: ErrorKind, message: String) -> Self {
        match kind {
            ErrorKind::NotFound => ApiError::NotFound(message),
            ErrorKind::Validation => ApiError::Validation(message, Vec::new()),
            ErrorKind::BusinessRule => ApiError::BadRequest(message),
            ErrorKind::Conflict => ApiError::Conflict(message),
            ErrorKind::NotImplemented => ApiError::NotImplemented(message),
            ErrorKind::Infrastructure => ApiError::Internal(message),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(..) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, message, details) = match self {
            ApiError::NotFound(msg) => ("not_found", msg, None),
            ApiError::BadRequest(msg) => ("bad_request", msg, None),
            ApiError::Unauthorized => ("unauthorized", "Unauthorized".to_string(), None),
            ApiError::Forbidden(msg) => ("forbidden", msg, None),
            ApiError::Conflict(msg) => ("conflict", msg, None),
            ApiError::NotImplemented(msg) => ("not_implemented", msg, None),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                ("internal_error", "Internal server error".to_string(), None)
            }
            ApiError::Validation(msg, details) => {
                ("validation_error", msg, (!details.is_empty()).then_some(details))
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ClaimError> for ApiError {
    fn from(err: ClaimError) -> Self {
        ApiError::from_kind(err.kind(), err.to_string())
    }
}

impl From<ApprovalError> for ApiError {
    fn from(err: ApprovalError) -> Self {
        if err.is_forbidden() {
            return ApiError::Forbidden(err.to_string());
        }
        ApiError::from_kind(err.kind(), err.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => format!("{field}: {msg}"),
                    None => format!("{field}: {}", e.code),
                })
            })
            .collect();
        details.sort();
        ApiError::Validation("Request validation failed".to_string(), details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{ApprovalId, PortError, UserId};

    #[test]
    fn test_claim_errors_map_by_kind() {
        let missing = ApiError::from(ClaimError::ClaimNotFound(core_kernel::ClaimId::new().to_string()));
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let invalid = ApiError::from(ClaimError::invalid("reason", "is required"));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let port = ApiError::from(ClaimError::Port(PortError::connection("pool closed")));
        assert_eq!(port.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_approval_errors_map_by_kind() {
        let cases = [
            (ApprovalError::ApprovalNotFound(ApprovalId::new()), StatusCode::NOT_FOUND),
            (ApprovalError::NoApplicableTemplate, StatusCode::BAD_REQUEST),
            (ApprovalError::NotAuthorizedToApprove(UserId::new()), StatusCode::FORBIDDEN),
            (ApprovalError::NotAuthorizedToCancel(UserId::new()), StatusCode::FORBIDDEN),
            (ApprovalError::NotImplemented("SKIP action".into()), StatusCode::NOT_IMPLEMENTED),
            (ApprovalError::Port(PortError::conflict("stale version")), StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }
}
