//! Authentication and authorization
//!
//! Callers present an HS256 bearer token whose claims carry their identity:
//! user id, display name, role, role level and permission set.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use core_kernel::UserId;

use crate::error::ApiError;

/// Role that passes every permission check
pub const ADMIN_ROLE: &str = "ADMIN";

/// JWT claims identifying the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallerIdentity {
    /// User id
    pub sub: Uuid,
    pub name: String,
    pub role: String,
    /// 1 (handler) to 5 (administrator)
    pub role_level: u8,
    pub permissions: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

impl CallerIdentity {
    pub fn user_id(&self) -> UserId {
        UserId::from_uuid(self.sub)
    }

    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.is_admin() || self.permissions.iter().any(|p| p == permission)
    }

    pub fn require(&self, permission: &str) -> Result<(), ApiError> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!("missing permission {permission}")))
        }
    }

    pub fn require_any(&self, permissions: &[&str]) -> Result<(), ApiError> {
        if permissions.iter().any(|p| self.has_permission(p)) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "missing one of permissions {}",
                permissions.join(", ")
            )))
        }
    }

    pub fn require_level(&self, level: u8) -> Result<(), ApiError> {
        if self.is_admin() || self.role_level >= level {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!("role level {level} or higher required")))
        }
    }
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// Who a token is issued to
#[derive(Debug, Clone)]
pub struct TokenSubject<'a> {
    pub user_id: UserId,
    pub name: &'a str,
    pub role: &'a str,
    pub role_level: u8,
    pub permissions: &'a [&'a str],
}

/// Signs a token for `subject`, valid for `expiration_secs`
pub fn create_token(
    subject: &TokenSubject<'_>,
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now + Duration::seconds(i64::try_from(expiration_secs).unwrap_or(i64::MAX / 1000));

    let claims = CallerIdentity {
        sub: *subject.user_id.as_uuid(),
        name: subject.name.to_string(),
        role: subject.role.to_string(),
        role_level: subject.role_level,
        permissions: subject.permissions.iter().map(|p| p.to_string()).collect(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::Signing(e.to_string()))
}

/// Validates a token and returns the caller it identifies
pub fn validate_token(token: &str, secret: &str) -> Result<CallerIdentity, AuthError> {
    let token_data = decode::<CallerIdentity>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        JwtErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// Permission definitions
pub mod permissions {
    pub const CLAIM_SUBMIT: &str = "claim:submit";
    pub const CLAIM_READ: &str = "claim:read";
    pub const CLAIM_SUBMIT_APPROVAL: &str = "claim:submit_approval";
    pub const CLAIM_APPROVE: &str = "claim:approve";
    pub const FRAUD_AUDIT: &str = "fraud:audit";
    pub const APPROVAL_TEMPLATES: &str = "approval:templates";
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn subject<'a>(permissions: &'a [&'a str]) -> TokenSubject<'a> {
        TokenSubject {
            user_id: UserId::new(),
            name: "Lee",
            role: "TEAM_LEAD",
            role_level: 2,
            permissions,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let subject = subject(&[permissions::CLAIM_APPROVE]);
        let token = create_token(&subject, SECRET, 60).unwrap();
        let caller = validate_token(&token, SECRET).unwrap();

        assert_eq!(caller.user_id(), subject.user_id);
        assert_eq!(caller.role_level, 2);
        assert!(caller.has_permission(permissions::CLAIM_APPROVE));
        assert!(!caller.has_permission(permissions::FRAUD_AUDIT));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = create_token(&subject(&[]), SECRET, 60).unwrap();
        assert!(matches!(
            validate_token(&token, "other-secret"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_admin_passes_every_check() {
        let mut caller = validate_token(&create_token(&subject(&[]), SECRET, 60).unwrap(), SECRET).unwrap();
        assert!(caller.require(permissions::FRAUD_AUDIT).is_err());
        assert!(caller.require_level(3).is_err());

        caller.role = ADMIN_ROLE.to_string();
        assert!(caller.require(permissions::FRAUD_AUDIT).is_ok());
        assert!(caller.require_level(5).is_ok());
    }

    #[test]
    fn test_require_any() {
        let caller = validate_token(
            &create_token(&subject(&[permissions::CLAIM_APPROVE]), SECRET, 60).unwrap(),
            SECRET,
        )
        .unwrap();
        assert!(caller
            .require_any(&[permissions::CLAIM_SUBMIT_APPROVAL, permissions::CLAIM_APPROVE])
            .is_ok());
        assert!(caller.require_any(&[permissions::CLAIM_SUBMIT]).is_err());
    }
}
