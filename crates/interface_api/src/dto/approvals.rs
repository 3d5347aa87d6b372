//! Approval DTOs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::Won;
use domain_approval::{ApprovalAction, InboxFilter, InboxStatus, Urgency};

use crate::error::ApiError;

/// Body of `POST /approvals/start`
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct StartApprovalRequest {
    pub claim_id: Uuid,
    #[serde(default)]
    pub is_urgent: bool,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl StartApprovalRequest {
    pub fn urgency(&self) -> Urgency {
        if self.is_urgent {
            Urgency::Urgent
        } else {
            Urgency::Normal
        }
    }
}

/// Body of `POST /approvals/:id/process`
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ProcessApprovalRequest {
    pub action: ApprovalAction,
    #[validate(length(max = 2000))]
    pub comments: Option<String>,
    pub adjusted_amount: Option<Decimal>,
    pub delegate_to: Option<Uuid>,
}

impl ProcessApprovalRequest {
    pub fn adjusted_amount(&self) -> Result<Option<Won>, ApiError> {
        self.adjusted_amount
            .map(|amount| Won::non_negative(amount, "adjusted_amount"))
            .transpose()
            .map_err(|e| ApiError::Validation(e.to_string(), vec!["adjusted_amount".into()]))
    }
}

/// Body of `POST /approvals/:id/cancel`
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct CancelApprovalRequest {
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

/// Query string of `GET /approvals/inbox`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct InboxQuery {
    pub status: Option<InboxStatus>,
    #[serde(default)]
    pub urgent_only: bool,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u32>,
}

impl From<InboxQuery> for InboxFilter {
    fn from(query: InboxQuery) -> Self {
        let defaults = InboxFilter::default();
        InboxFilter {
            status: query.status,
            urgent_only: query.urgent_only,
            page: query.page.unwrap_or(defaults.page),
            limit: query.limit.unwrap_or(defaults.limit),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingCountResponse {
    pub count: u64,
}
