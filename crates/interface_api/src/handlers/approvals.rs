//! Approval workflow handlers
//!
//! The acting user always comes from the caller's token, never from the body.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{ApprovalId, ClaimId, UserId};
use domain_approval::{
    ActionRequest, ApprovalHistoryRecord, ApprovalInstance, ApprovalStatusView, ApprovalTemplate,
    InboxPage, StartOutcome, StartRequest,
};

use crate::auth::{permissions, CallerIdentity};
use crate::dto::approvals::*;
use crate::{error::ApiError, AppState};

/// Role level needed to browse approval line templates
const TEMPLATE_VIEW_LEVEL: u8 = 2;

/// Starts the approval workflow for a claim
pub async fn start_approval(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(request): Json<StartApprovalRequest>,
) -> Result<Json<StartOutcome>, ApiError> {
    caller.require(permissions::CLAIM_SUBMIT_APPROVAL)?;
    request.validate()?;

    let outcome = state
        .approvals
        .start(StartRequest {
            claim_id: ClaimId::from_uuid(request.claim_id),
            initiated_by: caller.user_id(),
            urgency: request.urgency(),
            notes: request.notes,
        })
        .await?;
    Ok(Json(outcome))
}

/// Applies an approver's action to the current step
pub async fn process_approval(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
    Json(request): Json<ProcessApprovalRequest>,
) -> Result<Json<ApprovalInstance>, ApiError> {
    caller.require(permissions::CLAIM_APPROVE)?;
    request.validate()?;

    let instance = state
        .approvals
        .process(ActionRequest {
            approval_id: ApprovalId::from_uuid(id),
            actor: caller.user_id(),
            action: request.action,
            adjusted_amount: request.adjusted_amount()?,
            comments: request.comments,
            delegate_to: request.delegate_to.map(UserId::from_uuid),
        })
        .await?;
    Ok(Json(instance))
}

/// Cancels an active approval
pub async fn cancel_approval(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
    body: Option<Json<CancelApprovalRequest>>,
) -> Result<Json<ApprovalInstance>, ApiError> {
    caller.require_any(&[permissions::CLAIM_SUBMIT_APPROVAL, permissions::CLAIM_APPROVE])?;
    let request = body.map(|Json(b)| b).unwrap_or_default();
    request.validate()?;

    let instance = state
        .approvals
        .cancel(
            ApprovalId::from_uuid(id),
            caller.user_id(),
            caller.role_level,
            request.reason,
        )
        .await?;
    Ok(Json(instance))
}

/// Lists the caller's inbox
pub async fn inbox(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Query(query): Query<InboxQuery>,
) -> Result<Json<InboxPage>, ApiError> {
    caller.require(permissions::CLAIM_APPROVE)?;
    query.validate()?;
    let page = state.approvals.inbox(caller.user_id(), query.into()).await?;
    Ok(Json(page))
}

pub async fn pending_count(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<Json<PendingCountResponse>, ApiError> {
    caller.require(permissions::CLAIM_APPROVE)?;
    let count = state.approvals.pending_count(caller.user_id()).await?;
    Ok(Json(PendingCountResponse { count }))
}

/// Latest approval of a claim, with its history
pub async fn status_for_claim(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(claim_id): Path<Uuid>,
) -> Result<Json<ApprovalStatusView>, ApiError> {
    caller.require(permissions::CLAIM_READ)?;
    let view = state
        .approvals
        .status_for_claim(ClaimId::from_uuid(claim_id))
        .await?;
    Ok(Json(view))
}

pub async fn history(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ApprovalHistoryRecord>>, ApiError> {
    caller.require(permissions::CLAIM_READ)?;
    let history = state.approvals.history(ApprovalId::from_uuid(id)).await?;
    Ok(Json(history))
}

pub async fn templates(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<Json<Vec<ApprovalTemplate>>, ApiError> {
    if !caller.has_permission(permissions::APPROVAL_TEMPLATES) {
        caller.require_level(TEMPLATE_VIEW_LEVEL)?;
    }
    let templates = state.approvals.templates().await?;
    Ok(Json(templates))
}
