//! Claims handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::ClaimId;
use domain_claims::{AdjudicationOutcome, Claim, FraudAnalysis};

use crate::auth::{permissions, CallerIdentity};
use crate::dto::claims::*;
use crate::{error::ApiError, AppState};

/// Submits a claim and runs automatic adjudication
///
/// Returns 201 when the claim was stored, 200 when it was rejected before a
/// claim record could be created (unknown policy).
pub async fn submit_claim(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Json(request): Json<SubmitClaimRequest>,
) -> Result<(StatusCode, Json<AdjudicationOutcome>), ApiError> {
    caller.require(permissions::CLAIM_SUBMIT)?;
    request.validate()?;

    let outcome = state
        .pipeline
        .adjudicate(request.into_submission()?, caller.user_id())
        .await?;

    let status = if outcome.claim_id.is_some() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)))
}

/// Gets a claim by ID
pub async fn get_claim(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
) -> Result<Json<Claim>, ApiError> {
    caller.require(permissions::CLAIM_READ)?;
    let claim = state.claims.get_claim(ClaimId::from_uuid(id)).await?;
    Ok(Json(claim))
}

/// Re-runs fraud detection with the full-audit profile
pub async fn fraud_audit(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
) -> Result<Json<FraudAnalysis>, ApiError> {
    caller.require(permissions::FRAUD_AUDIT)?;
    let analysis = state
        .claims
        .run_fraud_audit(ClaimId::from_uuid(id), caller.user_id())
        .await?;
    Ok(Json(analysis))
}

/// Refers a claim to the special investigation unit
pub async fn refer_to_siu(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(id): Path<Uuid>,
    Json(request): Json<SiuReferralRequest>,
) -> Result<Json<Claim>, ApiError> {
    caller.require(permissions::FRAUD_AUDIT)?;
    request.validate()?;
    let claim = state
        .claims
        .refer_to_siu(ClaimId::from_uuid(id), &request.reason, caller.user_id())
        .await?;
    Ok(Json(claim))
}
