//! HTTP API Layer
//!
//! REST surface of the claims system, built on Axum.
//!
//! # Architecture
//!
//! - **Handlers**: claim submission and review, the approval workflow, health
//! - **Middleware**: bearer authentication, request audit logging
//! - **DTOs**: validated request bodies
//! - **Error Handling**: domain error kinds mapped onto status codes
//!
//! Handlers talk to the domain services held in [`AppState`]; the services
//! see storage only through their ports, so the same router runs over
//! PostgreSQL in production and over in-memory backends in tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let app = create_router(AppState::postgres(pool, config));
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use core_kernel::HealthCheckable;
use domain_approval::ApprovalEngine;
use domain_claims::{AdjudicationPipeline, ClaimService};
use infra_db::{
    DatabasePool, PostgresApprovalAdapter, PostgresAuditSink, PostgresClaimsAdapter,
    PostgresPolicyAdapter, PostgresReferenceAdapter,
};

use crate::config::ApiConfig;
use crate::handlers::{approvals, claims, health};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AdjudicationPipeline>,
    pub claims: Arc<ClaimService>,
    pub approvals: Arc<ApprovalEngine>,
    /// Checked by `/health/ready`
    pub health: Arc<Vec<Arc<dyn HealthCheckable>>>,
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(
        pipeline: AdjudicationPipeline,
        claims: ClaimService,
        approvals: ApprovalEngine,
        health: Vec<Arc<dyn HealthCheckable>>,
        config: ApiConfig,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            claims: Arc::new(claims),
            approvals: Arc::new(approvals),
            health: Arc::new(health),
            config,
        }
    }

    /// Wires every service to the PostgreSQL adapters
    pub fn postgres(pool: DatabasePool, config: ApiConfig) -> Self {
        let policies = Arc::new(PostgresPolicyAdapter::new(pool.clone()));
        let reference = Arc::new(PostgresReferenceAdapter::new(pool.clone()));
        let claims_store = Arc::new(PostgresClaimsAdapter::new(pool.clone()));
        let approvals = Arc::new(PostgresApprovalAdapter::new(pool.clone()));
        let audit = Arc::new(PostgresAuditSink::new(pool));

        let pipeline = AdjudicationPipeline::new(
            policies.clone(),
            reference.clone(),
            claims_store.clone(),
            claims_store.clone(),
            audit.clone(),
            config.adjudication(),
        );
        let service = ClaimService::new(
            policies.clone(),
            reference,
            claims_store.clone(),
            claims_store.clone(),
            audit.clone(),
        );
        let engine = ApprovalEngine::new(approvals.clone(), approvals.clone(), approvals.clone(), audit);
        let health: Vec<Arc<dyn HealthCheckable>> = vec![policies, claims_store, approvals];

        Self::new(pipeline, service, engine, health, config)
    }
}

/// Creates the main API router
///
/// Health routes are public; everything under `/api/v1` requires a bearer
/// token.
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let claims_routes = Router::new()
        .route("/", post(claims::submit_claim))
        .route("/:id", get(claims::get_claim))
        .route("/:id/fraud-audit", post(claims::fraud_audit))
        .route("/:id/siu-referral", post(claims::refer_to_siu));

    let approval_routes = Router::new()
        .route("/start", post(approvals::start_approval))
        .route("/inbox", get(approvals::inbox))
        .route("/pending-count", get(approvals::pending_count))
        .route("/templates", get(approvals::templates))
        .route("/claim/:claim_id", get(approvals::status_for_claim))
        .route("/:id/process", post(approvals::process_approval))
        .route("/:id/cancel", post(approvals::cancel_approval))
        .route("/:id/history", get(approvals::history));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/claims", claims_routes)
        .nest("/approvals", approval_routes)
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
