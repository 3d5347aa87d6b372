//! HTTP API tests
//!
//! The router runs over the in-memory backends, so these need no database.

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use core_kernel::audit::mock::MemoryAuditSink;
use core_kernel::{HealthCheckable, UserId};
use domain_approval::{
    ApprovalEngine, ApprovalHistoryRecord, ApprovalInstance, ApprovalStatus, Approver, InboxPage,
    MockApprovalBackend, StartOutcome,
};
use domain_claims::{
    AdjudicationConfig, AdjudicationOutcome, AdjudicationPipeline, Claim, ClaimService,
    ClaimStatus, FraudAnalysis, MockClaimsBackend,
};
use domain_policy::{Customer, Policy};
use interface_api::auth::{create_token, permissions, TokenSubject};
use interface_api::config::ApiConfig;
use interface_api::{create_router, AppState};
use test_utils::{
    ApprovalFixtures, ClaimBuilder, CoverageFixtures, PolicyFixtures, ReferenceFixtures,
    SubmissionBuilder,
};

const ALL_CLAIM_PERMISSIONS: &[&str] = &[
    permissions::CLAIM_SUBMIT,
    permissions::CLAIM_READ,
    permissions::CLAIM_SUBMIT_APPROVAL,
    permissions::CLAIM_APPROVE,
    permissions::FRAUD_AUDIT,
];

struct Harness {
    server: TestServer,
    config: ApiConfig,
    claims: MockClaimsBackend,
    approvals: MockApprovalBackend,
    audit: MemoryAuditSink,
    policy: Policy,
    customer: Customer,
}

impl Harness {
    async fn new() -> Self {
        let config = ApiConfig::default();
        let claims = MockClaimsBackend::new();
        let approvals = MockApprovalBackend::new();
        let audit = MemoryAuditSink::new();

        let customer = PolicyFixtures::customer();
        let policy = PolicyFixtures::policy(customer.id);
        claims
            .add_policy(
                policy.clone(),
                customer.clone(),
                CoverageFixtures::standard_package(policy.id),
            )
            .await;
        claims.add_diagnosis(ReferenceFixtures::pneumonia()).await;
        claims
            .add_terms(PolicyFixtures::PRODUCT_CODE, ReferenceFixtures::hospitalization_terms())
            .await;
        for model in ReferenceFixtures::scoring_models() {
            claims.add_scoring_model(model).await;
        }

        let claims_port = Arc::new(claims.clone());
        let approvals_port = Arc::new(approvals.clone());
        let audit_port = Arc::new(audit.clone());

        let pipeline = AdjudicationPipeline::new(
            claims_port.clone(),
            claims_port.clone(),
            claims_port.clone(),
            claims_port.clone(),
            audit_port.clone(),
            AdjudicationConfig::default(),
        );
        let service = ClaimService::new(
            claims_port.clone(),
            claims_port.clone(),
            claims_port.clone(),
            claims_port.clone(),
            audit_port.clone(),
        );
        let engine = ApprovalEngine::new(
            approvals_port.clone(),
            approvals_port.clone(),
            approvals_port.clone(),
            audit_port,
        );
        let health: Vec<Arc<dyn HealthCheckable>> = vec![claims_port, approvals_port];

        let state = AppState::new(pipeline, service, engine, health, config.clone());
        let server = TestServer::new(create_router(state)).unwrap();

        Self {
            server,
            config,
            claims,
            approvals,
            audit,
            policy,
            customer,
        }
    }

    fn token(&self, user: UserId, role: &str, role_level: u8, perms: &[&str]) -> String {
        let subject = TokenSubject {
            user_id: user,
            name: "Test User",
            role,
            role_level,
            permissions: perms,
        };
        create_token(&subject, &self.config.jwt_secret, 300).unwrap()
    }

    fn handler_token(&self) -> String {
        self.token(UserId::new(), "HANDLER", 1, ALL_CLAIM_PERMISSIONS)
    }

    fn approver_token(&self, approver: &Approver, role_level: u8) -> String {
        self.token(approver.id, &approver.role_code, role_level, ALL_CLAIM_PERMISSIONS)
    }

    /// Stores a reviewed claim in both backends and returns it
    async fn seed_claim(&self, claimed: i64) -> Claim {
        let claim = ClaimBuilder::new(self.policy.id, self.customer.id)
            .with_amounts(claimed, claimed)
            .build();
        self.claims.insert_claim(claim.clone()).await;
        self.approvals.add_claim(claim.clone(), &self.customer.name).await;
        claim
    }
}

/// Two team leads and a department head on the standard template
struct ApprovalLine {
    leads: [Approver; 2],
    head: Approver,
}

async fn approval_line(h: &Harness) -> ApprovalLine {
    h.approvals.add_template(ApprovalFixtures::standard_template()).await;
    let line = ApprovalLine {
        leads: [
            ApprovalFixtures::approver("Lee", "TEAM_LEAD"),
            ApprovalFixtures::approver("Choi", "TEAM_LEAD"),
        ],
        head: ApprovalFixtures::approver("Park", "DEPT_HEAD"),
    };
    for user in line.leads.iter().chain([&line.head]) {
        h.approvals.add_user(user.clone()).await;
    }
    line
}

async fn start(h: &Harness, token: &str, claim: &Claim) -> ApprovalInstance {
    let response = h
        .server
        .post("/api/v1/approvals/start")
        .authorization_bearer(token)
        .json(&json!({ "claim_id": claim.id, "is_urgent": true }))
        .await;
    response.assert_status_ok();
    match response.json::<StartOutcome>() {
        StartOutcome::Started { instance } => instance,
        other => panic!("expected a started approval, got {other:?}"),
    }
}

fn process_path(instance: &ApprovalInstance) -> String {
    format!("/api/v1/approvals/{}/process", instance.id)
}

// ============================================================================
// Health and authentication
// ============================================================================

mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_is_public() {
        let h = Harness::new().await;
        let response = h.server.get("/health").await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["status"], "healthy");
    }

    #[tokio::test]
    async fn test_readiness_reports_each_adapter() {
        let h = Harness::new().await;
        let response = h.server.get("/health/ready").await;
        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["status"], "ready");
        assert_eq!(body["adapters"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let h = Harness::new().await;
        let response = h.server.get("/api/v1/approvals/pending-count").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<Value>()["error"], "unauthorized");
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_unauthorized() {
        let h = Harness::new().await;
        let subject = TokenSubject {
            user_id: UserId::new(),
            name: "Mallory",
            role: "ADMIN",
            role_level: 5,
            permissions: &[],
        };
        let forged = create_token(&subject, "not-the-secret", 300).unwrap();
        h.server
            .get("/api/v1/approvals/pending-count")
            .authorization_bearer(forged)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}

// ============================================================================
// Claims
// ============================================================================

mod claims_tests {
    use super::*;

    #[tokio::test]
    async fn test_submit_claim_adjudicates_and_stores() {
        let h = Harness::new().await;
        let response = h
            .server
            .post("/api/v1/claims")
            .authorization_bearer(h.handler_token())
            .json(&SubmissionBuilder::new().build())
            .await;

        response.assert_status(StatusCode::CREATED);
        let outcome = response.json::<AdjudicationOutcome>();
        assert!(outcome.claim_id.is_some());
        assert!(outcome
            .claim_number
            .as_deref()
            .is_some_and(|n| n.starts_with("CLM-")));
        assert!(outcome.validation.is_valid);
        assert_eq!(h.claims.claims().await.len(), 1);
    }

    #[tokio::test]
    async fn test_submit_without_permission_is_forbidden() {
        let h = Harness::new().await;
        let token = h.token(UserId::new(), "VIEWER", 1, &[permissions::CLAIM_READ]);
        h.server
            .post("/api/v1/claims")
            .authorization_bearer(token)
            .json(&SubmissionBuilder::new().build())
            .await
            .assert_status(StatusCode::FORBIDDEN);
        assert!(h.claims.claims().await.is_empty());
    }

    #[tokio::test]
    async fn test_submit_blank_policy_number_is_bad_request() {
        let h = Harness::new().await;
        let mut body = serde_json::to_value(SubmissionBuilder::new().build()).unwrap();
        body["policy_number"] = json!("");

        let response = h
            .server
            .post("/api/v1/claims")
            .authorization_bearer(h.handler_token())
            .json(&body)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let error = response.json::<Value>();
        assert_eq!(error["error"], "validation_error");
        assert!(error["details"][0]
            .as_str()
            .is_some_and(|d| d.starts_with("policy_number")));
    }

    #[tokio::test]
    async fn test_unknown_policy_is_rejected_without_a_claim() {
        let h = Harness::new().await;
        let response = h
            .server
            .post("/api/v1/claims")
            .authorization_bearer(h.handler_token())
            .json(&SubmissionBuilder::new().with_policy_number("POL-9999-0000").build())
            .await;

        response.assert_status_ok();
        let outcome = response.json::<AdjudicationOutcome>();
        assert_eq!(outcome.status, ClaimStatus::Rejected);
        assert!(outcome.claim_id.is_none());
    }

    #[tokio::test]
    async fn test_get_claim() {
        let h = Harness::new().await;
        let claim = h.seed_claim(2_000_000).await;

        let response = h
            .server
            .get(&format!("/api/v1/claims/{}", claim.id))
            .authorization_bearer(h.handler_token())
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Claim>().claim_number, claim.claim_number);
    }

    #[tokio::test]
    async fn test_get_unknown_claim_is_not_found() {
        let h = Harness::new().await;
        h.server
            .get(&format!("/api/v1/claims/{}", uuid::Uuid::new_v4()))
            .authorization_bearer(h.handler_token())
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_fraud_audit_records_analysis() {
        let h = Harness::new().await;
        let claim = h.seed_claim(2_000_000).await;

        let response = h
            .server
            .post(&format!("/api/v1/claims/{}/fraud-audit", claim.id))
            .authorization_bearer(h.handler_token())
            .await;
        response.assert_status_ok();
        let analysis = response.json::<FraudAnalysis>();
        assert!(analysis.score <= 100);

        let audits = h.claims.fraud_audits().await;
        assert_eq!(audits.len(), 1);
        assert_eq!(audits[0].0, claim.id);
    }

    #[tokio::test]
    async fn test_siu_referral() {
        let h = Harness::new().await;
        let claim = h.seed_claim(2_000_000).await;
        let path = format!("/api/v1/claims/{}/siu-referral", claim.id);

        h.server
            .post(&path)
            .authorization_bearer(h.handler_token())
            .json(&json!({ "reason": "" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let response = h
            .server
            .post(&path)
            .authorization_bearer(h.handler_token())
            .json(&json!({ "reason": "Repeated admissions at the same clinic" }))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Claim>().status, ClaimStatus::SiuReferred);
        assert!(h
            .audit
            .actions()
            .await
            .iter()
            .any(|a| a.contains("SIU")));
    }
}

// ============================================================================
// Approvals
// ============================================================================

mod approval_tests {
    use super::*;

    #[tokio::test]
    async fn test_two_step_approval_over_http() {
        let h = Harness::new().await;
        let line = approval_line(&h).await;
        let claim = h.seed_claim(5_000_000).await;
        let lead = h.approver_token(&line.leads[0], 2);

        let instance = start(&h, &lead, &claim).await;
        assert_eq!(instance.status, ApprovalStatus::InProgress);
        assert_eq!(instance.current_step, 1);

        let inbox = h
            .server
            .get("/api/v1/approvals/inbox")
            .authorization_bearer(h.approver_token(&line.leads[1], 2))
            .await;
        inbox.assert_status_ok();
        let page = inbox.json::<InboxPage>();
        assert_eq!(page.total, 1);
        assert!(page.items[0].is_urgent);

        let advanced = h
            .server
            .post(&process_path(&instance))
            .authorization_bearer(&lead)
            .json(&json!({ "action": "APPROVE", "comments": "Documents complete" }))
            .await;
        advanced.assert_status_ok();
        assert_eq!(advanced.json::<ApprovalInstance>().current_step, 2);

        // The other lead's entry was superseded when the step advanced
        h.server
            .post(&process_path(&instance))
            .authorization_bearer(h.approver_token(&line.leads[1], 2))
            .json(&json!({ "action": "APPROVE" }))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let done = h
            .server
            .post(&process_path(&instance))
            .authorization_bearer(h.approver_token(&line.head, 3))
            .json(&json!({ "action": "APPROVE", "adjusted_amount": "4500000" }))
            .await;
        done.assert_status_ok();
        assert_eq!(done.json::<ApprovalInstance>().status, ApprovalStatus::Approved);

        let history = h
            .server
            .get(&format!("/api/v1/approvals/{}/history", instance.id))
            .authorization_bearer(&lead)
            .await;
        history.assert_status_ok();
        assert_eq!(history.json::<Vec<ApprovalHistoryRecord>>().len(), 2);

        let stored = h.approvals.claim(claim.id).await.unwrap();
        assert_eq!(stored.status, ClaimStatus::Approved);
        assert_eq!(stored.total_approved_amount, core_kernel::Won::from_i64(4_500_000));

        let status = h
            .server
            .get(&format!("/api/v1/approvals/claim/{}", claim.id))
            .authorization_bearer(&lead)
            .await;
        status.assert_status_ok();
        assert_eq!(status.json::<Value>()["instance"]["status"], "APPROVED");
    }

    #[tokio::test]
    async fn test_second_start_is_rejected() {
        let h = Harness::new().await;
        let line = approval_line(&h).await;
        let claim = h.seed_claim(5_000_000).await;
        let lead = h.approver_token(&line.leads[0], 2);

        start(&h, &lead, &claim).await;
        h.server
            .post("/api/v1/approvals/start")
            .authorization_bearer(&lead)
            .json(&json!({ "claim_id": claim.id }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(h.approvals.instance_count().await, 1);
    }

    #[tokio::test]
    async fn test_skip_is_not_implemented() {
        let h = Harness::new().await;
        let line = approval_line(&h).await;
        let claim = h.seed_claim(5_000_000).await;
        let lead = h.approver_token(&line.leads[0], 2);
        let instance = start(&h, &lead, &claim).await;

        h.server
            .post(&process_path(&instance))
            .authorization_bearer(&lead)
            .json(&json!({ "action": "SKIP" }))
            .await
            .assert_status(StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn test_cancel_requires_initiator_or_senior_role() {
        let h = Harness::new().await;
        let line = approval_line(&h).await;
        let claim = h.seed_claim(5_000_000).await;
        let instance = start(&h, &h.approver_token(&line.leads[0], 2), &claim).await;
        let path = format!("/api/v1/approvals/{}/cancel", instance.id);

        h.server
            .post(&path)
            .authorization_bearer(h.approver_token(&line.leads[1], 2))
            .json(&json!({ "reason": "duplicate" }))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let director = h.token(UserId::new(), "DIRECTOR", 4, &[permissions::CLAIM_APPROVE]);
        let response = h
            .server
            .post(&path)
            .authorization_bearer(director)
            .json(&json!({ "reason": "duplicate" }))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<ApprovalInstance>().status, ApprovalStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_pending_count_follows_assignments() {
        let h = Harness::new().await;
        let line = approval_line(&h).await;
        let claim = h.seed_claim(5_000_000).await;
        start(&h, &h.approver_token(&line.leads[0], 2), &claim).await;

        let count = |approver: &Approver, level: u8| {
            h.server
                .get("/api/v1/approvals/pending-count")
                .authorization_bearer(h.approver_token(approver, level))
        };
        assert_eq!(count(&line.leads[1], 2).await.json::<Value>()["count"], 1);
        assert_eq!(count(&line.head, 3).await.json::<Value>()["count"], 0);
    }

    #[tokio::test]
    async fn test_inbox_limit_is_bounded() {
        let h = Harness::new().await;
        h.server
            .get("/api/v1/approvals/inbox")
            .add_query_param("limit", 101)
            .authorization_bearer(h.handler_token())
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_templates_need_role_level_two() {
        let h = Harness::new().await;
        approval_line(&h).await;

        h.server
            .get("/api/v1/approvals/templates")
            .authorization_bearer(h.handler_token())
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let lead = h.token(UserId::new(), "TEAM_LEAD", 2, &[]);
        let response = h
            .server
            .get("/api/v1/approvals/templates")
            .authorization_bearer(lead)
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>().as_array().map(Vec::len), Some(1));
    }
}
