//! Claims Domain Ports
//!
//! Port interfaces the adjudication pipeline and the claim services depend
//! on. The Postgres adapters live in `infra_db`; an in-memory backend that
//! implements every port is available under the `mock` feature.
//!
//! ```rust,ignore
//! let pipeline = AdjudicationPipeline::new(
//!     Arc::new(PgPolicyRepository::new(pool.clone())),
//!     Arc::new(PgReferenceRepository::new(pool.clone())),
//!     Arc::new(PgClaimRepository::new(pool.clone())),
//!     Arc::new(PgClaimRepository::new(pool.clone())),
//!     Arc::new(PgAuditSink::new(pool)),
//!     AdjudicationConfig::default(),
//! );
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;

use core_kernel::{
    ClaimId, CoverageId, CustomerId, DomainPort, HealthCheckable, PolicyId, PortError, Won,
};
use domain_policy::{Customer, DiagnosisInfo, Policy, PolicyCoverage, PolicyTerm, SurgeryInfo};

use crate::claim::Claim;
use crate::fraud::FraudAnalysis;
use crate::models::{ModelResult, ScoringModel};

/// Read access to policies, their holders and coverage lines
#[async_trait]
pub trait PolicyPort: DomainPort + HealthCheckable {
    /// Looks up a policy and its holder by policy number
    async fn get_policy_by_number(
        &self,
        policy_number: &str,
    ) -> Result<Option<(Policy, Customer)>, PortError>;

    async fn get_policy(&self, id: PolicyId) -> Result<Policy, PortError>;

    async fn get_customer(&self, id: CustomerId) -> Result<Customer, PortError>;

    /// Active coverage lines of a policy
    async fn get_active_coverages(&self, policy_id: PolicyId)
        -> Result<Vec<PolicyCoverage>, PortError>;
}

/// Static reference data
#[async_trait]
pub trait ReferencePort: DomainPort {
    async fn get_diagnosis(&self, code: &str) -> Result<Option<DiagnosisInfo>, PortError>;

    async fn get_surgery(&self, code: &str) -> Result<Option<SurgeryInfo>, PortError>;

    /// Policy terms of a product
    async fn get_policy_terms(&self, product_code: &str) -> Result<Vec<PolicyTerm>, PortError>;

    /// Active scoring models
    async fn get_scoring_models(&self) -> Result<Vec<ScoringModel>, PortError>;
}

/// Filter for counting a customer's earlier claims
#[derive(Debug, Clone)]
pub struct HistoryQuery {
    pub customer_id: CustomerId,
    /// Claims dated on or after this day
    pub since: Option<NaiveDate>,
    pub diagnosis_code: Option<String>,
    pub hospital_name: Option<String>,
    /// Only claims admitted on a Friday and discharged on a Monday
    pub weekend_admission_only: bool,
    pub exclude: Option<ClaimId>,
}

impl HistoryQuery {
    pub fn for_customer(customer_id: CustomerId) -> Self {
        Self {
            customer_id,
            since: None,
            diagnosis_code: None,
            hospital_name: None,
            weekend_admission_only: false,
            exclude: None,
        }
    }

    pub fn since(mut self, date: NaiveDate) -> Self {
        self.since = Some(date);
        self
    }

    pub fn diagnosis(mut self, code: &str) -> Self {
        self.diagnosis_code = Some(code.to_string());
        self
    }

    pub fn hospital(mut self, name: &str) -> Self {
        self.hospital_name = Some(name.to_string());
        self
    }

    pub fn weekend_admissions(mut self) -> Self {
        self.weekend_admission_only = true;
        self
    }

    pub fn excluding(mut self, claim_id: Option<ClaimId>) -> Self {
        self.exclude = claim_id;
        self
    }
}

/// Identity of a treatment episode for duplicate detection
#[derive(Debug, Clone)]
pub struct DuplicateKey {
    pub customer_id: CustomerId,
    pub diagnosis_code: String,
    pub hospital_name: String,
    pub treatment_start_date: NaiveDate,
    pub exclude: Option<ClaimId>,
}

/// Claim history lookups used by fraud scoring
#[async_trait]
pub trait ClaimHistoryPort: DomainPort {
    async fn count_claims(&self, query: &HistoryQuery) -> Result<u32, PortError>;

    /// Claim number of an existing claim for the same treatment episode
    async fn find_duplicate(&self, key: &DuplicateKey) -> Result<Option<String>, PortError>;
}

/// Increment applied to a coverage line's running counters
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageUsage {
    pub coverage_id: CoverageId,
    pub amount: Won,
    pub days: u32,
}

/// Everything one adjudication run writes
#[derive(Debug, Clone)]
pub struct AdjudicationRecord {
    pub claim: Claim,
    pub model_results: Vec<ModelResult>,
    /// Stored with the claim and consumed once it is approved, here for an
    /// auto-approved claim and otherwise by the approval that settles it
    pub usage: Vec<CoverageUsage>,
}

/// Claim persistence
#[async_trait]
pub trait ClaimStore: DomainPort + HealthCheckable {
    /// Allocates the next claim number for a year
    async fn next_claim_number(&self, year: i32) -> Result<String, PortError>;

    /// Writes the claim, its model results and coverage usage in one
    /// transaction
    async fn persist_adjudication(&self, record: AdjudicationRecord) -> Result<ClaimId, PortError>;

    async fn get_claim(&self, id: ClaimId) -> Result<Claim, PortError>;

    /// Stores a full-audit result and updates the claim's fraud fields
    async fn record_fraud_audit(
        &self,
        claim_id: ClaimId,
        analysis: &FraudAnalysis,
    ) -> Result<(), PortError>;

    /// Marks the claim as referred to the special investigation unit
    async fn refer_to_siu(&self, claim_id: ClaimId, reason: &str) -> Result<Claim, PortError>;
}

/// In-memory implementation of the claims ports for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use core_kernel::{AdapterHealth, BusinessCalendar, HealthCheckResult};

    use crate::claim::{format_claim_number, ClaimStatus};

    #[derive(Debug, Default)]
    struct State {
        policies: HashMap<PolicyId, Policy>,
        customers: HashMap<CustomerId, Customer>,
        coverages: HashMap<PolicyId, Vec<PolicyCoverage>>,
        diagnoses: HashMap<String, DiagnosisInfo>,
        surgeries: HashMap<String, SurgeryInfo>,
        terms: HashMap<String, Vec<PolicyTerm>>,
        models: Vec<ScoringModel>,
        claims: HashMap<ClaimId, Claim>,
        model_results: HashMap<ClaimId, Vec<ModelResult>>,
        pending_usage: HashMap<ClaimId, Vec<CoverageUsage>>,
        fraud_audits: Vec<(ClaimId, FraudAnalysis)>,
        sequence: u64,
        fail_persist: bool,
    }

    /// Shared in-memory backend implementing every claims port
    #[derive(Debug, Default, Clone)]
    pub struct MockClaimsBackend {
        state: Arc<RwLock<State>>,
    }

    impl MockClaimsBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn add_policy(
            &self,
            policy: Policy,
            customer: Customer,
            coverages: Vec<PolicyCoverage>,
        ) {
            let mut state = self.state.write().await;
            state.coverages.insert(policy.id, coverages);
            state.customers.insert(customer.id, customer);
            state.policies.insert(policy.id, policy);
        }

        pub async fn add_diagnosis(&self, info: DiagnosisInfo) {
            self.state.write().await.diagnoses.insert(info.code.clone(), info);
        }

        pub async fn add_surgery(&self, info: SurgeryInfo) {
            self.state.write().await.surgeries.insert(info.code.clone(), info);
        }

        pub async fn add_terms(&self, product_code: &str, terms: Vec<PolicyTerm>) {
            self.state
                .write()
                .await
                .terms
                .insert(product_code.to_string(), terms);
        }

        pub async fn add_scoring_model(&self, model: ScoringModel) {
            self.state.write().await.models.push(model);
        }

        /// Seeds an already adjudicated claim
        pub async fn insert_claim(&self, claim: Claim) {
            self.state.write().await.claims.insert(claim.id, claim);
        }

        /// Makes every later `persist_adjudication` fail
        pub async fn fail_persistence(&self) {
            self.state.write().await.fail_persist = true;
        }

        pub async fn claims(&self) -> Vec<Claim> {
            self.state.read().await.claims.values().cloned().collect()
        }

        pub async fn coverages_of(&self, policy_id: PolicyId) -> Vec<PolicyCoverage> {
            self.state
                .read()
                .await
                .coverages
                .get(&policy_id)
                .cloned()
                .unwrap_or_default()
        }

        pub async fn model_results(&self, claim_id: ClaimId) -> Vec<ModelResult> {
            self.state
                .read()
                .await
                .model_results
                .get(&claim_id)
                .cloned()
                .unwrap_or_default()
        }

        /// Usage recorded for a claim that has not been approved yet
        pub async fn pending_usage_of(&self, claim_id: ClaimId) -> Vec<CoverageUsage> {
            self.state
                .read()
                .await
                .pending_usage
                .get(&claim_id)
                .cloned()
                .unwrap_or_default()
        }

        pub async fn fraud_audits(&self) -> Vec<(ClaimId, FraudAnalysis)> {
            self.state.read().await.fraud_audits.clone()
        }
    }

    fn matches(claim: &Claim, query: &HistoryQuery) -> bool {
        claim.customer_id == query.customer_id
            && query.exclude != Some(claim.id)
            && query.since.map_or(true, |since| claim.claim_date >= since)
            && query
                .diagnosis_code
                .as_ref()
                .map_or(true, |code| &claim.diagnosis_code == code)
            && query
                .hospital_name
                .as_ref()
                .map_or(true, |name| &claim.hospital_name == name)
            && (!query.weekend_admission_only
                || BusinessCalendar::is_weekend_admission(
                    claim.treatment_start_date,
                    claim.treatment_end_date,
                ))
    }

    impl DomainPort for MockClaimsBackend {}

    #[async_trait]
    impl HealthCheckable for MockClaimsBackend {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "mock-claims-backend".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("Mock adapter always healthy".to_string()),
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl PolicyPort for MockClaimsBackend {
        async fn get_policy_by_number(
            &self,
            policy_number: &str,
        ) -> Result<Option<(Policy, Customer)>, PortError> {
            let state = self.state.read().await;
            let found = state
                .policies
                .values()
                .find(|p| p.policy_number == policy_number)
                .and_then(|p| {
                    state
                        .customers
                        .get(&p.customer_id)
                        .map(|c| (p.clone(), c.clone()))
                });
            Ok(found)
        }

        async fn get_policy(&self, id: PolicyId) -> Result<Policy, PortError> {
            self.state
                .read()
                .await
                .policies
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Policy", id))
        }

        async fn get_customer(&self, id: CustomerId) -> Result<Customer, PortError> {
            self.state
                .read()
                .await
                .customers
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Customer", id))
        }

        async fn get_active_coverages(
            &self,
            policy_id: PolicyId,
        ) -> Result<Vec<PolicyCoverage>, PortError> {
            Ok(self
                .coverages_of(policy_id)
                .await
                .into_iter()
                .filter(|c| c.is_active)
                .collect())
        }
    }

    #[async_trait]
    impl ReferencePort for MockClaimsBackend {
        async fn get_diagnosis(&self, code: &str) -> Result<Option<DiagnosisInfo>, PortError> {
            Ok(self.state.read().await.diagnoses.get(code).cloned())
        }

        async fn get_surgery(&self, code: &str) -> Result<Option<SurgeryInfo>, PortError> {
            Ok(self.state.read().await.surgeries.get(code).cloned())
        }

        async fn get_policy_terms(&self, product_code: &str) -> Result<Vec<PolicyTerm>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .terms
                .get(product_code)
                .cloned()
                .unwrap_or_default())
        }

        async fn get_scoring_models(&self) -> Result<Vec<ScoringModel>, PortError> {
            Ok(self.state.read().await.models.clone())
        }
    }

    #[async_trait]
    impl ClaimHistoryPort for MockClaimsBackend {
        async fn count_claims(&self, query: &HistoryQuery) -> Result<u32, PortError> {
            let state = self.state.read().await;
            Ok(state.claims.values().filter(|c| matches(c, query)).count() as u32)
        }

        async fn find_duplicate(&self, key: &DuplicateKey) -> Result<Option<String>, PortError> {
            let state = self.state.read().await;
            Ok(state
                .claims
                .values()
                .find(|c| {
                    c.customer_id == key.customer_id
                        && key.exclude != Some(c.id)
                        && c.diagnosis_code == key.diagnosis_code
                        && c.hospital_name == key.hospital_name
                        && c.treatment_start_date == key.treatment_start_date
                })
                .map(|c| c.claim_number.clone()))
        }
    }

    #[async_trait]
    impl ClaimStore for MockClaimsBackend {
        async fn next_claim_number(&self, year: i32) -> Result<String, PortError> {
            let mut state = self.state.write().await;
            state.sequence += 1;
            Ok(format_claim_number(year, state.sequence))
        }

        async fn persist_adjudication(
            &self,
            record: AdjudicationRecord,
        ) -> Result<ClaimId, PortError> {
            let mut state = self.state.write().await;
            if state.fail_persist {
                return Err(PortError::connection("claim store unavailable"));
            }
            let claim = record.claim;
            let id = claim.id;
            if claim.status == ClaimStatus::Approved {
                if let Some(lines) = state.coverages.get_mut(&claim.policy_id) {
                    for usage in &record.usage {
                        if let Some(line) = lines.iter_mut().find(|l| l.id == usage.coverage_id) {
                            line.used_annual_amount += usage.amount;
                            line.used_days += usage.days;
                        }
                    }
                }
            } else if !record.usage.is_empty() {
                state.pending_usage.insert(id, record.usage);
            }
            state.model_results.insert(id, record.model_results);
            state.claims.insert(id, claim);
            Ok(id)
        }

        async fn get_claim(&self, id: ClaimId) -> Result<Claim, PortError> {
            self.state
                .read()
                .await
                .claims
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Claim", id))
        }

        async fn record_fraud_audit(
            &self,
            claim_id: ClaimId,
            analysis: &FraudAnalysis,
        ) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            let claim = state
                .claims
                .get_mut(&claim_id)
                .ok_or_else(|| PortError::not_found("Claim", claim_id))?;
            claim.fraud_score = analysis.score;
            claim.fraud_flags = analysis.pattern_codes();
            claim.fraud_check_passed = Some(analysis.passed());
            claim.updated_at = Utc::now();
            state.fraud_audits.push((claim_id, analysis.clone()));
            Ok(())
        }

        async fn refer_to_siu(&self, claim_id: ClaimId, reason: &str) -> Result<Claim, PortError> {
            let mut state = self.state.write().await;
            let claim = state
                .claims
                .get_mut(&claim_id)
                .ok_or_else(|| PortError::not_found("Claim", claim_id))?;
            let now = Utc::now();
            claim.status = ClaimStatus::SiuReferred;
            claim.siu_referral_reason = Some(reason.to_string());
            claim.siu_referred_at = Some(now);
            claim.updated_at = now;
            Ok(claim.clone())
        }
    }
}
