//! PostgreSQL Claims Adapter
//!
//! Backs both `ClaimStore` and `ClaimHistoryPort`. Claim numbers come from
//! the per-year `claim_number_sequences` counter, so two concurrent intakes
//! never receive the same number.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info, instrument};

use core_kernel::{ClaimId, DomainPort, HealthCheckResult, HealthCheckable, PortError};
use domain_claims::{
    format_claim_number, AdjudicationRecord, Claim, ClaimHistoryPort, ClaimStore, DuplicateKey,
    FraudAnalysis, HistoryQuery,
};

use super::check_pool;
use crate::repositories::ClaimRepository;

#[derive(Debug, Clone)]
pub struct PostgresClaimsAdapter {
    repository: ClaimRepository,
    pool: PgPool,
}

impl PostgresClaimsAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: ClaimRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn repository(&self) -> &ClaimRepository {
        &self.repository
    }
}

impl DomainPort for PostgresClaimsAdapter {}

#[async_trait]
impl HealthCheckable for PostgresClaimsAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        check_pool("postgres-claims-adapter", &self.pool).await
    }
}

#[async_trait]
impl ClaimHistoryPort for PostgresClaimsAdapter {
    #[instrument(skip(self, query), fields(customer_id = %query.customer_id))]
    async fn count_claims(&self, query: &HistoryQuery) -> Result<u32, PortError> {
        let count = self.repository.count_history(query).await?;
        u32::try_from(count).map_err(|_| PortError::corrupt(format!("claim count {count} out of range")))
    }

    #[instrument(skip(self, key), fields(customer_id = %key.customer_id))]
    async fn find_duplicate(&self, key: &DuplicateKey) -> Result<Option<String>, PortError> {
        Ok(self.repository.find_duplicate(key).await?)
    }
}

#[async_trait]
impl ClaimStore for PostgresClaimsAdapter {
    #[instrument(skip(self))]
    async fn next_claim_number(&self, year: i32) -> Result<String, PortError> {
        let sequence = self.repository.next_sequence(year).await?;
        let sequence = u64::try_from(sequence)
            .map_err(|_| PortError::corrupt(format!("claim sequence {sequence} is negative")))?;
        Ok(format_claim_number(year, sequence))
    }

    #[instrument(skip(self, record), fields(claim_number = %record.claim.claim_number))]
    async fn persist_adjudication(&self, record: AdjudicationRecord) -> Result<ClaimId, PortError> {
        self.repository.insert_adjudication(&record).await?;
        info!(
            claim_id = %record.claim.id,
            status = %record.claim.status,
            models = record.model_results.len(),
            "Adjudication persisted"
        );
        Ok(record.claim.id)
    }

    #[instrument(skip(self), fields(claim_id = %id))]
    async fn get_claim(&self, id: ClaimId) -> Result<Claim, PortError> {
        Ok(self.repository.get(*id.as_uuid()).await?.into_domain()?)
    }

    #[instrument(skip(self, analysis), fields(claim_id = %claim_id, score = analysis.score))]
    async fn record_fraud_audit(
        &self,
        claim_id: ClaimId,
        analysis: &FraudAnalysis,
    ) -> Result<(), PortError> {
        self.repository
            .insert_fraud_audit(*claim_id.as_uuid(), analysis)
            .await?;
        debug!("Fraud audit stored");
        Ok(())
    }

    #[instrument(skip(self, reason), fields(claim_id = %claim_id))]
    async fn refer_to_siu(&self, claim_id: ClaimId, reason: &str) -> Result<Claim, PortError> {
        Ok(self
            .repository
            .mark_siu_referred(*claim_id.as_uuid(), reason)
            .await?
            .into_domain()?)
    }
}
