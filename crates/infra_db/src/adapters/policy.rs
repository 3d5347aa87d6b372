//! PostgreSQL Policy Adapter

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{CustomerId, DomainPort, HealthCheckResult, HealthCheckable, PolicyId, PortError};
use domain_claims::PolicyPort;
use domain_policy::{Customer, Policy, PolicyCoverage};

use super::check_pool;
use crate::repositories::PolicyRepository;

/// Read-only access to policies, customers and coverage lines
#[derive(Debug, Clone)]
pub struct PostgresPolicyAdapter {
    repository: PolicyRepository,
    pool: PgPool,
}

impl PostgresPolicyAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: PolicyRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresPolicyAdapter {}

#[async_trait]
impl HealthCheckable for PostgresPolicyAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        check_pool("postgres-policy-adapter", &self.pool).await
    }
}

#[async_trait]
impl PolicyPort for PostgresPolicyAdapter {
    #[instrument(skip(self))]
    async fn get_policy_by_number(
        &self,
        policy_number: &str,
    ) -> Result<Option<(Policy, Customer)>, PortError> {
        let Some(row) = self.repository.find_by_number(policy_number).await? else {
            debug!("Policy not found");
            return Ok(None);
        };
        let policy = row.into_domain()?;
        let customer = self
            .repository
            .get_customer(*policy.customer_id.as_uuid())
            .await?
            .into_domain()?;
        Ok(Some((policy, customer)))
    }

    #[instrument(skip(self), fields(policy_id = %id))]
    async fn get_policy(&self, id: PolicyId) -> Result<Policy, PortError> {
        Ok(self.repository.get(*id.as_uuid()).await?.into_domain()?)
    }

    #[instrument(skip(self), fields(customer_id = %id))]
    async fn get_customer(&self, id: CustomerId) -> Result<Customer, PortError> {
        Ok(self.repository.get_customer(*id.as_uuid()).await?.into_domain()?)
    }

    #[instrument(skip(self), fields(policy_id = %policy_id))]
    async fn get_active_coverages(
        &self,
        policy_id: PolicyId,
    ) -> Result<Vec<PolicyCoverage>, PortError> {
        let rows = self.repository.active_coverages(*policy_id.as_uuid()).await?;
        debug!(count = rows.len(), "Loaded coverages");
        rows.into_iter()
            .map(|row| row.into_domain().map_err(PortError::from))
            .collect()
    }
}
