//! PostgreSQL Reference Data Adapter

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use core_kernel::{DomainPort, PortError};
use domain_claims::{ReferencePort, ScoringModel};
use domain_policy::{DiagnosisInfo, PolicyTerm, SurgeryInfo};

use crate::repositories::ReferenceRepository;

#[derive(Debug, Clone)]
pub struct PostgresReferenceAdapter {
    repository: ReferenceRepository,
}

impl PostgresReferenceAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: ReferenceRepository::new(pool),
        }
    }
}

impl DomainPort for PostgresReferenceAdapter {}

#[async_trait]
impl ReferencePort for PostgresReferenceAdapter {
    #[instrument(skip(self))]
    async fn get_diagnosis(&self, code: &str) -> Result<Option<DiagnosisInfo>, PortError> {
        match self.repository.find_diagnosis(code).await? {
            Some(row) => Ok(Some(row.into_domain()?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn get_surgery(&self, code: &str) -> Result<Option<SurgeryInfo>, PortError> {
        match self.repository.find_surgery(code).await? {
            Some(row) => Ok(Some(row.into_domain()?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn get_policy_terms(&self, product_code: &str) -> Result<Vec<PolicyTerm>, PortError> {
        self.repository
            .terms_for_product(product_code)
            .await?
            .into_iter()
            .map(|row| row.into_domain().map_err(PortError::from))
            .collect()
    }

    #[instrument(skip(self))]
    async fn get_scoring_models(&self) -> Result<Vec<ScoringModel>, PortError> {
        self.repository
            .active_models()
            .await?
            .into_iter()
            .map(|row| row.into_domain().map_err(PortError::from))
            .collect()
    }
}
