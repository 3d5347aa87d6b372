//! Audit sink writing to `audit_logs`

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use core_kernel::{AuditEvent, AuditSink, DomainPort, PortError};

use crate::repositories::AuditRepository;

#[derive(Debug, Clone)]
pub struct PostgresAuditSink {
    repository: AuditRepository,
}

impl PostgresAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: AuditRepository::new(pool),
        }
    }
}

impl DomainPort for PostgresAuditSink {}

#[async_trait]
impl AuditSink for PostgresAuditSink {
    #[instrument(skip(self, event), fields(action = %event.action, entity_id = %event.entity_id))]
    async fn record(&self, event: AuditEvent) -> Result<(), PortError> {
        Ok(self.repository.insert(&event).await?)
    }
}
