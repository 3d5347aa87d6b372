//! Audit log writes

use sqlx::PgPool;

use core_kernel::AuditEvent;

use crate::error::DatabaseError;

#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, event: &AuditEvent) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs
                (id, actor_id, action, entity_type, entity_id, before_value, after_value, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(event.actor.as_uuid())
        .bind(&event.action)
        .bind(&event.entity_type)
        .bind(&event.entity_id)
        .bind(&event.before)
        .bind(&event.after)
        .bind(event.recorded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
