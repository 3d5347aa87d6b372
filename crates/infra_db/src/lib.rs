//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the claims pipeline and the approval
//! workflow, built on SQLx.
//!
//! # Layout
//!
//! - [`pool`]: connection pool configuration and liveness check
//! - [`repositories`]: SQL per schema area, returning `FromRow` row types
//! - [`adapters`]: domain port implementations over the repositories
//!
//! Rows carry statuses as text codes and money as `NUMERIC`; conversion
//! into domain types rejects anything that does not parse as
//! `DatabaseError::CorruptRow`.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, DatabaseConfig, PostgresClaimsAdapter};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/claims")).await?;
//! let claims = PostgresClaimsAdapter::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{create_pool, ping, DatabaseConfig, DatabasePool};
pub use error::DatabaseError;
pub use adapters::{
    PostgresApprovalAdapter, PostgresAuditSink, PostgresClaimsAdapter, PostgresPolicyAdapter,
    PostgresReferenceAdapter,
};

/// Runs the embedded migrations against `pool`
pub async fn migrate(pool: &DatabasePool) -> Result<(), DatabaseError> {
    sqlx::migrate!("../../migrations")
        .run(pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed(format!("migration failed: {e}")))
}
