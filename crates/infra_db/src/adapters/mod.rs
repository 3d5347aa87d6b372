//! Domain Adapters
//!
//! PostgreSQL implementations of the domain ports. Each adapter wraps a
//! repository, converts rows into domain types and translates
//! `DatabaseError` into `PortError`.
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresClaimsAdapter;
//! use domain_claims::ClaimStore;
//!
//! let adapter = PostgresClaimsAdapter::new(pool);
//! let claim = adapter.get_claim(claim_id).await?;
//! ```

pub mod policy;
pub mod reference;
pub mod claims;
pub mod approval;
pub mod audit;

pub use policy::PostgresPolicyAdapter;
pub use reference::PostgresReferenceAdapter;
pub use claims::PostgresClaimsAdapter;
pub use approval::PostgresApprovalAdapter;
pub use audit::PostgresAuditSink;

use core_kernel::HealthCheckResult;

use crate::pool::{ping, DatabasePool};

/// Runs `SELECT 1` against the pool and reports it under `adapter_id`
pub(crate) async fn check_pool(adapter_id: &str, pool: &DatabasePool) -> HealthCheckResult {
    let started = std::time::Instant::now();
    let outcome = ping(pool)
        .await
        .map_err(|e| format!("Database error: {e}"));
    HealthCheckResult::from_check(adapter_id, started, outcome)
}
