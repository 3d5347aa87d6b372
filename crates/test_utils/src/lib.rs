//! Test Utilities Crate
//!
//! Shared fixtures, builders and helpers for the claims and approval test
//! suites.
//!
//! # Modules
//!
//! - `fixtures`: fixed policies, coverage packages, reference data and approvers
//! - `builders`: submission and stored-claim builders
//! - `database`: testcontainer PostgreSQL with seeding helpers
//! - `assertions`: assertion helpers for claims and approvals
//! - `generators`: proptest strategies

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;

use once_cell::sync::Lazy;

static TRACING: Lazy<()> = Lazy::new(|| {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
});

/// Installs a test-writer subscriber once per process; honours `RUST_LOG`
pub fn init_test_tracing() {
    Lazy::force(&TRACING);
}
