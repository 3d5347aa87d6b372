//! Route handlers

pub mod approvals;
pub mod claims;
pub mod health;
