//! Request and response bodies

pub mod approvals;
pub mod claims;
