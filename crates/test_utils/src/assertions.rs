//! Custom Test Assertions
//!
//! Assertion helpers with messages that name the claim or approval being
//! checked, so a failing scenario test points at the right record.

use core_kernel::Won;
use domain_approval::{ApprovalAction, ApprovalHistoryRecord, ApprovalInstance, ApprovalStatus};
use domain_claims::{Claim, ClaimStatus, FraudAnalysis};

/// Asserts two amounts are equal, printing both in grouped form
pub fn assert_won_eq(actual: Won, expected: Won) {
    assert_eq!(
        actual,
        expected,
        "amount mismatch: actual={}, expected={}",
        actual.grouped(),
        expected.grouped()
    );
}

/// Asserts a claim's status and that its totals stay consistent
///
/// Approved plus rejected never exceeds the claimed amount.
pub fn assert_claim_settled(claim: &Claim, expected: ClaimStatus) {
    assert_eq!(
        claim.status, expected,
        "claim {} expected status {}, got {}",
        claim.claim_number, expected, claim.status
    );
    assert!(
        claim.total_approved_amount + claim.total_rejected_amount <= claim.total_claimed_amount,
        "claim {} totals exceed claimed amount: approved={}, rejected={}, claimed={}",
        claim.claim_number,
        claim.total_approved_amount,
        claim.total_rejected_amount,
        claim.total_claimed_amount
    );
}

/// Asserts the fraud patterns detected, in any order
pub fn assert_patterns(analysis: &FraudAnalysis, expected: &[&str]) {
    let mut actual: Vec<_> = analysis.pattern_codes();
    actual.sort_unstable();
    let mut wanted: Vec<_> = expected.to_vec();
    wanted.sort_unstable();
    assert_eq!(
        actual, wanted,
        "fraud patterns mismatch (score {})",
        analysis.score
    );
}

/// Asserts an approval's status and step position
pub fn assert_approval_at(instance: &ApprovalInstance, status: ApprovalStatus, step: u32) {
    assert_eq!(
        (instance.status, instance.current_step),
        (status, step),
        "approval {} expected {} at step {}, got {} at step {}",
        instance.id,
        status,
        step,
        instance.status,
        instance.current_step
    );
}

/// Asserts the sequence of actions recorded in an approval history
pub fn assert_history_actions(history: &[ApprovalHistoryRecord], expected: &[ApprovalAction]) {
    let actual: Vec<_> = history.iter().map(|h| h.action).collect();
    assert_eq!(actual, expected, "approval history actions mismatch");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_won_eq_passes() {
        assert_won_eq(Won::from_i64(1_000), Won::from_i64(1_000));
    }

    #[test]
    #[should_panic(expected = "amount mismatch")]
    fn test_won_eq_reports_mismatch() {
        assert_won_eq(Won::from_i64(1_000), Won::from_i64(2_000));
    }

    #[test]
    fn test_history_actions_empty() {
        assert_history_actions(&[], &[]);
    }
}
