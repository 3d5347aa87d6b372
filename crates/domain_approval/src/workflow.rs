//! Approval instances, inbox entries and history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{
    code_enum, ApprovalId, ClaimId, HistoryId, InboxEntryId, TemplateId, UserId, Won,
};
use domain_claims::{ClaimStatus, ClaimType};

use crate::template::{ApprovalStep, ApprovalTemplate};

code_enum! {
    /// Lifecycle of an approval instance
    pub enum ApprovalStatus {
        Pending => "PENDING",
        InProgress => "IN_PROGRESS",
        Approved => "APPROVED",
        Rejected => "REJECTED",
        Returned => "RETURNED",
        Cancelled => "CANCELLED",
    }
}

code_enum! {
    pub enum InboxStatus {
        Pending => "PENDING",
        Completed => "COMPLETED",
        /// Another candidate acted on the step first
        Superseded => "SUPERSEDED",
    }
}

code_enum! {
    /// What an approver does with a pending step
    pub enum ApprovalAction {
        Approve => "APPROVE",
        Reject => "REJECT",
        Return => "RETURN",
        Hold => "HOLD",
        Delegate => "DELEGATE",
        Skip => "SKIP",
    }
}

code_enum! {
    pub enum Urgency {
        Normal => "NORMAL",
        Urgent => "URGENT",
    }
}

impl ApprovalStatus {
    /// PENDING and IN_PROGRESS instances block a new start for the claim
    pub fn is_active(&self) -> bool {
        matches!(self, ApprovalStatus::Pending | ApprovalStatus::InProgress)
    }
}

impl Default for Urgency {
    fn default() -> Self {
        Urgency::Normal
    }
}

/// A running or finished approval of one claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalInstance {
    pub id: ApprovalId,
    pub claim_id: ClaimId,
    pub template_id: TemplateId,
    pub status: ApprovalStatus,
    /// 1-based
    pub current_step: u32,
    pub total_steps: u32,
    /// Snapshot of the template's steps at start
    pub approval_line: Vec<ApprovalStep>,
    pub is_urgent: bool,
    pub notes: Option<String>,
    pub initiated_by: UserId,
    /// Bumped on every state change; used for optimistic checks
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ApprovalInstance {
    pub fn start(
        claim_id: ClaimId,
        template: &ApprovalTemplate,
        initiated_by: UserId,
        urgency: Urgency,
        notes: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ApprovalId::new_v7(),
            claim_id,
            template_id: template.id,
            status: ApprovalStatus::InProgress,
            current_step: 1,
            total_steps: template.total_steps(),
            approval_line: template.steps.clone(),
            is_urgent: urgency == Urgency::Urgent,
            notes,
            initiated_by,
            version: 1,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Step definition by 1-based number
    pub fn step(&self, number: u32) -> Option<&ApprovalStep> {
        number
            .checked_sub(1)
            .and_then(|i| self.approval_line.get(i as usize))
    }

    pub fn current(&self) -> Option<&ApprovalStep> {
        self.step(self.current_step)
    }

    pub fn is_final_step(&self) -> bool {
        self.current_step >= self.total_steps
    }
}

/// One candidate's assignment to a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxEntry {
    pub id: InboxEntryId,
    pub approval_id: ApprovalId,
    pub claim_id: ClaimId,
    pub user_id: UserId,
    pub step_no: u32,
    pub status: InboxStatus,
    pub assigned_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl InboxEntry {
    pub fn assign(approval_id: ApprovalId, claim_id: ClaimId, user_id: UserId, step_no: u32) -> Self {
        Self {
            id: InboxEntryId::new_v7(),
            approval_id,
            claim_id,
            user_id,
            step_no,
            status: InboxStatus::Pending,
            assigned_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// Immutable record of one approver action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalHistoryRecord {
    pub id: HistoryId,
    pub approval_id: ApprovalId,
    pub claim_id: ClaimId,
    pub step_no: u32,
    pub step_name: String,
    pub approver_id: UserId,
    pub approver_name: String,
    pub approver_role: String,
    pub approver_department: Option<String>,
    pub action: ApprovalAction,
    pub adjusted_amount: Option<Won>,
    pub comment: Option<String>,
    pub received_at: DateTime<Utc>,
    pub decided_at: DateTime<Utc>,
    /// Whole minutes between assignment and decision
    pub processing_minutes: i64,
}

/// Directory view of a user who may approve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approver {
    pub id: UserId,
    pub name: String,
    pub department: Option<String>,
    pub role_code: String,
    pub is_active: bool,
}

/// Claim facts the workflow reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimSummary {
    pub id: ClaimId,
    pub claim_number: String,
    pub claim_type: ClaimType,
    pub status: ClaimStatus,
    pub total_claimed_amount: Won,
    pub total_approved_amount: Won,
    pub fraud_score: u8,
}

impl ClaimSummary {
    /// Amount approved by an automatic sign-off
    pub fn auto_approved_amount(&self) -> Won {
        if self.total_approved_amount.is_positive() {
            self.total_approved_amount
        } else {
            self.total_claimed_amount
        }
    }
}

/// Inbox row joined with its approval and claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxItem {
    pub entry_id: InboxEntryId,
    pub step_no: u32,
    pub entry_status: InboxStatus,
    pub assigned_at: DateTime<Utc>,
    pub approval_id: ApprovalId,
    pub approval_status: ApprovalStatus,
    pub current_step: u32,
    pub total_steps: u32,
    pub is_urgent: bool,
    pub claim_id: ClaimId,
    pub claim_number: String,
    pub claim_type: ClaimType,
    pub total_claimed_amount: Won,
    pub diagnosis_name: Option<String>,
    pub fraud_score: u8,
    pub customer_name: String,
}

/// Inbox query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxFilter {
    pub status: Option<InboxStatus>,
    pub urgent_only: bool,
    /// 1-based
    pub page: u32,
    pub limit: u32,
}

impl Default for InboxFilter {
    fn default() -> Self {
        Self {
            status: None,
            urgent_only: false,
            page: 1,
            limit: 20,
        }
    }
}

impl InboxFilter {
    pub fn offset(&self) -> u32 {
        self.page.max(1).saturating_sub(1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxPage {
    pub items: Vec<InboxItem>,
    pub total: u64,
}

/// Latest approval of a claim together with its history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalStatusView {
    pub instance: ApprovalInstance,
    pub history: Vec<ApprovalHistoryRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(steps: &[&str]) -> ApprovalTemplate {
        ApprovalTemplate {
            id: TemplateId::new(),
            template_code: "STANDARD".into(),
            template_name: "Standard".into(),
            description: None,
            claim_type: None,
            min_amount: None,
            max_amount: None,
            fraud_score_threshold: None,
            steps: steps
                .iter()
                .enumerate()
                .map(|(i, role)| ApprovalStep {
                    step: i as u32 + 1,
                    role_code: role.to_string(),
                    step_name: format!("{role} review"),
                })
                .collect(),
            priority: 10,
            is_active: true,
        }
    }

    #[test]
    fn test_start_snapshots_template() {
        let t = template(&["TEAM_LEAD", "DEPT_HEAD"]);
        let instance = ApprovalInstance::start(ClaimId::new(), &t, UserId::new(), Urgency::Urgent, None);
        assert_eq!(instance.status, ApprovalStatus::InProgress);
        assert_eq!(instance.total_steps, 2);
        assert!(instance.is_urgent);
        assert_eq!(instance.current().unwrap().role_code, "TEAM_LEAD");
        assert!(!instance.is_final_step());
        assert!(instance.step(0).is_none());
    }

    #[test]
    fn test_active_statuses() {
        assert!(ApprovalStatus::Pending.is_active());
        assert!(ApprovalStatus::InProgress.is_active());
        assert!(!ApprovalStatus::Cancelled.is_active());
    }

    #[test]
    fn test_auto_approved_amount_falls_back_to_claimed() {
        let mut summary = ClaimSummary {
            id: ClaimId::new(),
            claim_number: "CLM-2024-00001".into(),
            claim_type: ClaimType::Outpatient,
            status: ClaimStatus::PendingReview,
            total_claimed_amount: Won::from_i64(80_000),
            total_approved_amount: Won::ZERO,
            fraud_score: 0,
        };
        assert_eq!(summary.auto_approved_amount(), Won::from_i64(80_000));
        summary.total_approved_amount = Won::from_i64(60_000);
        assert_eq!(summary.auto_approved_amount(), Won::from_i64(60_000));
    }

    #[test]
    fn test_inbox_offset() {
        let filter = InboxFilter { page: 3, limit: 20, ..InboxFilter::default() };
        assert_eq!(filter.offset(), 40);
        let first = InboxFilter { page: 0, ..InboxFilter::default() };
        assert_eq!(first.offset(), 0);
    }
}
