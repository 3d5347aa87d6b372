//! Approval Domain Ports
//!
//! The engine plans every state change up front and hands the store a
//! single plan to apply atomically. Stores enforce first-actor-wins: the
//! acting inbox entry must still be pending and the instance version must
//! be unchanged, otherwise the plan is refused with `PortError::Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use core_kernel::{
    ApprovalId, ClaimId, DomainPort, HealthCheckable, InboxEntryId, PortError, UserId, Won,
};
use domain_claims::ClaimType;

use crate::template::ApprovalTemplate;
use crate::workflow::{
    ApprovalHistoryRecord, ApprovalInstance, Approver, ClaimSummary, InboxEntry, InboxFilter,
    InboxPage,
};

#[async_trait]
pub trait TemplatePort: DomainPort {
    /// Highest-priority active template matching the claim
    async fn find_matching_template(
        &self,
        claim_type: ClaimType,
        amount: Won,
        fraud_score: u8,
    ) -> Result<Option<ApprovalTemplate>, PortError>;

    /// Active templates ordered by priority then code
    async fn list_templates(&self) -> Result<Vec<ApprovalTemplate>, PortError>;
}

/// Users and their roles
#[async_trait]
pub trait ApproverDirectory: DomainPort {
    async fn get_active_users_by_role(&self, role_code: &str) -> Result<Vec<Approver>, PortError>;

    async fn get_user(&self, id: UserId) -> Result<Option<Approver>, PortError>;
}

/// New instance with its first-step assignments
#[derive(Debug, Clone)]
pub struct StartPlan {
    pub instance: ApprovalInstance,
    pub entries: Vec<InboxEntry>,
    pub current_approver: UserId,
}

/// Terminal result of an approval
#[derive(Debug, Clone, PartialEq)]
pub enum FinalOutcome {
    Approved { amount: Won, by: UserId },
    Rejected { reason: Option<String> },
    Returned { reason: Option<String> },
}

#[derive(Debug, Clone)]
pub enum ActionEffect {
    Complete(FinalOutcome),
    /// Move to `next_step` and broadcast it to `entries`
    Advance {
        next_step: u32,
        entries: Vec<InboxEntry>,
        current_approver: UserId,
    },
    /// Flag the claim; the actor's entry stays pending
    Hold { reason: Option<String> },
    /// Hand the actor's assignment to another user at the same step.
    /// `entry` is `None` when the delegate already holds a pending entry.
    Delegate {
        delegate: UserId,
        entry: Option<InboxEntry>,
    },
}

/// One approver action, applied atomically
#[derive(Debug, Clone)]
pub struct ActionPlan {
    pub approval_id: ApprovalId,
    pub expected_version: i64,
    pub step_no: u32,
    pub actor_entry: InboxEntryId,
    pub actor: UserId,
    pub history: ApprovalHistoryRecord,
    pub effect: ActionEffect,
}

#[derive(Debug, Clone)]
pub struct CancelPlan {
    pub approval_id: ApprovalId,
    pub expected_version: i64,
    pub reason: Option<String>,
    pub cancelled_at: DateTime<Utc>,
}

/// Approval persistence
#[async_trait]
pub trait ApprovalStore: DomainPort + HealthCheckable {
    async fn get_claim_summary(&self, claim_id: ClaimId) -> Result<Option<ClaimSummary>, PortError>;

    /// PENDING or IN_PROGRESS instance of a claim
    async fn find_active_instance(
        &self,
        claim_id: ClaimId,
    ) -> Result<Option<ApprovalInstance>, PortError>;

    async fn get_instance(&self, id: ApprovalId) -> Result<Option<ApprovalInstance>, PortError>;

    async fn find_pending_entry(
        &self,
        approval_id: ApprovalId,
        user_id: UserId,
        step_no: u32,
    ) -> Result<Option<InboxEntry>, PortError>;

    /// Creates the instance, its inbox entries and moves the claim to review.
    /// Fails with `Conflict` if another active instance appeared meanwhile.
    async fn start(&self, plan: StartPlan) -> Result<ApprovalInstance, PortError>;

    /// Approves the claim on behalf of the system
    async fn auto_approve(&self, claim_id: ClaimId, amount: Won) -> Result<(), PortError>;

    async fn apply(&self, plan: ActionPlan) -> Result<ApprovalInstance, PortError>;

    async fn cancel(&self, plan: CancelPlan) -> Result<ApprovalInstance, PortError>;

    async fn inbox(&self, user_id: UserId, filter: &InboxFilter) -> Result<InboxPage, PortError>;

    async fn pending_count(&self, user_id: UserId) -> Result<u64, PortError>;

    /// History of an instance, oldest first
    async fn history(&self, approval_id: ApprovalId)
        -> Result<Vec<ApprovalHistoryRecord>, PortError>;

    /// Most recently created instance of a claim
    async fn latest_for_claim(&self, claim_id: ClaimId)
        -> Result<Option<ApprovalInstance>, PortError>;
}

/// In-memory implementation of the approval ports for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use core_kernel::{AdapterHealth, CustomerId, HealthCheckResult};
    use domain_claims::{
        scale_usage, Claim, ClaimApprovalStatus, ClaimStatus, CoverageUsage, HoldStatus,
    };

    use crate::template::select_template;
    use crate::workflow::{ApprovalStatus, InboxItem, InboxStatus};

    #[derive(Debug, Default)]
    struct State {
        claims: HashMap<ClaimId, Claim>,
        customer_names: HashMap<CustomerId, String>,
        templates: Vec<ApprovalTemplate>,
        users: HashMap<UserId, Approver>,
        instances: HashMap<ApprovalId, ApprovalInstance>,
        entries: Vec<InboxEntry>,
        history: Vec<ApprovalHistoryRecord>,
        pending_usage: HashMap<ClaimId, Vec<CoverageUsage>>,
        consumed_usage: HashMap<ClaimId, Vec<CoverageUsage>>,
    }

    impl State {
        fn claim_mut(&mut self, id: ClaimId) -> Result<&mut Claim, PortError> {
            self.claims
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("Claim", id))
        }

        fn supersede_pending(&mut self, approval_id: ApprovalId, now: DateTime<Utc>) {
            for entry in self
                .entries
                .iter_mut()
                .filter(|e| e.approval_id == approval_id && e.status == InboxStatus::Pending)
            {
                entry.status = InboxStatus::Superseded;
                entry.completed_at = Some(now);
            }
        }

        /// Consumes the claim's recorded usage; call before the approved
        /// total is overwritten
        fn consume_usage(&mut self, claim_id: ClaimId, approved: Won) -> Result<(), PortError> {
            let adjudicated = self.claim_mut(claim_id)?.total_approved_amount;
            if let Some(usage) = self.pending_usage.remove(&claim_id) {
                let consumed = scale_usage(&usage, adjudicated, approved);
                self.consumed_usage.insert(claim_id, consumed);
            }
            Ok(())
        }
    }

    /// Shared in-memory backend implementing every approval port
    #[derive(Debug, Default, Clone)]
    pub struct MockApprovalBackend {
        state: Arc<RwLock<State>>,
    }

    impl MockApprovalBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn add_claim(&self, claim: Claim, customer_name: &str) {
            let mut state = self.state.write().await;
            state
                .customer_names
                .insert(claim.customer_id, customer_name.to_string());
            state.claims.insert(claim.id, claim);
        }

        /// Coverage usage recorded when the claim was adjudicated
        pub async fn add_claim_usage(&self, claim_id: ClaimId, usage: Vec<CoverageUsage>) {
            self.state.write().await.pending_usage.insert(claim_id, usage);
        }

        /// Usage consumed when the claim was approved
        pub async fn consumed_usage_of(&self, claim_id: ClaimId) -> Vec<CoverageUsage> {
            self.state
                .read()
                .await
                .consumed_usage
                .get(&claim_id)
                .cloned()
                .unwrap_or_default()
        }

        pub async fn add_template(&self, template: ApprovalTemplate) {
            self.state.write().await.templates.push(template);
        }

        pub async fn add_user(&self, user: Approver) {
            self.state.write().await.users.insert(user.id, user);
        }

        pub async fn claim(&self, id: ClaimId) -> Option<Claim> {
            self.state.read().await.claims.get(&id).cloned()
        }

        pub async fn entries_of(&self, approval_id: ApprovalId) -> Vec<InboxEntry> {
            self.state
                .read()
                .await
                .entries
                .iter()
                .filter(|e| e.approval_id == approval_id)
                .cloned()
                .collect()
        }

        pub async fn instance_count(&self) -> usize {
            self.state.read().await.instances.len()
        }
    }

    impl DomainPort for MockApprovalBackend {}

    #[async_trait]
    impl HealthCheckable for MockApprovalBackend {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "mock-approval-backend".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("Mock adapter always healthy".to_string()),
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl TemplatePort for MockApprovalBackend {
        async fn find_matching_template(
            &self,
            claim_type: ClaimType,
            amount: Won,
            fraud_score: u8,
        ) -> Result<Option<ApprovalTemplate>, PortError> {
            let state = self.state.read().await;
            Ok(select_template(&state.templates, claim_type, amount, fraud_score).cloned())
        }

        async fn list_templates(&self) -> Result<Vec<ApprovalTemplate>, PortError> {
            let mut templates: Vec<_> = self
                .state
                .read()
                .await
                .templates
                .iter()
                .filter(|t| t.is_active)
                .cloned()
                .collect();
            templates.sort_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then_with(|| a.template_code.cmp(&b.template_code))
            });
            Ok(templates)
        }
    }

    #[async_trait]
    impl ApproverDirectory for MockApprovalBackend {
        async fn get_active_users_by_role(
            &self,
            role_code: &str,
        ) -> Result<Vec<Approver>, PortError> {
            let mut users: Vec<_> = self
                .state
                .read()
                .await
                .users
                .values()
                .filter(|u| u.is_active && u.role_code == role_code)
                .cloned()
                .collect();
            users.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(users)
        }

        async fn get_user(&self, id: UserId) -> Result<Option<Approver>, PortError> {
            Ok(self.state.read().await.users.get(&id).cloned())
        }
    }

    #[async_trait]
    impl ApprovalStore for MockApprovalBackend {
        async fn get_claim_summary(
            &self,
            claim_id: ClaimId,
        ) -> Result<Option<ClaimSummary>, PortError> {
            Ok(self.state.read().await.claims.get(&claim_id).map(|c| ClaimSummary {
                id: c.id,
                claim_number: c.claim_number.clone(),
                claim_type: c.claim_type,
                status: c.status,
                total_claimed_amount: c.total_claimed_amount,
                total_approved_amount: c.total_approved_amount,
                fraud_score: c.fraud_score,
            }))
        }

        async fn find_active_instance(
            &self,
            claim_id: ClaimId,
        ) -> Result<Option<ApprovalInstance>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .instances
                .values()
                .find(|i| i.claim_id == claim_id && i.status.is_active())
                .cloned())
        }

        async fn get_instance(&self, id: ApprovalId) -> Result<Option<ApprovalInstance>, PortError> {
            Ok(self.state.read().await.instances.get(&id).cloned())
        }

        async fn find_pending_entry(
            &self,
            approval_id: ApprovalId,
            user_id: UserId,
            step_no: u32,
        ) -> Result<Option<InboxEntry>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .entries
                .iter()
                .find(|e| {
                    e.approval_id == approval_id
                        && e.user_id == user_id
                        && e.step_no == step_no
                        && e.status == InboxStatus::Pending
                })
                .cloned())
        }

        async fn start(&self, plan: StartPlan) -> Result<ApprovalInstance, PortError> {
            let mut state = self.state.write().await;
            let claim_id = plan.instance.claim_id;
            if state
                .instances
                .values()
                .any(|i| i.claim_id == claim_id && i.status.is_active())
            {
                return Err(PortError::conflict(format!(
                    "claim {claim_id} already has an active approval"
                )));
            }
            let claim = state.claim_mut(claim_id)?;
            claim.status = ClaimStatus::PendingReview;
            claim.approval_status = Some(ClaimApprovalStatus::InProgress);
            claim.current_approver_id = Some(plan.current_approver);
            claim.updated_at = Utc::now();

            state.entries.extend(plan.entries);
            state.instances.insert(plan.instance.id, plan.instance.clone());
            Ok(plan.instance)
        }

        async fn auto_approve(&self, claim_id: ClaimId, amount: Won) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            state.consume_usage(claim_id, amount)?;
            let claim = state.claim_mut(claim_id)?;
            let now = Utc::now();
            claim.status = ClaimStatus::Approved;
            claim.approval_status = Some(ClaimApprovalStatus::Approved);
            claim.total_approved_amount = amount;
            claim.total_rejected_amount = claim.total_claimed_amount.saturating_sub(amount);
            claim.approved_by = Some(UserId::system());
            claim.approved_at = Some(now);
            claim.updated_at = now;
            Ok(())
        }

        async fn apply(&self, plan: ActionPlan) -> Result<ApprovalInstance, PortError> {
            let mut state = self.state.write().await;
            let now = plan.history.decided_at;

            let instance = state
                .instances
                .get(&plan.approval_id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Approval", plan.approval_id))?;
            if instance.version != plan.expected_version
                || instance.current_step != plan.step_no
                || instance.status != ApprovalStatus::InProgress
            {
                return Err(PortError::conflict("approval changed concurrently"));
            }

            let entry_pending = state
                .entries
                .iter()
                .any(|e| e.id == plan.actor_entry && e.status == InboxStatus::Pending);
            if !entry_pending {
                return Err(PortError::conflict("inbox entry already processed"));
            }

            let claim_id = instance.claim_id;
            // Validate the claim exists before touching anything else
            state.claim_mut(claim_id)?;

            if !matches!(plan.effect, ActionEffect::Hold { .. }) {
                if let Some(entry) = state.entries.iter_mut().find(|e| e.id == plan.actor_entry) {
                    entry.status = InboxStatus::Completed;
                    entry.completed_at = Some(now);
                }
            }
            state.history.push(plan.history);

            let mut updated = instance;
            match plan.effect {
                ActionEffect::Complete(outcome) => {
                    state.supersede_pending(plan.approval_id, now);
                    if let FinalOutcome::Approved { amount, .. } = &outcome {
                        state.consume_usage(claim_id, *amount)?;
                    }
                    let claim = state.claim_mut(claim_id)?;
                    claim.current_approver_id = None;
                    claim.updated_at = now;
                    match outcome {
                        FinalOutcome::Approved { amount, by } => {
                            updated.status = ApprovalStatus::Approved;
                            claim.status = ClaimStatus::Approved;
                            claim.approval_status = Some(ClaimApprovalStatus::Approved);
                            claim.total_approved_amount = amount;
                            claim.total_rejected_amount =
                                claim.total_claimed_amount.saturating_sub(amount);
                            claim.approved_by = Some(by);
                            claim.approved_at = Some(now);
                        }
                        FinalOutcome::Rejected { reason } => {
                            updated.status = ApprovalStatus::Rejected;
                            claim.status = ClaimStatus::Rejected;
                            claim.approval_status = Some(ClaimApprovalStatus::Rejected);
                            claim.decision_reason = reason;
                        }
                        FinalOutcome::Returned { reason } => {
                            updated.status = ApprovalStatus::Returned;
                            claim.status = ClaimStatus::Returned;
                            claim.approval_status = Some(ClaimApprovalStatus::Returned);
                            claim.decision_reason = reason;
                        }
                    }
                    updated.completed_at = Some(now);
                    updated.version += 1;
                    updated.updated_at = now;
                }
                ActionEffect::Advance {
                    next_step,
                    entries,
                    current_approver,
                } => {
                    state.supersede_pending(plan.approval_id, now);
                    state.entries.extend(entries);
                    let claim = state.claim_mut(claim_id)?;
                    claim.current_approver_id = Some(current_approver);
                    claim.updated_at = now;
                    updated.current_step = next_step;
                    updated.version += 1;
                    updated.updated_at = now;
                }
                ActionEffect::Hold { reason } => {
                    let claim = state.claim_mut(claim_id)?;
                    claim.hold_status = HoldStatus::OnHold;
                    claim.hold_reason = reason;
                    claim.updated_at = now;
                }
                ActionEffect::Delegate { delegate, entry } => {
                    let claim = state.claim_mut(claim_id)?;
                    claim.current_approver_id = Some(delegate);
                    claim.updated_at = now;
                    state.entries.extend(entry);
                }
            }

            state.instances.insert(updated.id, updated.clone());
            Ok(updated)
        }

        async fn cancel(&self, plan: CancelPlan) -> Result<ApprovalInstance, PortError> {
            let mut state = self.state.write().await;
            let mut instance = state
                .instances
                .get(&plan.approval_id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Approval", plan.approval_id))?;
            if instance.version != plan.expected_version || !instance.status.is_active() {
                return Err(PortError::conflict("approval changed concurrently"));
            }
            let now = plan.cancelled_at;
            state.supersede_pending(plan.approval_id, now);

            let claim = state.claim_mut(instance.claim_id)?;
            claim.approval_status = Some(ClaimApprovalStatus::Cancelled);
            claim.current_approver_id = None;
            claim.updated_at = now;

            instance.status = ApprovalStatus::Cancelled;
            instance.notes = plan.reason.or(instance.notes);
            instance.completed_at = Some(now);
            instance.updated_at = now;
            instance.version += 1;
            state.instances.insert(instance.id, instance.clone());
            Ok(instance)
        }

        async fn inbox(&self, user_id: UserId, filter: &InboxFilter) -> Result<InboxPage, PortError> {
            let state = self.state.read().await;
            let mut items: Vec<InboxItem> = state
                .entries
                .iter()
                .filter(|e| e.user_id == user_id)
                .filter(|e| filter.status.map_or(true, |s| e.status == s))
                .filter_map(|e| {
                    let instance = state.instances.get(&e.approval_id)?;
                    let claim = state.claims.get(&e.claim_id)?;
                    Some(InboxItem {
                        entry_id: e.id,
                        step_no: e.step_no,
                        entry_status: e.status,
                        assigned_at: e.assigned_at,
                        approval_id: instance.id,
                        approval_status: instance.status,
                        current_step: instance.current_step,
                        total_steps: instance.total_steps,
                        is_urgent: instance.is_urgent,
                        claim_id: claim.id,
                        claim_number: claim.claim_number.clone(),
                        claim_type: claim.claim_type,
                        total_claimed_amount: claim.total_claimed_amount,
                        diagnosis_name: claim.diagnosis_name.clone(),
                        fraud_score: claim.fraud_score,
                        customer_name: state
                            .customer_names
                            .get(&claim.customer_id)
                            .cloned()
                            .unwrap_or_default(),
                    })
                })
                .filter(|item| !filter.urgent_only || item.is_urgent)
                .collect();
            items.sort_by(|a, b| {
                b.is_urgent
                    .cmp(&a.is_urgent)
                    .then_with(|| a.assigned_at.cmp(&b.assigned_at))
            });
            let total = items.len() as u64;
            let items = items
                .into_iter()
                .skip(filter.offset() as usize)
                .take(filter.limit as usize)
                .collect();
            Ok(InboxPage { items, total })
        }

        async fn pending_count(&self, user_id: UserId) -> Result<u64, PortError> {
            Ok(self
                .state
                .read()
                .await
                .entries
                .iter()
                .filter(|e| e.user_id == user_id && e.status == InboxStatus::Pending)
                .count() as u64)
        }

        async fn history(
            &self,
            approval_id: ApprovalId,
        ) -> Result<Vec<ApprovalHistoryRecord>, PortError> {
            let mut records: Vec<_> = self
                .state
                .read()
                .await
                .history
                .iter()
                .filter(|h| h.approval_id == approval_id)
                .cloned()
                .collect();
            records.sort_by_key(|h| h.decided_at);
            Ok(records)
        }

        async fn latest_for_claim(
            &self,
            claim_id: ClaimId,
        ) -> Result<Option<ApprovalInstance>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .instances
                .values()
                .filter(|i| i.claim_id == claim_id)
                .max_by_key(|i| i.created_at)
                .cloned())
        }
    }
}
