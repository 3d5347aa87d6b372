//! Approval workflow engine
//!
//! Routes claims that need a human decision through a multi-step approval
//! line. Each step is broadcast to every active holder of the step's role;
//! the first of them to act decides the step and the other assignments are
//! superseded.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use core_kernel::{
    audit::record_quietly, ApprovalId, AuditEvent, AuditSink, ClaimId, HistoryId, UserId, Won,
};

use crate::error::ApprovalError;
use crate::ports::{
    ActionEffect, ActionPlan, ApprovalStore, ApproverDirectory, CancelPlan, FinalOutcome,
    StartPlan, TemplatePort,
};
use crate::template::{ApprovalStep, ApprovalTemplate};
use crate::workflow::{
    ApprovalAction, ApprovalHistoryRecord, ApprovalInstance, ApprovalStatus, ApprovalStatusView,
    Approver, InboxEntry, InboxFilter, InboxPage, Urgency,
};

/// Role level from which any active approval may be cancelled
pub const CANCEL_OVERRIDE_LEVEL: u8 = 4;

const MAX_INBOX_PAGE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartRequest {
    pub claim_id: ClaimId,
    pub initiated_by: UserId,
    #[serde(default)]
    pub urgency: Urgency,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StartOutcome {
    /// The matching template needs no human step
    AutoApproved { claim_id: ClaimId, approved_amount: Won },
    Started { instance: ApprovalInstance },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub approval_id: ApprovalId,
    pub actor: UserId,
    pub action: ApprovalAction,
    pub comments: Option<String>,
    pub adjusted_amount: Option<Won>,
    pub delegate_to: Option<UserId>,
}

pub struct ApprovalEngine {
    templates: Arc<dyn TemplatePort>,
    directory: Arc<dyn ApproverDirectory>,
    store: Arc<dyn ApprovalStore>,
    audit: Arc<dyn AuditSink>,
}

impl ApprovalEngine {
    pub fn new(
        templates: Arc<dyn TemplatePort>,
        directory: Arc<dyn ApproverDirectory>,
        store: Arc<dyn ApprovalStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            templates,
            directory,
            store,
            audit,
        }
    }

    /// Starts the approval of a claim, or approves it outright when the
    /// matching template says so
    #[instrument(skip(self, request), fields(claim_id = %request.claim_id))]
    pub async fn start(&self, request: StartRequest) -> Result<StartOutcome, ApprovalError> {
        let claim = self
            .store
            .get_claim_summary(request.claim_id)
            .await?
            .ok_or(ApprovalError::ClaimNotFound(request.claim_id))?;

        if self.store.find_active_instance(claim.id).await?.is_some() {
            return Err(ApprovalError::DuplicateWorkflow(claim.id));
        }

        let template = self
            .templates
            .find_matching_template(claim.claim_type, claim.total_claimed_amount, claim.fraud_score)
            .await?
            .ok_or(ApprovalError::NoApplicableTemplate)?;

        if template.is_auto_approve() {
            let amount = claim.auto_approved_amount();
            self.store.auto_approve(claim.id, amount).await?;
            info!(claim_number = %claim.claim_number, amount = %amount, "claim auto-approved");

            let event = AuditEvent::new(UserId::system(), "AUTO_APPROVE", "claim", claim.id)
                .with_before(json!({ "status": claim.status.as_str() }))
                .with_after(json!({
                    "status": "APPROVED",
                    "approved_amount": amount,
                    "template": template.template_code,
                }));
            record_quietly(self.audit.as_ref(), event).await;

            return Ok(StartOutcome::AutoApproved {
                claim_id: claim.id,
                approved_amount: amount,
            });
        }

        let Some(first) = template.steps.first() else {
            warn!(template = %template.template_code, "approval template has no steps");
            return Err(ApprovalError::NoApplicableTemplate);
        };
        let approvers = self.approvers_for(first).await?;

        let instance = ApprovalInstance::start(
            claim.id,
            &template,
            request.initiated_by,
            request.urgency,
            request.notes,
        );
        let entries = assign_all(&instance, &approvers, 1);
        let plan = StartPlan {
            current_approver: approvers[0].id,
            entries,
            instance,
        };
        let instance = self.store.start(plan).await?;

        info!(
            claim_number = %claim.claim_number,
            approval_id = %instance.id,
            template = %template.template_code,
            approvers = approvers.len(),
            "approval started"
        );

        let event = AuditEvent::new(request.initiated_by, "APPROVAL_STARTED", "claim_approval", instance.id)
            .with_after(json!({
                "claim_id": claim.id,
                "template": template.template_code,
                "total_steps": instance.total_steps,
                "is_urgent": instance.is_urgent,
            }));
        record_quietly(self.audit.as_ref(), event).await;

        Ok(StartOutcome::Started { instance })
    }

    /// Applies an approver's action to the current step
    #[instrument(skip(self, request), fields(approval_id = %request.approval_id, action = %request.action))]
    pub async fn process(&self, request: ActionRequest) -> Result<ApprovalInstance, ApprovalError> {
        let instance = self.get_instance(request.approval_id).await?;
        if instance.status != ApprovalStatus::InProgress {
            return Err(ApprovalError::ApprovalNotActive {
                status: instance.status.to_string(),
            });
        }

        let entry = self
            .store
            .find_pending_entry(instance.id, request.actor, instance.current_step)
            .await?
            .ok_or(ApprovalError::NotAuthorizedToApprove(request.actor))?;

        if request.adjusted_amount.is_some_and(|a| a.is_negative()) {
            return Err(ApprovalError::invalid("adjusted_amount", "must not be negative"));
        }
        if request.action == ApprovalAction::Skip {
            return Err(ApprovalError::NotImplemented("SKIP action".to_string()));
        }

        let step = instance
            .current()
            .cloned()
            .ok_or_else(|| ApprovalError::ApprovalNotActive {
                status: format!("step {} missing from approval line", instance.current_step),
            })?;

        let effect = self.plan_effect(&instance, &step, &request).await?;

        let actor = self.directory.get_user(request.actor).await?;
        let history = history_record(&instance, &step, &entry, actor.as_ref(), &request);

        let plan = ActionPlan {
            approval_id: instance.id,
            expected_version: instance.version,
            step_no: instance.current_step,
            actor_entry: entry.id,
            actor: request.actor,
            history,
            effect,
        };
        let updated = self.store.apply(plan).await?;

        info!(
            approval_id = %updated.id,
            step = instance.current_step,
            action = %request.action,
            status = %updated.status,
            "approval action applied"
        );

        let event = AuditEvent::new(
            request.actor,
            format!("APPROVAL_{}", request.action),
            "claim_approval",
            updated.id,
        )
        .with_before(json!({
            "status": instance.status.as_str(),
            "current_step": instance.current_step,
        }))
        .with_after(json!({
            "status": updated.status.as_str(),
            "current_step": updated.current_step,
            "comments": request.comments,
            "adjusted_amount": request.adjusted_amount,
        }));
        record_quietly(self.audit.as_ref(), event).await;

        Ok(updated)
    }

    async fn plan_effect(
        &self,
        instance: &ApprovalInstance,
        step: &ApprovalStep,
        request: &ActionRequest,
    ) -> Result<ActionEffect, ApprovalError> {
        let effect = match request.action {
            ApprovalAction::Approve if instance.is_final_step() => {
                let amount = match request.adjusted_amount {
                    Some(amount) => amount,
                    None => {
                        self.store
                            .get_claim_summary(instance.claim_id)
                            .await?
                            .ok_or(ApprovalError::ClaimNotFound(instance.claim_id))?
                            .total_claimed_amount
                    }
                };
                ActionEffect::Complete(FinalOutcome::Approved {
                    amount,
                    by: request.actor,
                })
            }
            ApprovalAction::Approve => {
                let next_step = instance.current_step + 1;
                let next = instance.step(next_step).ok_or_else(|| {
                    ApprovalError::ApprovalNotActive {
                        status: format!("step {next_step} missing from approval line"),
                    }
                })?;
                let approvers = self.approvers_for(next).await?;
                ActionEffect::Advance {
                    next_step,
                    current_approver: approvers[0].id,
                    entries: assign_all(instance, &approvers, next_step),
                }
            }
            ApprovalAction::Reject => ActionEffect::Complete(FinalOutcome::Rejected {
                reason: request.comments.clone(),
            }),
            ApprovalAction::Return => ActionEffect::Complete(FinalOutcome::Returned {
                reason: request.comments.clone(),
            }),
            ApprovalAction::Hold => ActionEffect::Hold {
                reason: request.comments.clone(),
            },
            ApprovalAction::Delegate => {
                let delegate_id = request
                    .delegate_to
                    .ok_or_else(|| ApprovalError::invalid("delegate_to", "is required for DELEGATE"))?;
                let delegate = self
                    .directory
                    .get_user(delegate_id)
                    .await?
                    .filter(|u| u.is_active && u.role_code == step.role_code && u.id != request.actor)
                    .ok_or(ApprovalError::InvalidDelegate(delegate_id))?;
                // Role holders already got the step broadcast; only assign
                // when the delegate has no pending entry of their own
                let held = self
                    .store
                    .find_pending_entry(instance.id, delegate.id, instance.current_step)
                    .await?;
                ActionEffect::Delegate {
                    delegate: delegate.id,
                    entry: held.is_none().then(|| {
                        InboxEntry::assign(
                            instance.id,
                            instance.claim_id,
                            delegate.id,
                            instance.current_step,
                        )
                    }),
                }
            }
            ApprovalAction::Skip => {
                return Err(ApprovalError::NotImplemented("SKIP action".to_string()))
            }
        };
        Ok(effect)
    }

    /// Cancels an active approval. The initiator and senior staff may cancel.
    #[instrument(skip(self, reason))]
    pub async fn cancel(
        &self,
        approval_id: ApprovalId,
        actor: UserId,
        role_level: u8,
        reason: Option<String>,
    ) -> Result<ApprovalInstance, ApprovalError> {
        let instance = self.get_instance(approval_id).await?;
        if !instance.status.is_active() {
            return Err(ApprovalError::ApprovalNotActive {
                status: instance.status.to_string(),
            });
        }
        if instance.initiated_by != actor && role_level < CANCEL_OVERRIDE_LEVEL {
            return Err(ApprovalError::NotAuthorizedToCancel(actor));
        }

        let cancelled = self
            .store
            .cancel(CancelPlan {
                approval_id,
                expected_version: instance.version,
                reason: reason.clone(),
                cancelled_at: Utc::now(),
            })
            .await?;

        info!(approval_id = %approval_id, claim_id = %instance.claim_id, "approval cancelled");

        let event = AuditEvent::new(actor, "APPROVAL_CANCELLED", "claim_approval", approval_id)
            .with_before(json!({ "status": instance.status.as_str() }))
            .with_after(json!({ "status": cancelled.status.as_str(), "reason": reason }));
        record_quietly(self.audit.as_ref(), event).await;

        Ok(cancelled)
    }

    pub async fn inbox(&self, user_id: UserId, filter: InboxFilter) -> Result<InboxPage, ApprovalError> {
        if filter.limit == 0 || filter.limit > MAX_INBOX_PAGE {
            return Err(ApprovalError::invalid(
                "limit",
                format!("must be between 1 and {MAX_INBOX_PAGE}"),
            ));
        }
        Ok(self.store.inbox(user_id, &filter).await?)
    }

    pub async fn pending_count(&self, user_id: UserId) -> Result<u64, ApprovalError> {
        Ok(self.store.pending_count(user_id).await?)
    }

    /// Latest approval of a claim with its history
    pub async fn status_for_claim(&self, claim_id: ClaimId) -> Result<ApprovalStatusView, ApprovalError> {
        let instance = self
            .store
            .latest_for_claim(claim_id)
            .await?
            .ok_or(ApprovalError::NoApprovalForClaim(claim_id))?;
        let history = self.store.history(instance.id).await?;
        Ok(ApprovalStatusView { instance, history })
    }

    pub async fn history(&self, approval_id: ApprovalId) -> Result<Vec<ApprovalHistoryRecord>, ApprovalError> {
        let instance = self.get_instance(approval_id).await?;
        Ok(self.store.history(instance.id).await?)
    }

    pub async fn templates(&self) -> Result<Vec<ApprovalTemplate>, ApprovalError> {
        Ok(self.templates.list_templates().await?)
    }

    async fn get_instance(&self, id: ApprovalId) -> Result<ApprovalInstance, ApprovalError> {
        self.store
            .get_instance(id)
            .await?
            .ok_or(ApprovalError::ApprovalNotFound(id))
    }

    /// Active holders of a step's role; never empty on success
    async fn approvers_for(&self, step: &ApprovalStep) -> Result<Vec<Approver>, ApprovalError> {
        let approvers = self.directory.get_active_users_by_role(&step.role_code).await?;
        if approvers.is_empty() {
            warn!(role = %step.role_code, step = step.step, "no active approvers for role");
            return Err(ApprovalError::NoApproversAvailable {
                role: step.role_code.clone(),
            });
        }
        Ok(approvers)
    }
}

fn assign_all(instance: &ApprovalInstance, approvers: &[Approver], step_no: u32) -> Vec<InboxEntry> {
    approvers
        .iter()
        .map(|a| InboxEntry::assign(instance.id, instance.claim_id, a.id, step_no))
        .collect()
}

fn history_record(
    instance: &ApprovalInstance,
    step: &ApprovalStep,
    entry: &InboxEntry,
    actor: Option<&Approver>,
    request: &ActionRequest,
) -> ApprovalHistoryRecord {
    let decided_at = Utc::now();
    let step_name = if step.step_name.trim().is_empty() {
        format!("Step {} approval", step.step)
    } else {
        step.step_name.clone()
    };
    ApprovalHistoryRecord {
        id: HistoryId::new_v7(),
        approval_id: instance.id,
        claim_id: instance.claim_id,
        step_no: instance.current_step,
        step_name,
        approver_id: request.actor,
        approver_name: actor.map_or_else(|| request.actor.to_string(), |a| a.name.clone()),
        approver_role: actor.map_or_else(|| step.role_code.clone(), |a| a.role_code.clone()),
        approver_department: actor.and_then(|a| a.department.clone()),
        action: request.action,
        adjusted_amount: request.adjusted_amount,
        comment: request.comments.clone(),
        received_at: entry.assigned_at,
        decided_at,
        processing_minutes: (decided_at - entry.assigned_at).num_minutes().max(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use core_kernel::TemplateId;

    fn instance() -> ApprovalInstance {
        let template = ApprovalTemplate {
            id: TemplateId::new(),
            template_code: "STANDARD".into(),
            template_name: "Standard".into(),
            description: None,
            claim_type: None,
            min_amount: None,
            max_amount: None,
            fraud_score_threshold: None,
            steps: vec![ApprovalStep {
                step: 1,
                role_code: "TEAM_LEAD".into(),
                step_name: String::new(),
            }],
            priority: 1,
            is_active: true,
        };
        ApprovalInstance::start(ClaimId::new(), &template, UserId::new(), Urgency::Normal, None)
    }

    #[test]
    fn test_history_measures_time_to_decision() {
        let instance = instance();
        let step = instance.current().unwrap().clone();
        let mut entry = InboxEntry::assign(instance.id, instance.claim_id, UserId::new(), 1);
        entry.assigned_at = Utc::now() - Duration::minutes(90);
        let request = ActionRequest {
            approval_id: instance.id,
            actor: entry.user_id,
            action: ApprovalAction::Approve,
            comments: Some("ok".into()),
            adjusted_amount: None,
            delegate_to: None,
        };

        let record = history_record(&instance, &step, &entry, None, &request);
        assert!(record.processing_minutes >= 90);
        assert_eq!(record.step_name, "Step 1 approval");
        assert_eq!(record.approver_role, "TEAM_LEAD");
        assert_eq!(record.received_at, entry.assigned_at);
    }

    #[test]
    fn test_history_uses_directory_details() {
        let instance = instance();
        let step = instance.current().unwrap().clone();
        let entry = InboxEntry::assign(instance.id, instance.claim_id, UserId::new(), 1);
        let approver = Approver {
            id: entry.user_id,
            name: "Park".into(),
            department: Some("Claims".into()),
            role_code: "TEAM_LEAD".into(),
            is_active: true,
        };
        let request = ActionRequest {
            approval_id: instance.id,
            actor: entry.user_id,
            action: ApprovalAction::Reject,
            comments: None,
            adjusted_amount: None,
            delegate_to: None,
        };

        let record = history_record(&instance, &step, &entry, Some(&approver), &request);
        assert_eq!(record.approver_name, "Park");
        assert_eq!(record.approver_department.as_deref(), Some("Claims"));
        assert_eq!(record.action, ApprovalAction::Reject);
    }
}
