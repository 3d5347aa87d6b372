//! PostgreSQL Approval Adapter
//!
//! Implements the three approval ports over one repository. Row locking
//! and version checks live in `ApprovalRepository::apply` and `cancel`;
//! a refused plan surfaces here as `PortError::Conflict`.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info, instrument};

use core_kernel::{
    ApprovalId, ClaimId, DomainPort, HealthCheckResult, HealthCheckable, PortError, UserId, Won,
};
use domain_approval::{
    ActionPlan, ApprovalHistoryRecord, ApprovalInstance, ApprovalStore, ApprovalTemplate,
    Approver, ApproverDirectory, CancelPlan, ClaimSummary, InboxEntry, InboxFilter, InboxPage,
    StartPlan, TemplatePort,
};
use domain_claims::ClaimType;

use super::check_pool;
use crate::error::DatabaseError;
use crate::repositories::ApprovalRepository;

#[derive(Debug, Clone)]
pub struct PostgresApprovalAdapter {
    repository: ApprovalRepository,
    pool: PgPool,
}

impl PostgresApprovalAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: ApprovalRepository::new(pool.clone()),
            pool,
        }
    }
}

fn convert_all<R, T>(
    rows: Vec<R>,
    convert: impl Fn(R) -> Result<T, DatabaseError>,
) -> Result<Vec<T>, PortError> {
    rows.into_iter()
        .map(|row| convert(row).map_err(PortError::from))
        .collect()
}

impl DomainPort for PostgresApprovalAdapter {}

#[async_trait]
impl HealthCheckable for PostgresApprovalAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        check_pool("postgres-approval-adapter", &self.pool).await
    }
}

#[async_trait]
impl TemplatePort for PostgresApprovalAdapter {
    #[instrument(skip(self))]
    async fn find_matching_template(
        &self,
        claim_type: ClaimType,
        amount: Won,
        fraud_score: u8,
    ) -> Result<Option<ApprovalTemplate>, PortError> {
        let row = self
            .repository
            .find_matching_template(claim_type.as_str(), amount.amount(), i16::from(fraud_score))
            .await?;
        match row {
            Some(row) => Ok(Some(row.into_domain()?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn list_templates(&self) -> Result<Vec<ApprovalTemplate>, PortError> {
        convert_all(self.repository.list_templates().await?, |row| row.into_domain())
    }
}

#[async_trait]
impl ApproverDirectory for PostgresApprovalAdapter {
    #[instrument(skip(self))]
    async fn get_active_users_by_role(&self, role_code: &str) -> Result<Vec<Approver>, PortError> {
        let rows = self.repository.active_users_by_role(role_code).await?;
        debug!(count = rows.len(), "Resolved approvers");
        Ok(rows.into_iter().map(Approver::from).collect())
    }

    #[instrument(skip(self), fields(user_id = %id))]
    async fn get_user(&self, id: UserId) -> Result<Option<Approver>, PortError> {
        Ok(self.repository.find_user(*id.as_uuid()).await?.map(Approver::from))
    }
}

#[async_trait]
impl ApprovalStore for PostgresApprovalAdapter {
    #[instrument(skip(self), fields(claim_id = %claim_id))]
    async fn get_claim_summary(&self, claim_id: ClaimId) -> Result<Option<ClaimSummary>, PortError> {
        match self.repository.claim_summary(*claim_id.as_uuid()).await? {
            Some(row) => Ok(Some(row.into_domain()?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(claim_id = %claim_id))]
    async fn find_active_instance(
        &self,
        claim_id: ClaimId,
    ) -> Result<Option<ApprovalInstance>, PortError> {
        match self.repository.find_active(*claim_id.as_uuid()).await? {
            Some(row) => Ok(Some(row.into_domain()?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(approval_id = %id))]
    async fn get_instance(&self, id: ApprovalId) -> Result<Option<ApprovalInstance>, PortError> {
        match self.repository.find_instance(*id.as_uuid()).await? {
            Some(row) => Ok(Some(row.into_domain()?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(approval_id = %approval_id, user_id = %user_id))]
    async fn find_pending_entry(
        &self,
        approval_id: ApprovalId,
        user_id: UserId,
        step_no: u32,
    ) -> Result<Option<InboxEntry>, PortError> {
        let step = i32::try_from(step_no)
            .map_err(|_| PortError::validation_field("step number out of range", "step_no"))?;
        match self
            .repository
            .find_pending_entry(*approval_id.as_uuid(), *user_id.as_uuid(), step)
            .await?
        {
            Some(row) => Ok(Some(row.into_domain()?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, plan), fields(claim_id = %plan.instance.claim_id))]
    async fn start(&self, plan: StartPlan) -> Result<ApprovalInstance, PortError> {
        let instance = self.repository.start(&plan).await?.into_domain()?;
        info!(
            approval_id = %instance.id,
            assignees = plan.entries.len(),
            "Approval started"
        );
        Ok(instance)
    }

    #[instrument(skip(self), fields(claim_id = %claim_id))]
    async fn auto_approve(&self, claim_id: ClaimId, amount: Won) -> Result<(), PortError> {
        self.repository
            .auto_approve(*claim_id.as_uuid(), amount.amount())
            .await?;
        Ok(())
    }

    #[instrument(skip(self, plan), fields(approval_id = %plan.approval_id, action = %plan.history.action))]
    async fn apply(&self, plan: ActionPlan) -> Result<ApprovalInstance, PortError> {
        Ok(self.repository.apply(&plan).await?.into_domain()?)
    }

    #[instrument(skip(self, plan), fields(approval_id = %plan.approval_id))]
    async fn cancel(&self, plan: CancelPlan) -> Result<ApprovalInstance, PortError> {
        Ok(self.repository.cancel(&plan).await?.into_domain()?)
    }

    #[instrument(skip(self, filter), fields(user_id = %user_id))]
    async fn inbox(&self, user_id: UserId, filter: &InboxFilter) -> Result<InboxPage, PortError> {
        let (rows, total) = self.repository.inbox(*user_id.as_uuid(), filter).await?;
        Ok(InboxPage {
            items: convert_all(rows, |row| row.into_domain())?,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn pending_count(&self, user_id: UserId) -> Result<u64, PortError> {
        let count = self.repository.pending_count(*user_id.as_uuid()).await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    #[instrument(skip(self), fields(approval_id = %approval_id))]
    async fn history(
        &self,
        approval_id: ApprovalId,
    ) -> Result<Vec<ApprovalHistoryRecord>, PortError> {
        convert_all(self.repository.history(*approval_id.as_uuid()).await?, |row| {
            row.into_domain()
        })
    }

    #[instrument(skip(self), fields(claim_id = %claim_id))]
    async fn latest_for_claim(
        &self,
        claim_id: ClaimId,
    ) -> Result<Option<ApprovalInstance>, PortError> {
        match self.repository.latest_for_claim(*claim_id.as_uuid()).await? {
            Some(row) => Ok(Some(row.into_domain()?)),
            None => Ok(None),
        }
    }
}
