//! Approval templates, instances, inbox and history
//!
//! First-actor-wins is enforced in SQL: the instance row is locked and
//! checked against the expected version and step, and the acting inbox
//! entry is completed with `WHERE status = 'PENDING'`. Either check
//! failing aborts the transaction with `DatabaseError::Conflict`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use core_kernel::{ApprovalId, ClaimId, HistoryId, InboxEntryId, TemplateId, UserId};
use domain_approval::{
    ActionEffect, ActionPlan, ApprovalHistoryRecord, ApprovalInstance, ApprovalStep,
    ApprovalTemplate, Approver, CancelPlan, ClaimSummary, FinalOutcome, InboxEntry, InboxFilter,
    InboxItem, StartPlan,
};
use domain_claims::ClaimType;

use super::claims::consume_coverage_usage;
use super::{code, json, opt_code, opt_won, to_json, unsigned, won};
use crate::error::DatabaseError;

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct TemplateRow {
    pub id: Uuid,
    pub template_code: String,
    pub template_name: String,
    pub description: Option<String>,
    pub claim_type: Option<String>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub fraud_score_threshold: Option<i16>,
    pub approval_steps: serde_json::Value,
    pub priority: i32,
    pub is_active: bool,
}

impl TemplateRow {
    pub fn into_domain(self) -> Result<ApprovalTemplate, DatabaseError> {
        Ok(ApprovalTemplate {
            id: TemplateId::from_uuid(self.id),
            template_code: self.template_code,
            template_name: self.template_name,
            description: self.description,
            claim_type: opt_code("claim_type", self.claim_type.as_deref())?,
            min_amount: opt_won(self.min_amount),
            max_amount: opt_won(self.max_amount),
            fraud_score_threshold: self
                .fraud_score_threshold
                .map(|t| unsigned("fraud_score_threshold", t))
                .transpose()?,
            steps: json::<Vec<ApprovalStep>>("approval_steps", self.approval_steps)?,
            priority: self.priority,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub department: Option<String>,
    pub role_code: String,
    pub status: String,
}

impl From<UserRow> for Approver {
    fn from(row: UserRow) -> Self {
        Approver {
            id: UserId::from_uuid(row.id),
            name: row.name,
            department: row.department,
            role_code: row.role_code,
            is_active: row.status == "ACTIVE",
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ClaimSummaryRow {
    pub id: Uuid,
    pub claim_number: String,
    pub claim_type: String,
    pub status: String,
    pub total_claimed_amount: Decimal,
    pub total_approved_amount: Decimal,
    pub fraud_score: i16,
}

impl ClaimSummaryRow {
    pub fn into_domain(self) -> Result<ClaimSummary, DatabaseError> {
        Ok(ClaimSummary {
            id: ClaimId::from_uuid(self.id),
            claim_number: self.claim_number,
            claim_type: code("claim_type", &self.claim_type)?,
            status: code("status", &self.status)?,
            total_claimed_amount: won(self.total_claimed_amount),
            total_approved_amount: won(self.total_approved_amount),
            fraud_score: unsigned("fraud_score", self.fraud_score)?,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct InstanceRow {
    pub id: Uuid,
    pub claim_id: Uuid,
    pub template_id: Uuid,
    pub status: String,
    pub current_step: i32,
    pub total_steps: i32,
    pub approval_line: serde_json::Value,
    pub is_urgent: bool,
    pub notes: Option<String>,
    pub initiated_by: Uuid,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl InstanceRow {
    pub fn into_domain(self) -> Result<ApprovalInstance, DatabaseError> {
        Ok(ApprovalInstance {
            id: ApprovalId::from_uuid(self.id),
            claim_id: ClaimId::from_uuid(self.claim_id),
            template_id: TemplateId::from_uuid(self.template_id),
            status: code("status", &self.status)?,
            current_step: unsigned("current_step", self.current_step)?,
            total_steps: unsigned("total_steps", self.total_steps)?,
            approval_line: json("approval_line", self.approval_line)?,
            is_urgent: self.is_urgent,
            notes: self.notes,
            initiated_by: UserId::from_uuid(self.initiated_by),
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
            completed_at: self.completed_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct InboxRow {
    pub id: Uuid,
    pub claim_approval_id: Uuid,
    pub claim_id: Uuid,
    pub user_id: Uuid,
    pub step_no: i32,
    pub status: String,
    pub assigned_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl InboxRow {
    pub fn into_domain(self) -> Result<InboxEntry, DatabaseError> {
        Ok(InboxEntry {
            id: InboxEntryId::from_uuid(self.id),
            approval_id: ApprovalId::from_uuid(self.claim_approval_id),
            claim_id: ClaimId::from_uuid(self.claim_id),
            user_id: UserId::from_uuid(self.user_id),
            step_no: unsigned("step_no", self.step_no)?,
            status: code("status", &self.status)?,
            assigned_at: self.assigned_at,
            completed_at: self.completed_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct InboxItemRow {
    pub entry_id: Uuid,
    pub step_no: i32,
    pub entry_status: String,
    pub assigned_at: DateTime<Utc>,
    pub approval_id: Uuid,
    pub approval_status: String,
    pub current_step: i32,
    pub total_steps: i32,
    pub is_urgent: bool,
    pub claim_id: Uuid,
    pub claim_number: String,
    pub claim_type: String,
    pub total_claimed_amount: Decimal,
    pub diagnosis_name: Option<String>,
    pub fraud_score: i16,
    pub customer_name: String,
}

impl InboxItemRow {
    pub fn into_domain(self) -> Result<InboxItem, DatabaseError> {
        Ok(InboxItem {
            entry_id: InboxEntryId::from_uuid(self.entry_id),
            step_no: unsigned("step_no", self.step_no)?,
            entry_status: code("entry_status", &self.entry_status)?,
            assigned_at: self.assigned_at,
            approval_id: ApprovalId::from_uuid(self.approval_id),
            approval_status: code("approval_status", &self.approval_status)?,
            current_step: unsigned("current_step", self.current_step)?,
            total_steps: unsigned("total_steps", self.total_steps)?,
            is_urgent: self.is_urgent,
            claim_id: ClaimId::from_uuid(self.claim_id),
            claim_number: self.claim_number,
            claim_type: code::<ClaimType>("claim_type", &self.claim_type)?,
            total_claimed_amount: won(self.total_claimed_amount),
            diagnosis_name: self.diagnosis_name,
            fraud_score: unsigned("fraud_score", self.fraud_score)?,
            customer_name: self.customer_name,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    pub id: Uuid,
    pub claim_approval_id: Uuid,
    pub claim_id: Uuid,
    pub step_no: i32,
    pub step_name: String,
    pub approver_id: Uuid,
    pub approver_name: String,
    pub approver_role: String,
    pub approver_department: Option<String>,
    pub action: String,
    pub decision_amount: Option<Decimal>,
    pub comment: Option<String>,
    pub received_at: DateTime<Utc>,
    pub decided_at: DateTime<Utc>,
    pub processing_time_minutes: i64,
}

impl HistoryRow {
    pub fn into_domain(self) -> Result<ApprovalHistoryRecord, DatabaseError> {
        Ok(ApprovalHistoryRecord {
            id: HistoryId::from_uuid(self.id),
            approval_id: ApprovalId::from_uuid(self.claim_approval_id),
            claim_id: ClaimId::from_uuid(self.claim_id),
            step_no: unsigned("step_no", self.step_no)?,
            step_name: self.step_name,
            approver_id: UserId::from_uuid(self.approver_id),
            approver_name: self.approver_name,
            approver_role: self.approver_role,
            approver_department: self.approver_department,
            action: code("action", &self.action)?,
            adjusted_amount: opt_won(self.decision_amount),
            comment: self.comment,
            received_at: self.received_at,
            decided_at: self.decided_at,
            processing_minutes: self.processing_time_minutes,
        })
    }
}

const TEMPLATE_COLUMNS: &str = "id, template_code, template_name, description, claim_type, \
     min_amount, max_amount, fraud_score_threshold, approval_steps, priority, is_active";

const INSTANCE_COLUMNS: &str = "id, claim_id, template_id, status, current_step, total_steps, \
     approval_line, is_urgent, notes, initiated_by, version, created_at, updated_at, completed_at";

const INBOX_COLUMNS: &str =
    "id, claim_approval_id, claim_id, user_id, step_no, status, assigned_at, completed_at";

const HISTORY_COLUMNS: &str = "id, claim_approval_id, claim_id, step_no, step_name, approver_id, \
     approver_name, approver_role, approver_department, action, decision_amount, comment, \
     received_at, decided_at, processing_time_minutes";

// ============================================================================
// Repository
// ============================================================================

#[derive(Debug, Clone)]
pub struct ApprovalRepository {
    pool: PgPool,
}

impl ApprovalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_matching_template(
        &self,
        claim_type: &str,
        amount: Decimal,
        fraud_score: i16,
    ) -> Result<Option<TemplateRow>, DatabaseError> {
        Ok(sqlx::query_as::<_, TemplateRow>(&format!(
            r#"
            SELECT {TEMPLATE_COLUMNS} FROM approval_line_templates
            WHERE is_active = TRUE
              AND (claim_type IS NULL OR claim_type = $1)
              AND (min_amount IS NULL OR min_amount <= $2)
              AND (max_amount IS NULL OR max_amount >= $2)
              AND (fraud_score_threshold IS NULL OR $3 >= fraud_score_threshold)
            ORDER BY priority, template_code
            LIMIT 1
            "#
        ))
        .bind(claim_type)
        .bind(amount)
        .bind(fraud_score)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn list_templates(&self) -> Result<Vec<TemplateRow>, DatabaseError> {
        Ok(sqlx::query_as::<_, TemplateRow>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM approval_line_templates \
             WHERE is_active = TRUE ORDER BY priority, template_code"
        ))
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn active_users_by_role(&self, role_code: &str) -> Result<Vec<UserRow>, DatabaseError> {
        Ok(sqlx::query_as::<_, UserRow>(
            "SELECT id, name, department, role_code, status FROM users \
             WHERE role_code = $1 AND status = 'ACTIVE' ORDER BY name",
        )
        .bind(role_code)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn find_user(&self, id: Uuid) -> Result<Option<UserRow>, DatabaseError> {
        Ok(sqlx::query_as::<_, UserRow>(
            "SELECT id, name, department, role_code, status FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn claim_summary(&self, claim_id: Uuid) -> Result<Option<ClaimSummaryRow>, DatabaseError> {
        Ok(sqlx::query_as::<_, ClaimSummaryRow>(
            "SELECT id, claim_number, claim_type, status, total_claimed_amount, \
             total_approved_amount, fraud_score FROM claims WHERE id = $1",
        )
        .bind(claim_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn find_active(&self, claim_id: Uuid) -> Result<Option<InstanceRow>, DatabaseError> {
        Ok(sqlx::query_as::<_, InstanceRow>(&format!(
            "SELECT {INSTANCE_COLUMNS} FROM claim_approvals \
             WHERE claim_id = $1 AND status IN ('PENDING', 'IN_PROGRESS')"
        ))
        .bind(claim_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn find_instance(&self, id: Uuid) -> Result<Option<InstanceRow>, DatabaseError> {
        Ok(sqlx::query_as::<_, InstanceRow>(&format!(
            "SELECT {INSTANCE_COLUMNS} FROM claim_approvals WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn latest_for_claim(&self, claim_id: Uuid) -> Result<Option<InstanceRow>, DatabaseError> {
        Ok(sqlx::query_as::<_, InstanceRow>(&format!(
            "SELECT {INSTANCE_COLUMNS} FROM claim_approvals \
             WHERE claim_id = $1 ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(claim_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn find_pending_entry(
        &self,
        approval_id: Uuid,
        user_id: Uuid,
        step_no: i32,
    ) -> Result<Option<InboxRow>, DatabaseError> {
        Ok(sqlx::query_as::<_, InboxRow>(&format!(
            "SELECT {INBOX_COLUMNS} FROM approval_inbox \
             WHERE claim_approval_id = $1 AND user_id = $2 AND step_no = $3 AND status = 'PENDING'"
        ))
        .bind(approval_id)
        .bind(user_id)
        .bind(step_no)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn start(&self, plan: &StartPlan) -> Result<InstanceRow, DatabaseError> {
        let instance = &plan.instance;
        let mut tx = self.pool.begin().await?;

        // The partial unique index rejects a second running approval
        let row = sqlx::query_as::<_, InstanceRow>(&format!(
            r#"
            INSERT INTO claim_approvals
                (id, claim_id, template_id, status, current_step, total_steps, approval_line,
                 is_urgent, notes, initiated_by, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            RETURNING {INSTANCE_COLUMNS}
            "#
        ))
        .bind(instance.id.as_uuid())
        .bind(instance.claim_id.as_uuid())
        .bind(instance.template_id.as_uuid())
        .bind(instance.status.as_str())
        .bind(instance.current_step as i32)
        .bind(instance.total_steps as i32)
        .bind(to_json("approval_line", &instance.approval_line)?)
        .bind(instance.is_urgent)
        .bind(&instance.notes)
        .bind(instance.initiated_by.as_uuid())
        .bind(instance.version)
        .bind(instance.created_at)
        .fetch_one(&mut *tx)
        .await?;

        insert_entries(&mut tx, &plan.entries).await?;

        let updated = sqlx::query(
            r#"
            UPDATE claims
            SET status = 'PENDING_REVIEW', approval_status = 'IN_PROGRESS',
                current_approver_id = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(instance.claim_id.as_uuid())
        .bind(plan.current_approver.as_uuid())
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Claim", instance.claim_id));
        }

        tx.commit().await?;
        Ok(row)
    }

    /// Approves the claim on behalf of the system and consumes its coverage
    /// usage in the same transaction
    pub async fn auto_approve(&self, claim_id: Uuid, amount: Decimal) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        consume_coverage_usage(&mut tx, claim_id, won(amount), Utc::now()).await?;

        let updated = sqlx::query(
            r#"
            UPDATE claims
            SET status = 'APPROVED', approval_status = 'APPROVED',
                total_approved_amount = $2,
                total_rejected_amount = GREATEST(total_claimed_amount - $2, 0),
                approved_by = $3, approved_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(claim_id)
        .bind(amount)
        .bind(UserId::system().as_uuid())
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Claim", claim_id));
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn apply(&self, plan: &ActionPlan) -> Result<InstanceRow, DatabaseError> {
        let approval_id = *plan.approval_id.as_uuid();
        let now = plan.history.decided_at;
        let mut tx = self.pool.begin().await?;

        let instance = sqlx::query_as::<_, InstanceRow>(&format!(
            "SELECT {INSTANCE_COLUMNS} FROM claim_approvals \
             WHERE id = $1 AND version = $2 AND current_step = $3 AND status = 'IN_PROGRESS' \
             FOR UPDATE"
        ))
        .bind(approval_id)
        .bind(plan.expected_version)
        .bind(plan.step_no as i32)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DatabaseError::Conflict(format!("approval {approval_id} changed concurrently")))?;
        let claim_id = instance.claim_id;

        let entry_sql = if matches!(plan.effect, ActionEffect::Hold { .. }) {
            // The entry stays pending; lock it so a concurrent action waits
            "SELECT id FROM approval_inbox WHERE id = $1 AND status = 'PENDING' FOR UPDATE"
        } else {
            "UPDATE approval_inbox SET status = 'COMPLETED', completed_at = $2 \
             WHERE id = $1 AND status = 'PENDING' RETURNING id"
        };
        sqlx::query_scalar::<_, Uuid>(entry_sql)
            .bind(plan.actor_entry.as_uuid())
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DatabaseError::Conflict("inbox entry already processed".to_string()))?;

        insert_history(&mut tx, &plan.history).await?;

        match &plan.effect {
            ActionEffect::Complete(outcome) => {
                supersede_pending(&mut tx, approval_id, now).await?;
                let (status, claim_status, reason) = match outcome {
                    FinalOutcome::Approved { .. } => ("APPROVED", "APPROVED", None),
                    FinalOutcome::Rejected { reason } => ("REJECTED", "REJECTED", reason.as_deref()),
                    FinalOutcome::Returned { reason } => ("RETURNED", "RETURNED", reason.as_deref()),
                };
                sqlx::query(
                    "UPDATE claim_approvals SET status = $2, completed_at = $3, updated_at = $3, \
                     version = version + 1 WHERE id = $1",
                )
                .bind(approval_id)
                .bind(status)
                .bind(now)
                .execute(&mut *tx)
                .await?;

                if let FinalOutcome::Approved { amount, by } = outcome {
                    consume_coverage_usage(&mut tx, claim_id, *amount, now).await?;
                    sqlx::query(
                        r#"
                        UPDATE claims
                        SET status = 'APPROVED', approval_status = 'APPROVED',
                            total_approved_amount = $2,
                            total_rejected_amount = GREATEST(total_claimed_amount - $2, 0),
                            approved_by = $3, approved_at = $4,
                            current_approver_id = NULL, updated_at = $4
                        WHERE id = $1
                        "#,
                    )
                    .bind(claim_id)
                    .bind(amount.amount())
                    .bind(by.as_uuid())
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;
                } else {
                    sqlx::query(
                        r#"
                        UPDATE claims
                        SET status = $2, approval_status = $2, decision_reason = $3,
                            current_approver_id = NULL, updated_at = $4
                        WHERE id = $1
                        "#,
                    )
                    .bind(claim_id)
                    .bind(claim_status)
                    .bind(reason)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;
                }
            }
            ActionEffect::Advance {
                next_step,
                entries,
                current_approver,
            } => {
                supersede_pending(&mut tx, approval_id, now).await?;
                insert_entries(&mut tx, entries).await?;
                sqlx::query(
                    "UPDATE claim_approvals SET current_step = $2, updated_at = $3, \
                     version = version + 1 WHERE id = $1",
                )
                .bind(approval_id)
                .bind(*next_step as i32)
                .bind(now)
                .execute(&mut *tx)
                .await?;
                set_current_approver(&mut tx, claim_id, *current_approver.as_uuid(), now).await?;
            }
            ActionEffect::Hold { reason } => {
                sqlx::query(
                    "UPDATE claims SET hold_status = 'ON_HOLD', hold_reason = $2, updated_at = $3 \
                     WHERE id = $1",
                )
                .bind(claim_id)
                .bind(reason)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
            ActionEffect::Delegate { delegate, entry } => {
                if let Some(entry) = entry {
                    insert_entries(&mut tx, std::slice::from_ref(entry)).await?;
                }
                set_current_approver(&mut tx, claim_id, *delegate.as_uuid(), now).await?;
            }
        }

        let row = sqlx::query_as::<_, InstanceRow>(&format!(
            "SELECT {INSTANCE_COLUMNS} FROM claim_approvals WHERE id = $1"
        ))
        .bind(approval_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    pub async fn cancel(&self, plan: &CancelPlan) -> Result<InstanceRow, DatabaseError> {
        let approval_id = *plan.approval_id.as_uuid();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, InstanceRow>(&format!(
            r#"
            UPDATE claim_approvals
            SET status = 'CANCELLED', notes = COALESCE($3, notes),
                completed_at = $4, updated_at = $4, version = version + 1
            WHERE id = $1 AND version = $2 AND status IN ('PENDING', 'IN_PROGRESS')
            RETURNING {INSTANCE_COLUMNS}
            "#
        ))
        .bind(approval_id)
        .bind(plan.expected_version)
        .bind(&plan.reason)
        .bind(plan.cancelled_at)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DatabaseError::Conflict(format!("approval {approval_id} changed concurrently")))?;

        supersede_pending(&mut tx, approval_id, plan.cancelled_at).await?;
        sqlx::query(
            "UPDATE claims SET approval_status = 'CANCELLED', current_approver_id = NULL, \
             updated_at = $2 WHERE id = $1",
        )
        .bind(row.claim_id)
        .bind(plan.cancelled_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    /// One page of a user's inbox, urgent first then oldest assignment
    pub async fn inbox(&self, user_id: Uuid, filter: &InboxFilter) -> Result<(Vec<InboxItemRow>, i64), DatabaseError> {
        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM approval_inbox ai \
             JOIN claim_approvals ca ON ca.id = ai.claim_approval_id \
             WHERE ai.user_id = ",
        );
        count.push_bind(user_id);
        push_inbox_filters(&mut count, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut page = QueryBuilder::<Postgres>::new(
            r#"
            SELECT ai.id AS entry_id, ai.step_no, ai.status AS entry_status, ai.assigned_at,
                   ca.id AS approval_id, ca.status AS approval_status, ca.current_step,
                   ca.total_steps, ca.is_urgent,
                   c.id AS claim_id, c.claim_number, c.claim_type, c.total_claimed_amount,
                   c.diagnosis_name, c.fraud_score, cu.name AS customer_name
            FROM approval_inbox ai
            JOIN claim_approvals ca ON ca.id = ai.claim_approval_id
            JOIN claims c ON c.id = ai.claim_id
            JOIN customers cu ON cu.id = c.customer_id
            WHERE ai.user_id = "#,
        );
        page.push_bind(user_id);
        push_inbox_filters(&mut page, filter);
        page.push(" ORDER BY ca.is_urgent DESC, ai.assigned_at LIMIT ")
            .push_bind(i64::from(filter.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(filter.offset()));
        let rows = page
            .build_query_as::<InboxItemRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    pub async fn pending_count(&self, user_id: Uuid) -> Result<i64, DatabaseError> {
        Ok(sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM approval_inbox WHERE user_id = $1 AND status = 'PENDING'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn history(&self, approval_id: Uuid) -> Result<Vec<HistoryRow>, DatabaseError> {
        Ok(sqlx::query_as::<_, HistoryRow>(&format!(
            "SELECT {HISTORY_COLUMNS} FROM approval_history \
             WHERE claim_approval_id = $1 ORDER BY decided_at"
        ))
        .bind(approval_id)
        .fetch_all(&self.pool)
        .await?)
    }
}

fn push_inbox_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &InboxFilter) {
    if let Some(status) = filter.status {
        builder.push(" AND ai.status = ").push_bind(status.as_str());
    }
    if filter.urgent_only {
        builder.push(" AND ca.is_urgent = TRUE");
    }
}

async fn insert_entries(
    tx: &mut Transaction<'_, Postgres>,
    entries: &[InboxEntry],
) -> Result<(), DatabaseError> {
    for entry in entries {
        sqlx::query(&format!(
            "INSERT INTO approval_inbox ({INBOX_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        ))
        .bind(entry.id.as_uuid())
        .bind(entry.approval_id.as_uuid())
        .bind(entry.claim_id.as_uuid())
        .bind(entry.user_id.as_uuid())
        .bind(entry.step_no as i32)
        .bind(entry.status.as_str())
        .bind(entry.assigned_at)
        .bind(entry.completed_at)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn insert_history(
    tx: &mut Transaction<'_, Postgres>,
    record: &ApprovalHistoryRecord,
) -> Result<(), DatabaseError> {
    sqlx::query(&format!(
        "INSERT INTO approval_history ({HISTORY_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"
    ))
    .bind(record.id.as_uuid())
    .bind(record.approval_id.as_uuid())
    .bind(record.claim_id.as_uuid())
    .bind(record.step_no as i32)
    .bind(&record.step_name)
    .bind(record.approver_id.as_uuid())
    .bind(&record.approver_name)
    .bind(&record.approver_role)
    .bind(&record.approver_department)
    .bind(record.action.as_str())
    .bind(record.adjusted_amount.map(|a| a.amount()))
    .bind(&record.comment)
    .bind(record.received_at)
    .bind(record.decided_at)
    .bind(record.processing_minutes)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn supersede_pending(
    tx: &mut Transaction<'_, Postgres>,
    approval_id: Uuid,
    at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    sqlx::query(
        "UPDATE approval_inbox SET status = 'SUPERSEDED', completed_at = $2 \
         WHERE claim_approval_id = $1 AND status = 'PENDING'",
    )
    .bind(approval_id)
    .bind(at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn set_current_approver(
    tx: &mut Transaction<'_, Postgres>,
    claim_id: Uuid,
    user_id: Uuid,
    at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    sqlx::query("UPDATE claims SET current_approver_id = $2, updated_at = $3 WHERE id = $1")
        .bind(claim_id)
        .bind(user_id)
        .bind(at)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
