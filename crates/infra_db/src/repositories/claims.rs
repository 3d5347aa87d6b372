//! Claims, model results, fraud audits and claim history lookups

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use tracing::debug;
use uuid::Uuid;

use core_kernel::{ClaimId, CoverageId, CustomerId, PolicyId, UserId, Won};
use domain_claims::{
    scale_usage, AdjudicationRecord, Claim, ClaimStatus, CoverageUsage, DuplicateKey,
    FraudAnalysis, HistoryQuery,
};

use super::{code, opt_code, to_json, unsigned, won};
use crate::error::DatabaseError;

#[derive(Debug, Clone, FromRow)]
pub struct ClaimRow {
    pub id: Uuid,
    pub claim_number: String,
    pub policy_id: Uuid,
    pub customer_id: Uuid,
    pub claim_type: String,
    pub claim_date: NaiveDate,
    pub treatment_start_date: NaiveDate,
    pub treatment_end_date: NaiveDate,
    pub hospital_name: String,
    pub diagnosis_code: String,
    pub diagnosis_name: Option<String>,
    pub surgery_code: Option<String>,
    pub surgery_name: Option<String>,
    pub hospitalization_days: i32,
    pub total_medical_expense: Decimal,
    pub insured_expense: Decimal,
    pub uninsured_expense: Decimal,
    pub total_claimed_amount: Decimal,
    pub total_approved_amount: Decimal,
    pub total_rejected_amount: Decimal,
    pub status: String,
    pub fraud_score: i16,
    pub fraud_flags: Vec<String>,
    pub fraud_check_passed: Option<bool>,
    pub ai_recommendation: Option<String>,
    pub confidence_score: i16,
    pub auto_processable: bool,
    pub decision: Option<String>,
    pub analysis: serde_json::Value,
    pub approval_status: Option<String>,
    pub current_approver_id: Option<Uuid>,
    pub decision_reason: Option<String>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub hold_status: String,
    pub hold_reason: Option<String>,
    pub siu_referral_reason: Option<String>,
    pub siu_referred_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClaimRow {
    pub fn into_domain(self) -> Result<Claim, DatabaseError> {
        Ok(Claim {
            id: ClaimId::from_uuid(self.id),
            claim_number: self.claim_number,
            policy_id: PolicyId::from_uuid(self.policy_id),
            customer_id: CustomerId::from_uuid(self.customer_id),
            claim_type: code("claim_type", &self.claim_type)?,
            claim_date: self.claim_date,
            treatment_start_date: self.treatment_start_date,
            treatment_end_date: self.treatment_end_date,
            hospital_name: self.hospital_name,
            diagnosis_code: self.diagnosis_code,
            diagnosis_name: self.diagnosis_name,
            surgery_code: self.surgery_code,
            surgery_name: self.surgery_name,
            hospitalization_days: unsigned("hospitalization_days", self.hospitalization_days)?,
            total_medical_expense: won(self.total_medical_expense),
            insured_expense: won(self.insured_expense),
            uninsured_expense: won(self.uninsured_expense),
            total_claimed_amount: won(self.total_claimed_amount),
            total_approved_amount: won(self.total_approved_amount),
            total_rejected_amount: won(self.total_rejected_amount),
            status: code("status", &self.status)?,
            fraud_score: unsigned("fraud_score", self.fraud_score)?,
            fraud_flags: self.fraud_flags,
            fraud_check_passed: self.fraud_check_passed,
            ai_recommendation: self.ai_recommendation,
            confidence_score: unsigned("confidence_score", self.confidence_score)?,
            auto_processable: self.auto_processable,
            decision: self.decision,
            analysis: self.analysis,
            approval_status: opt_code("approval_status", self.approval_status.as_deref())?,
            current_approver_id: self.current_approver_id.map(UserId::from_uuid),
            decision_reason: self.decision_reason,
            approved_by: self.approved_by.map(UserId::from_uuid),
            approved_at: self.approved_at,
            hold_status: code("hold_status", &self.hold_status)?,
            hold_reason: self.hold_reason,
            siu_referral_reason: self.siu_referral_reason,
            siu_referred_at: self.siu_referred_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

pub(crate) const CLAIM_COLUMNS: &str = "id, claim_number, policy_id, customer_id, claim_type, \
     claim_date, treatment_start_date, treatment_end_date, hospital_name, diagnosis_code, \
     diagnosis_name, surgery_code, surgery_name, hospitalization_days, total_medical_expense, \
     insured_expense, uninsured_expense, total_claimed_amount, total_approved_amount, \
     total_rejected_amount, status, fraud_score, fraud_flags, fraud_check_passed, \
     ai_recommendation, confidence_score, auto_processable, decision, analysis, approval_status, \
     current_approver_id, decision_reason, approved_by, approved_at, hold_status, hold_reason, \
     siu_referral_reason, siu_referred_at, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct ClaimRepository {
    pool: PgPool,
}

impl ClaimRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Next value of the per-year claim sequence
    pub async fn next_sequence(&self, year: i32) -> Result<i64, DatabaseError> {
        let value = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO claim_number_sequences (year, last_value) VALUES ($1, 1)
            ON CONFLICT (year) DO UPDATE SET last_value = claim_number_sequences.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(year)
        .fetch_one(&self.pool)
        .await?;
        Ok(value)
    }

    /// Inserts the claim, its model results and its coverage usage, and for
    /// approved claims adds the payout to the coverage counters, in one
    /// transaction
    pub async fn insert_adjudication(&self, record: &AdjudicationRecord) -> Result<(), DatabaseError> {
        let claim = &record.claim;
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "INSERT INTO claims ({CLAIM_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, \
              $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31, $32, $33, $34, $35, $36, $37, $38, $39, $40)"
        ))
        .bind(claim.id.as_uuid())
        .bind(&claim.claim_number)
        .bind(claim.policy_id.as_uuid())
        .bind(claim.customer_id.as_uuid())
        .bind(claim.claim_type.as_str())
        .bind(claim.claim_date)
        .bind(claim.treatment_start_date)
        .bind(claim.treatment_end_date)
        .bind(&claim.hospital_name)
        .bind(&claim.diagnosis_code)
        .bind(&claim.diagnosis_name)
        .bind(&claim.surgery_code)
        .bind(&claim.surgery_name)
        .bind(claim.hospitalization_days as i32)
        .bind(claim.total_medical_expense.amount())
        .bind(claim.insured_expense.amount())
        .bind(claim.uninsured_expense.amount())
        .bind(claim.total_claimed_amount.amount())
        .bind(claim.total_approved_amount.amount())
        .bind(claim.total_rejected_amount.amount())
        .bind(claim.status.as_str())
        .bind(i16::from(claim.fraud_score))
        .bind(&claim.fraud_flags)
        .bind(claim.fraud_check_passed)
        .bind(&claim.ai_recommendation)
        .bind(i16::from(claim.confidence_score))
        .bind(claim.auto_processable)
        .bind(&claim.decision)
        .bind(&claim.analysis)
        .bind(claim.approval_status.map(|s| s.as_str()))
        .bind(claim.current_approver_id.map(Uuid::from))
        .bind(&claim.decision_reason)
        .bind(claim.approved_by.map(Uuid::from))
        .bind(claim.approved_at)
        .bind(claim.hold_status.as_str())
        .bind(&claim.hold_reason)
        .bind(&claim.siu_referral_reason)
        .bind(claim.siu_referred_at)
        .bind(claim.created_at)
        .bind(claim.updated_at)
        .execute(&mut *tx)
        .await?;

        for result in &record.model_results {
            sqlx::query(
                r#"
                INSERT INTO claim_ai_results
                    (claim_id, model_id, model_code, model_name, recommendation, confidence,
                     total_approved, total_rejected, breakdown, reasoning, response_time_ms)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(claim.id.as_uuid())
            .bind(result.model_id.map(Uuid::from))
            .bind(&result.model_code)
            .bind(&result.model_name)
            .bind(result.recommendation.as_str())
            .bind(i16::from(result.confidence))
            .bind(result.total_approved.amount())
            .bind(result.total_rejected.amount())
            .bind(to_json("breakdown", &result.breakdown)?)
            .bind(&result.reasoning)
            .bind(i64::try_from(result.response_time_ms).unwrap_or(i64::MAX))
            .execute(&mut *tx)
            .await?;
        }

        for usage in &record.usage {
            sqlx::query(
                "INSERT INTO claim_coverage_usage (claim_id, coverage_id, amount, days) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(claim.id.as_uuid())
            .bind(usage.coverage_id.as_uuid())
            .bind(usage.amount.amount())
            .bind(usage.days as i32)
            .execute(&mut *tx)
            .await?;
        }
        if claim.status == ClaimStatus::Approved {
            consume_coverage_usage(
                &mut tx,
                *claim.id.as_uuid(),
                claim.total_approved_amount,
                claim.updated_at,
            )
            .await?;
        }

        tx.commit().await?;
        debug!(claim_number = %claim.claim_number, "adjudication persisted");
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<ClaimRow, DatabaseError> {
        sqlx::query_as::<_, ClaimRow>(&format!("SELECT {CLAIM_COLUMNS} FROM claims WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Claim", id))
    }

    /// Stores a fraud audit and copies its verdict onto the claim
    pub async fn insert_fraud_audit(&self, claim_id: Uuid, analysis: &FraudAnalysis) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE claims
            SET fraud_score = $2, fraud_flags = $3, fraud_check_passed = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(claim_id)
        .bind(i16::from(analysis.score))
        .bind(analysis.pattern_codes())
        .bind(analysis.passed())
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Claim", claim_id));
        }

        sqlx::query(
            r#"
            INSERT INTO fraud_detection_results
                (claim_id, profile, score, risk_level, recommendation, patterns)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(claim_id)
        .bind(analysis.profile.as_str())
        .bind(i16::from(analysis.score))
        .bind(analysis.risk_level.as_str())
        .bind(analysis.recommendation.as_str())
        .bind(to_json("patterns", &analysis.patterns)?)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn mark_siu_referred(&self, claim_id: Uuid, reason: &str) -> Result<ClaimRow, DatabaseError> {
        sqlx::query_as::<_, ClaimRow>(&format!(
            r#"
            UPDATE claims
            SET status = 'SIU_REFERRED', siu_referral_reason = $2,
                siu_referred_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {CLAIM_COLUMNS}
            "#
        ))
        .bind(claim_id)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Claim", claim_id))
    }

    pub async fn count_history(&self, query: &HistoryQuery) -> Result<i64, DatabaseError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM claims WHERE customer_id = ");
        builder.push_bind(*query.customer_id.as_uuid());
        if let Some(since) = query.since {
            builder.push(" AND claim_date >= ").push_bind(since);
        }
        if let Some(code) = &query.diagnosis_code {
            builder.push(" AND diagnosis_code = ").push_bind(code.clone());
        }
        if let Some(hospital) = &query.hospital_name {
            builder.push(" AND hospital_name = ").push_bind(hospital.clone());
        }
        if query.weekend_admission_only {
            // Friday admission, Monday discharge
            builder.push(
                " AND EXTRACT(DOW FROM treatment_start_date) = 5 \
                  AND EXTRACT(DOW FROM treatment_end_date) = 1",
            );
        }
        if let Some(exclude) = query.exclude {
            builder.push(" AND id <> ").push_bind(*exclude.as_uuid());
        }

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn find_duplicate(&self, key: &DuplicateKey) -> Result<Option<String>, DatabaseError> {
        Ok(sqlx::query_scalar::<_, String>(
            r#"
            SELECT claim_number FROM claims
            WHERE customer_id = $1 AND diagnosis_code = $2 AND hospital_name = $3
              AND treatment_start_date = $4
              AND ($5::uuid IS NULL OR id <> $5)
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(key.customer_id.as_uuid())
        .bind(&key.diagnosis_code)
        .bind(&key.hospital_name)
        .bind(key.treatment_start_date)
        .bind(key.exclude.map(Uuid::from))
        .fetch_optional(&self.pool)
        .await?)
    }
}

#[derive(Debug, FromRow)]
struct UsageRow {
    id: i64,
    coverage_id: Uuid,
    amount: Decimal,
    days: i32,
}

/// Adds a claim's unapplied usage to its coverage counters
///
/// Must run before the claim's approved total is overwritten: usage is
/// scaled from the adjudicated total to `approved`. Increments happen in
/// SQL so concurrent approvals on one policy never lose an update.
pub(crate) async fn consume_coverage_usage(
    tx: &mut Transaction<'_, Postgres>,
    claim_id: Uuid,
    approved: Won,
    at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let adjudicated: Decimal =
        sqlx::query_scalar("SELECT total_approved_amount FROM claims WHERE id = $1 FOR UPDATE")
            .bind(claim_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Claim", claim_id))?;

    let rows = sqlx::query_as::<_, UsageRow>(
        "SELECT id, coverage_id, amount, days FROM claim_coverage_usage \
         WHERE claim_id = $1 AND applied_at IS NULL ORDER BY id FOR UPDATE",
    )
    .bind(claim_id)
    .fetch_all(&mut **tx)
    .await?;
    if rows.is_empty() {
        return Ok(());
    }

    let recorded = rows
        .iter()
        .map(|row| {
            Ok(CoverageUsage {
                coverage_id: CoverageId::from_uuid(row.coverage_id),
                amount: won(row.amount),
                days: unsigned("days", row.days)?,
            })
        })
        .collect::<Result<Vec<_>, DatabaseError>>()?;
    let consumed = scale_usage(&recorded, won(adjudicated), approved);

    for (row, usage) in rows.iter().zip(&consumed) {
        sqlx::query(
            r#"
            UPDATE policy_coverages
            SET used_annual_amount = used_annual_amount + $2,
                used_days = used_days + $3
            WHERE id = $1
            "#,
        )
        .bind(row.coverage_id)
        .bind(usage.amount.amount())
        .bind(usage.days as i32)
        .execute(&mut **tx)
        .await?;

        sqlx::query(
            "UPDATE claim_coverage_usage SET amount = $2, days = $3, applied_at = $4 WHERE id = $1",
        )
        .bind(row.id)
        .bind(usage.amount.amount())
        .bind(usage.days as i32)
        .bind(at)
        .execute(&mut **tx)
        .await?;
    }
    debug!(%claim_id, lines = consumed.len(), "coverage usage consumed");
    Ok(())
}
