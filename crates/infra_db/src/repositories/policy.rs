//! Policies, customers and coverage lines

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use core_kernel::{CoverageId, CustomerId, PolicyId};
use domain_policy::{Customer, Policy, PolicyCoverage};

use super::{code, opt_won, percent, unsigned, won};
use crate::error::DatabaseError;

#[derive(Debug, Clone, FromRow)]
pub struct PolicyRow {
    pub id: Uuid,
    pub policy_number: String,
    pub customer_id: Uuid,
    pub product_code: String,
    pub product_name: String,
    pub coverage_start_date: NaiveDate,
    pub coverage_end_date: NaiveDate,
    pub exemption_end_date: Option<NaiveDate>,
    pub reduction_end_date: Option<NaiveDate>,
    pub reduction_rate: Option<Decimal>,
    pub premium_status: String,
    pub status: String,
}

impl PolicyRow {
    pub fn into_domain(self) -> Result<Policy, DatabaseError> {
        Ok(Policy {
            id: PolicyId::from_uuid(self.id),
            policy_number: self.policy_number,
            customer_id: CustomerId::from_uuid(self.customer_id),
            product_code: self.product_code,
            product_name: self.product_name,
            coverage_start_date: self.coverage_start_date,
            coverage_end_date: self.coverage_end_date,
            exemption_end_date: self.exemption_end_date,
            reduction_end_date: self.reduction_end_date,
            reduction_rate: self
                .reduction_rate
                .map(|r| percent("reduction_rate", r))
                .transpose()?,
            premium_status: code("premium_status", &self.premium_status)?,
            status: code("status", &self.status)?,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CustomerRow {
    pub id: Uuid,
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub risk_grade: String,
    pub risk_score: i16,
}

impl CustomerRow {
    pub fn into_domain(self) -> Result<Customer, DatabaseError> {
        Ok(Customer {
            id: CustomerId::from_uuid(self.id),
            name: self.name,
            birth_date: self.birth_date,
            phone: self.phone,
            risk_grade: code("risk_grade", &self.risk_grade)?,
            risk_score: unsigned("risk_score", self.risk_score)?,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct CoverageRow {
    pub id: Uuid,
    pub policy_id: Uuid,
    pub coverage_code: String,
    pub coverage_name: String,
    pub calculation_kind: String,
    pub insured_amount: Decimal,
    pub deductible_amount: Decimal,
    pub deductible_rate: Decimal,
    pub payout_rate: Decimal,
    pub per_occurrence_limit: Option<Decimal>,
    pub annual_limit: Option<Decimal>,
    pub lifetime_limit: Option<Decimal>,
    pub used_annual_amount: Decimal,
    pub used_days: i32,
    pub max_days: Option<i32>,
    pub surgery_tier: Option<i16>,
    pub is_active: bool,
}

impl CoverageRow {
    pub fn into_domain(self) -> Result<PolicyCoverage, DatabaseError> {
        Ok(PolicyCoverage {
            id: CoverageId::from_uuid(self.id),
            policy_id: PolicyId::from_uuid(self.policy_id),
            coverage_code: self.coverage_code,
            coverage_name: self.coverage_name,
            calculation_kind: code("calculation_kind", &self.calculation_kind)?,
            insured_amount: won(self.insured_amount),
            deductible_amount: won(self.deductible_amount),
            deductible_rate: percent("deductible_rate", self.deductible_rate)?,
            payout_rate: percent("payout_rate", self.payout_rate)?,
            per_occurrence_limit: opt_won(self.per_occurrence_limit),
            annual_limit: opt_won(self.annual_limit),
            lifetime_limit: opt_won(self.lifetime_limit),
            used_annual_amount: won(self.used_annual_amount),
            used_days: unsigned("used_days", self.used_days)?,
            max_days: self.max_days.map(|d| unsigned("max_days", d)).transpose()?,
            surgery_tier: self
                .surgery_tier
                .map(|t| unsigned("surgery_tier", t))
                .transpose()?,
            is_active: self.is_active,
        })
    }
}

const POLICY_COLUMNS: &str = "id, policy_number, customer_id, product_code, product_name, \
     coverage_start_date, coverage_end_date, exemption_end_date, reduction_end_date, \
     reduction_rate, premium_status, status";

#[derive(Debug, Clone)]
pub struct PolicyRepository {
    pool: PgPool,
}

impl PolicyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_number(&self, policy_number: &str) -> Result<Option<PolicyRow>, DatabaseError> {
        let row = sqlx::query_as::<_, PolicyRow>(&format!(
            "SELECT {POLICY_COLUMNS} FROM policies WHERE policy_number = $1"
        ))
        .bind(policy_number)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get(&self, id: Uuid) -> Result<PolicyRow, DatabaseError> {
        sqlx::query_as::<_, PolicyRow>(&format!("SELECT {POLICY_COLUMNS} FROM policies WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Policy", id))
    }

    pub async fn get_customer(&self, id: Uuid) -> Result<CustomerRow, DatabaseError> {
        sqlx::query_as::<_, CustomerRow>(
            "SELECT id, name, birth_date, phone, risk_grade, risk_score FROM customers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Customer", id))
    }

    pub async fn active_coverages(&self, policy_id: Uuid) -> Result<Vec<CoverageRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, CoverageRow>(
            r#"
            SELECT id, policy_id, coverage_code, coverage_name, calculation_kind,
                   insured_amount, deductible_amount, deductible_rate, payout_rate,
                   per_occurrence_limit, annual_limit, lifetime_limit,
                   used_annual_amount, used_days, max_days, surgery_tier, is_active
            FROM policy_coverages
            WHERE policy_id = $1 AND is_active = TRUE
            ORDER BY coverage_code
            "#,
        )
        .bind(policy_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn coverage_row() -> CoverageRow {
        CoverageRow {
            id: Uuid::new_v4(),
            policy_id: Uuid::new_v4(),
            coverage_code: "DIS_HOSP_DAILY".into(),
            coverage_name: "Daily hospitalization".into(),
            calculation_kind: "DAILY".into(),
            insured_amount: dec!(30000),
            deductible_amount: dec!(0),
            deductible_rate: dec!(0),
            payout_rate: dec!(100),
            per_occurrence_limit: None,
            annual_limit: None,
            lifetime_limit: None,
            used_annual_amount: dec!(0),
            used_days: 12,
            max_days: Some(180),
            surgery_tier: None,
            is_active: true,
        }
    }

    #[test]
    fn test_coverage_row_maps() {
        let coverage = coverage_row().into_domain().unwrap();
        assert_eq!(coverage.used_days, 12);
        assert_eq!(coverage.max_days, Some(180));
        assert_eq!(coverage.calculation_kind, domain_policy::CalculationKind::Daily);
    }

    #[test]
    fn test_negative_usage_is_corrupt() {
        let mut row = coverage_row();
        row.used_days = -3;
        assert!(row.into_domain().is_err());
    }
}
