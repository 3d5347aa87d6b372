//! Reference tables: diagnoses, surgeries, policy terms and scoring models

use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use core_kernel::ScoringModelId;
use domain_claims::ScoringModel;
use domain_policy::{DiagnosisInfo, PolicyTerm, SurgeryInfo};

use super::{code, unsigned};
use crate::error::DatabaseError;

#[derive(Debug, Clone, FromRow)]
pub struct DiagnosisRow {
    pub code: String,
    pub name: String,
    pub fraud_risk_base: Decimal,
    pub standard_treatment_days: Option<i32>,
}

impl DiagnosisRow {
    pub fn into_domain(self) -> Result<DiagnosisInfo, DatabaseError> {
        Ok(DiagnosisInfo {
            code: self.code,
            name: self.name,
            fraud_risk_base: self.fraud_risk_base,
            standard_treatment_days: self
                .standard_treatment_days
                .map(|d| unsigned("standard_treatment_days", d))
                .transpose()?,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SurgeryRow {
    pub code: String,
    pub name: String,
    pub tier: i16,
}

impl SurgeryRow {
    pub fn into_domain(self) -> Result<SurgeryInfo, DatabaseError> {
        Ok(SurgeryInfo {
            code: self.code,
            name: self.name,
            tier: unsigned("tier", self.tier)?,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TermRow {
    pub term_code: String,
    pub article_number: String,
    pub clause_number: Option<String>,
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub calculation_formula: Option<String>,
    pub category: String,
    pub applies_to: Vec<String>,
}

impl TermRow {
    pub fn into_domain(self) -> Result<PolicyTerm, DatabaseError> {
        Ok(PolicyTerm {
            term_code: self.term_code,
            article_number: self.article_number,
            clause_number: self.clause_number,
            title: self.title,
            content: self.content,
            summary: self.summary,
            calculation_formula: self.calculation_formula,
            category: code("category", &self.category)?,
            applies_to: self.applies_to,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ScoringModelRow {
    pub id: Uuid,
    pub model_code: String,
    pub model_name: String,
    pub deductible_variation: Decimal,
    pub confidence_base: i16,
    pub reasoning_style: String,
    pub is_default: bool,
}

impl ScoringModelRow {
    pub fn into_domain(self) -> Result<ScoringModel, DatabaseError> {
        Ok(ScoringModel {
            id: Some(ScoringModelId::from_uuid(self.id)),
            model_code: self.model_code,
            model_name: self.model_name,
            deductible_variation: self.deductible_variation,
            confidence_base: unsigned("confidence_base", self.confidence_base)?,
            reasoning_style: code("reasoning_style", &self.reasoning_style)?,
            is_default: self.is_default,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ReferenceRepository {
    pool: PgPool,
}

impl ReferenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_diagnosis(&self, code: &str) -> Result<Option<DiagnosisRow>, DatabaseError> {
        Ok(sqlx::query_as::<_, DiagnosisRow>(
            "SELECT code, name, fraud_risk_base, standard_treatment_days FROM diagnosis_codes WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn find_surgery(&self, code: &str) -> Result<Option<SurgeryRow>, DatabaseError> {
        Ok(
            sqlx::query_as::<_, SurgeryRow>("SELECT code, name, tier FROM surgery_codes WHERE code = $1")
                .bind(code)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    pub async fn terms_for_product(&self, product_code: &str) -> Result<Vec<TermRow>, DatabaseError> {
        Ok(sqlx::query_as::<_, TermRow>(
            r#"
            SELECT term_code, article_number, clause_number, title, content, summary,
                   calculation_formula, category, applies_to
            FROM policy_terms
            WHERE product_code = $1
            ORDER BY sort_order, article_number
            "#,
        )
        .bind(product_code)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn active_models(&self) -> Result<Vec<ScoringModelRow>, DatabaseError> {
        Ok(sqlx::query_as::<_, ScoringModelRow>(
            r#"
            SELECT id, model_code, model_name, deductible_variation, confidence_base,
                   reasoning_style, is_default
            FROM scoring_models
            WHERE is_active = TRUE
            ORDER BY is_default DESC, model_code
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }
}
