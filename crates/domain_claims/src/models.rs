//! Scoring models
//!
//! A scoring model is a named parameter set the pipeline prices every claim
//! under. Models differ in how they perturb deductible rates, how confident
//! their recommendations start out and how they phrase their reasoning.
//! The default model's totals are the ones written to the claim; the others
//! are stored side by side for comparison.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::{code_enum, ScoringModelId, Won};
use domain_policy::PolicyValidation;

use crate::analysis::CoverageAnalysis;
use crate::calculator::PayoutLineItem;

code_enum! {
    /// How a model phrases its reasoning
    pub enum ReasoningStyle {
        Narrative => "NARRATIVE",
        Stepwise => "STEPWISE",
        Checklist => "CHECKLIST",
    }
}

code_enum! {
    pub enum ModelRecommendation {
        AutoApprove => "AUTO_APPROVE",
        ManualReview => "MANUAL_REVIEW",
        Reject => "REJECT",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringModel {
    /// Unset for the built-in default
    pub id: Option<ScoringModelId>,
    pub model_code: String,
    pub model_name: String,
    /// Fractional perturbation of deductible rates, e.g. `0.03`
    pub deductible_variation: Decimal,
    pub confidence_base: u8,
    pub reasoning_style: ReasoningStyle,
    pub is_default: bool,
}

impl ScoringModel {
    /// Model used when none is configured
    pub fn builtin_default() -> Self {
        Self {
            id: None,
            model_code: "default".to_string(),
            model_name: "Standard rules".to_string(),
            deductible_variation: Decimal::ZERO,
            confidence_base: 80,
            reasoning_style: ReasoningStyle::Narrative,
            is_default: true,
        }
    }

    /// Derives the model's recommendation and confidence
    pub fn recommend(
        &self,
        validation: &PolicyValidation,
        analysis: &CoverageAnalysis,
    ) -> (ModelRecommendation, u8) {
        if validation.exemption_applies {
            return (ModelRecommendation::Reject, 100);
        }
        let ratio = analysis.approval_ratio();
        let base = self.confidence_base;
        if ratio > dec!(0.8) && !validation.reduction_applies {
            (ModelRecommendation::AutoApprove, base.saturating_add(10).min(100))
        } else if ratio > dec!(0.5) {
            (ModelRecommendation::ManualReview, base.min(100))
        } else {
            (ModelRecommendation::ManualReview, base.saturating_sub(10))
        }
    }

    pub fn reasoning(
        &self,
        validation: &PolicyValidation,
        analysis: &CoverageAnalysis,
        recommendation: ModelRecommendation,
    ) -> String {
        match self.reasoning_style {
            ReasoningStyle::Narrative => narrative(validation, analysis, recommendation),
            ReasoningStyle::Stepwise => stepwise(validation, analysis, recommendation),
            ReasoningStyle::Checklist => checklist(validation, analysis, recommendation),
        }
    }

    /// Orders models default-first, keeping the given order otherwise
    pub fn default_first(mut models: Vec<ScoringModel>) -> Vec<ScoringModel> {
        if models.is_empty() {
            return vec![Self::builtin_default()];
        }
        models.sort_by_key(|m| !m.is_default);
        models
    }
}

/// One model's verdict on a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    pub model_id: Option<ScoringModelId>,
    pub model_code: String,
    pub model_name: String,
    pub recommendation: ModelRecommendation,
    pub confidence: u8,
    pub total_approved: Won,
    pub total_rejected: Won,
    pub breakdown: Vec<PayoutLineItem>,
    pub reasoning: String,
    pub response_time_ms: u64,
}

fn percent(ratio: Decimal) -> Decimal {
    (ratio * Decimal::ONE_HUNDRED).round_dp(1).normalize()
}

fn narrative(
    validation: &PolicyValidation,
    analysis: &CoverageAnalysis,
    recommendation: ModelRecommendation,
) -> String {
    let mut text = format!(
        "The policy is in force for the treatment date. Of {} won claimed across {} item(s), {} won is payable ({}%).",
        analysis.total_claimed,
        analysis.breakdown.len(),
        analysis.total_approved,
        percent(analysis.approval_ratio()),
    );
    if validation.reduction_applies {
        text.push_str(&format!(
            " Benefits are reduced by {} for the reduction period.",
            validation.reduction_rate
        ));
    }
    text.push_str(&format!(" Recommendation: {recommendation}."));
    text
}

fn stepwise(
    validation: &PolicyValidation,
    analysis: &CoverageAnalysis,
    recommendation: ModelRecommendation,
) -> String {
    let mut steps = vec![format!(
        "Policy check: valid{}",
        if validation.reduction_applies {
            format!(", reduction {} applies", validation.reduction_rate)
        } else {
            String::new()
        }
    )];
    for line in &analysis.breakdown {
        steps.push(format!("{}: {}", line.item, line.calculation));
    }
    steps.push(format!(
        "Totals: approved {}, rejected {}",
        analysis.total_approved, analysis.total_rejected
    ));
    steps.push(format!("Recommendation: {recommendation}"));
    steps
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s))
        .collect::<Vec<_>>()
        .join("\n")
}

fn checklist(
    validation: &PolicyValidation,
    analysis: &CoverageAnalysis,
    recommendation: ModelRecommendation,
) -> String {
    let mark = |ok: bool| if ok { "[x]" } else { "[ ]" };
    [
        format!("{} policy valid", mark(validation.is_valid)),
        format!("{} outside exemption period", mark(!validation.exemption_applies)),
        format!("{} outside reduction period", mark(!validation.reduction_applies)),
        format!(
            "{} approval ratio above 80% ({}%)",
            mark(analysis.approval_ratio() > dec!(0.8)),
            percent(analysis.approval_ratio())
        ),
        format!("=> {recommendation}"),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Percent;
    use domain_policy::CalculationKind;

    fn validation(reduction: bool) -> PolicyValidation {
        PolicyValidation {
            is_valid: true,
            issues: Vec::new(),
            exemption_applies: false,
            reduction_applies: reduction,
            reduction_rate: if reduction { Percent::whole(50) } else { Percent::ZERO },
        }
    }

    fn analysis(claimed: i64, approved: i64) -> CoverageAnalysis {
        let item = PayoutLineItem {
            item: "Hospitalization (insured)".into(),
            coverage_code: "DIS_HOSP_INS".into(),
            kind: CalculationKind::RealLoss,
            claimed_amount: Won::from_i64(claimed),
            approved_amount: Won::from_i64(approved),
            rejected_amount: Won::from_i64(claimed - approved),
            calculation: "x".into(),
            rejection_reason: None,
            term_reference: None,
        };
        CoverageAnalysis {
            total_claimed: item.claimed_amount,
            total_approved: item.approved_amount,
            total_rejected: item.rejected_amount,
            breakdown: vec![item],
            usage: Vec::new(),
        }
    }

    #[test]
    fn test_high_ratio_auto_approves() {
        let model = ScoringModel::builtin_default();
        let (rec, confidence) = model.recommend(&validation(false), &analysis(1_000, 900));
        assert_eq!(rec, ModelRecommendation::AutoApprove);
        assert_eq!(confidence, 90);
    }

    #[test]
    fn test_reduction_blocks_auto_approve() {
        let model = ScoringModel::builtin_default();
        let (rec, confidence) = model.recommend(&validation(true), &analysis(1_000, 900));
        assert_eq!(rec, ModelRecommendation::ManualReview);
        assert_eq!(confidence, 80);
    }

    #[test]
    fn test_low_ratio_lowers_confidence() {
        let model = ScoringModel::builtin_default();
        let (_, confidence) = model.recommend(&validation(false), &analysis(1_000, 400));
        assert_eq!(confidence, 70);
    }

    #[test]
    fn test_exemption_rejects() {
        let mut v = validation(false);
        v.exemption_applies = true;
        let (rec, confidence) = ScoringModel::builtin_default().recommend(&v, &analysis(1_000, 0));
        assert_eq!((rec, confidence), (ModelRecommendation::Reject, 100));
    }

    #[test]
    fn test_default_first_and_fallback() {
        assert_eq!(ScoringModel::default_first(Vec::new())[0].model_code, "default");

        let mut other = ScoringModel::builtin_default();
        other.model_code = "strict".into();
        other.is_default = false;
        let mut main = ScoringModel::builtin_default();
        main.model_code = "main".into();
        let ordered = ScoringModel::default_first(vec![other, main]);
        assert_eq!(ordered[0].model_code, "main");
    }

    #[test]
    fn test_reasoning_styles_differ() {
        let v = validation(true);
        let a = analysis(1_000, 500);
        let mut model = ScoringModel::builtin_default();
        let narrative = model.reasoning(&v, &a, ModelRecommendation::ManualReview);
        assert!(narrative.contains("reduced by 50%"));
        model.reasoning_style = ReasoningStyle::Stepwise;
        assert!(model
            .reasoning(&v, &a, ModelRecommendation::ManualReview)
            .starts_with("1. Policy check"));
        model.reasoning_style = ReasoningStyle::Checklist;
        assert!(model
            .reasoning(&v, &a, ModelRecommendation::ManualReview)
            .ends_with("=> MANUAL_REVIEW"));
    }
}
