//! Coverage analysis
//!
//! Selects the coverage lines a claim touches and prices each with the
//! matching calculator function.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{Percent, Won};
use domain_policy::coverage::codes;
use domain_policy::{CoverageSet, PolicyCoverage, SurgeryInfo, TermBook};

use crate::calculator::{
    daily_allowance, lump_sum, real_loss, DailyInput, LumpSumInput, PayoutLineItem, RealLossInput,
};
use crate::claim::{ClaimSubmission, ClaimType};
use crate::error::ClaimError;
use crate::ports::CoverageUsage;

/// Priced breakdown of one claim under one scoring model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageAnalysis {
    pub breakdown: Vec<PayoutLineItem>,
    pub total_claimed: Won,
    pub total_approved: Won,
    pub total_rejected: Won,
    #[serde(skip)]
    pub usage: Vec<CoverageUsage>,
}

impl CoverageAnalysis {
    fn from_lines(lines: Vec<(PayoutLineItem, Option<CoverageUsage>)>) -> Self {
        let mut breakdown = Vec::with_capacity(lines.len());
        let mut usage = Vec::new();
        for (item, used) in lines {
            usage.extend(used);
            breakdown.push(item);
        }
        Self {
            total_claimed: breakdown.iter().map(|l| l.claimed_amount).sum(),
            total_approved: breakdown.iter().map(|l| l.approved_amount).sum(),
            total_rejected: breakdown.iter().map(|l| l.rejected_amount).sum(),
            breakdown,
            usage,
        }
    }

    /// Approved share of the claimed total, 0 when nothing was claimed
    pub fn approval_ratio(&self) -> Decimal {
        if self.total_claimed.is_zero() {
            return Decimal::ZERO;
        }
        self.total_approved.amount() / self.total_claimed.amount()
    }

    /// Approved items for decision text, e.g. `Hospitalization (insured) 1,100,000 won`
    pub fn approved_items(&self) -> Vec<String> {
        self.breakdown
            .iter()
            .filter(|l| l.approved_amount.is_positive())
            .map(|l| format!("{} {} won", l.item, l.approved_amount))
            .collect()
    }
}

/// Inputs shared by every model run for one claim
#[derive(Debug, Clone, Copy)]
pub struct CoverageRequest<'a> {
    pub submission: &'a ClaimSubmission,
    pub coverages: &'a CoverageSet,
    pub surgery: Option<&'a SurgeryInfo>,
    pub reduction_rate: Percent,
    pub terms: &'a TermBook,
}

/// Prices the claim with the deductible rate perturbed by `deductible_variation`
pub fn analyze_coverage(
    request: &CoverageRequest<'_>,
    deductible_variation: Decimal,
) -> Result<CoverageAnalysis, ClaimError> {
    let submission = request.submission;
    let reduction = request.reduction_rate;
    let mut lines = Vec::new();

    if matches!(submission.claim_type, ClaimType::Hospitalization | ClaimType::Surgery) {
        for (code, expense) in [
            (codes::HOSP_INSURED, submission.insured_expense),
            (codes::HOSP_UNINSURED, submission.uninsured_expense),
        ] {
            let Some(line) = request.coverages.by_code(code) else {
                continue;
            };
            if !expense.is_positive() {
                continue;
            }
            let input = RealLossInput {
                item: line.coverage_name.clone(),
                coverage_code: line.coverage_code.clone(),
                claimed: expense,
                flat_deductible: line.deductible_amount,
                deductible_rate: perturbed_rate(line, deductible_variation),
                payout_rate: line.payout_rate,
                reduction_rate: reduction,
                limit: line.annual_limit,
                used: line.used_annual_amount,
            };
            let item = real_loss(&input)?;
            let usage = amount_usage(line, item.approved_amount);
            lines.push((item, usage));
        }
    }

    if submission.hospitalization_days > 0 {
        if let Some(line) = request.coverages.by_code(codes::HOSP_DAILY) {
            let max_days = line.max_days_or_default();
            let input = DailyInput {
                item: line.coverage_name.clone(),
                coverage_code: line.coverage_code.clone(),
                daily_amount: line.insured_amount,
                requested_days: submission.hospitalization_days,
                max_days,
                used_days: line.used_days,
                reduction_rate: reduction,
            };
            let item = daily_allowance(&input)?;
            let payable_days = submission
                .hospitalization_days
                .min(max_days.saturating_sub(line.used_days));
            let usage = (payable_days > 0).then(|| CoverageUsage {
                coverage_id: line.id,
                amount: Won::ZERO,
                days: payable_days,
            });
            lines.push((item, usage));
        }
    }

    if submission.claim_type == ClaimType::Surgery {
        if let Some(surgery) = request.surgery {
            if let Some(line) = request.coverages.surgery_for_tier(surgery.tier) {
                let input = LumpSumInput {
                    item: line.coverage_name.clone(),
                    coverage_code: line.coverage_code.clone(),
                    insured_amount: line.insured_amount,
                    tier: surgery.tier,
                    reduction_rate: reduction,
                };
                let item = lump_sum(&input)?;
                let usage = amount_usage(line, item.approved_amount);
                lines.push((item, usage));
            }
        }
    }

    if submission.claim_type == ClaimType::Outpatient {
        for (code, expense) in [
            (codes::OUTPATIENT_INSURED, submission.insured_expense),
            (codes::OUTPATIENT_UNINSURED, submission.uninsured_expense),
        ] {
            let Some(line) = request.coverages.by_code(code) else {
                continue;
            };
            if !expense.is_positive() {
                continue;
            }
            let input = RealLossInput {
                item: line.coverage_name.clone(),
                coverage_code: line.coverage_code.clone(),
                claimed: expense,
                flat_deductible: line.deductible_amount,
                deductible_rate: perturbed_rate(line, deductible_variation),
                payout_rate: line.payout_rate,
                reduction_rate: reduction,
                limit: Some(line.occurrence_limit()),
                used: Won::ZERO,
            };
            let item = real_loss(&input)?;
            let usage = amount_usage(line, item.approved_amount);
            lines.push((item, usage));
        }
    }

    let lines = lines
        .into_iter()
        .map(|(item, usage)| (item.cite(request.terms), usage))
        .collect();
    Ok(CoverageAnalysis::from_lines(lines))
}

fn perturbed_rate(line: &PolicyCoverage, variation: Decimal) -> Decimal {
    (line.deductible_rate.value() * (Decimal::ONE + variation))
        .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
}

fn amount_usage(line: &PolicyCoverage, approved: Won) -> Option<CoverageUsage> {
    approved.is_positive().then(|| CoverageUsage {
        coverage_id: line.id,
        amount: approved,
        days: 0,
    })
}

/// Coverage usage to consume when a claim is approved for `approved`
/// instead of the `adjudicated` total the usage was priced at.
///
/// Amounts shrink in proportion when less is approved; nothing is consumed
/// when the approval is zero. Approving more than was priced consumes the
/// usage as recorded. Order and length of `usage` are preserved.
pub fn scale_usage(
    usage: &[CoverageUsage],
    adjudicated: Won,
    approved: Won,
) -> Vec<CoverageUsage> {
    if approved.is_zero() {
        return usage
            .iter()
            .map(|u| CoverageUsage {
                amount: Won::ZERO,
                days: 0,
                ..u.clone()
            })
            .collect();
    }
    if adjudicated.is_zero() || approved >= adjudicated {
        return usage.to_vec();
    }
    let factor = approved.amount() / adjudicated.amount();
    usage
        .iter()
        .map(|u| CoverageUsage {
            amount: Won::new(u.amount.amount() * factor),
            ..u.clone()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_kernel::{CoverageId, PolicyId};
    use domain_policy::CalculationKind;
    use rust_decimal_macros::dec;

    fn line(code: &str, kind: CalculationKind, insured: i64) -> PolicyCoverage {
        PolicyCoverage {
            id: CoverageId::new(),
            policy_id: PolicyId::new(),
            coverage_code: code.to_string(),
            coverage_name: code.to_string(),
            calculation_kind: kind,
            insured_amount: Won::from_i64(insured),
            deductible_amount: Won::from_i64(100_000),
            deductible_rate: Percent::ZERO,
            payout_rate: Percent::FULL,
            per_occurrence_limit: None,
            annual_limit: Some(Won::from_i64(50_000_000)),
            lifetime_limit: None,
            used_annual_amount: Won::ZERO,
            used_days: 0,
            max_days: None,
            surgery_tier: None,
            is_active: true,
        }
    }

    fn submission(claim_type: ClaimType) -> ClaimSubmission {
        ClaimSubmission {
            policy_number: "POL-1".into(),
            customer_name: "Lee".into(),
            claim_type,
            claim_date: None,
            treatment_start_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            treatment_end_date: NaiveDate::from_ymd_opt(2024, 5, 4).unwrap(),
            hospital_name: "Seoul General".into(),
            diagnosis_code: "K35.8".into(),
            diagnosis_name: None,
            surgery_code: None,
            surgery_name: None,
            hospitalization_days: 3,
            total_medical_expense: Won::from_i64(1_200_000),
            insured_expense: Won::from_i64(1_200_000),
            uninsured_expense: Won::ZERO,
        }
    }

    fn set() -> CoverageSet {
        let mut daily = line(codes::HOSP_DAILY, CalculationKind::Daily, 30_000);
        daily.deductible_amount = Won::ZERO;
        let mut surgery = line("DIS_SURG_3", CalculationKind::LumpSum, 1_000_000);
        surgery.surgery_tier = Some(3);
        CoverageSet::new(vec![
            line(codes::HOSP_INSURED, CalculationKind::RealLoss, 0),
            line(codes::HOSP_UNINSURED, CalculationKind::RealLoss, 0),
            daily,
            surgery,
            line(codes::OUTPATIENT_INSURED, CalculationKind::RealLoss, 250_000),
        ])
    }

    #[test]
    fn test_hospitalization_prices_real_loss_and_daily() {
        let coverages = set();
        let terms = TermBook::default();
        let submission = submission(ClaimType::Hospitalization);
        let request = CoverageRequest {
            submission: &submission,
            coverages: &coverages,
            surgery: None,
            reduction_rate: Percent::ZERO,
            terms: &terms,
        };
        let analysis = analyze_coverage(&request, Decimal::ZERO).unwrap();
        let codes: Vec<_> = analysis.breakdown.iter().map(|l| l.coverage_code.as_str()).collect();
        assert_eq!(codes, vec!["DIS_HOSP_INS", "DIS_HOSP_DAILY"]);
        assert_eq!(analysis.total_approved, Won::from_i64(1_190_000));
        assert_eq!(analysis.usage.len(), 2);
        assert_eq!(analysis.usage[1].days, 3);
    }

    #[test]
    fn test_surgery_adds_tier_lump_sum() {
        let coverages = set();
        let terms = TermBook::default();
        let mut submission = submission(ClaimType::Surgery);
        submission.hospitalization_days = 0;
        let surgery = SurgeryInfo { code: "Q1".into(), name: "Appendectomy".into(), tier: 3 };
        let request = CoverageRequest {
            submission: &submission,
            coverages: &coverages,
            surgery: Some(&surgery),
            reduction_rate: Percent::ZERO,
            terms: &terms,
        };
        let analysis = analyze_coverage(&request, Decimal::ZERO).unwrap();
        assert!(analysis.breakdown.iter().any(|l| l.coverage_code == "DIS_SURG_3"));
        assert_eq!(analysis.total_approved, Won::from_i64(2_100_000));
    }

    #[test]
    fn test_outpatient_uses_occurrence_limit() {
        let coverages = set();
        let terms = TermBook::default();
        let mut submission = submission(ClaimType::Outpatient);
        submission.hospitalization_days = 0;
        let request = CoverageRequest {
            submission: &submission,
            coverages: &coverages,
            surgery: None,
            reduction_rate: Percent::ZERO,
            terms: &terms,
        };
        let analysis = analyze_coverage(&request, Decimal::ZERO).unwrap();
        assert_eq!(analysis.breakdown.len(), 1);
        assert_eq!(analysis.total_approved, Won::from_i64(250_000));
        assert_eq!(
            analysis.breakdown[0].rejection_reason.as_deref(),
            Some("annual limit reached")
        );
    }

    #[test]
    fn test_variation_scales_deductible_rate() {
        let mut ins = line(codes::HOSP_INSURED, CalculationKind::RealLoss, 0);
        ins.deductible_amount = Won::ZERO;
        ins.deductible_rate = Percent::whole(10);
        let coverages = CoverageSet::new(vec![ins]);
        let terms = TermBook::default();
        let mut submission = submission(ClaimType::Hospitalization);
        submission.hospitalization_days = 0;
        let request = CoverageRequest {
            submission: &submission,
            coverages: &coverages,
            surgery: None,
            reduction_rate: Percent::ZERO,
            terms: &terms,
        };
        let base = analyze_coverage(&request, Decimal::ZERO).unwrap();
        let strict = analyze_coverage(&request, dec!(0.5)).unwrap();
        assert_eq!(base.total_approved, Won::from_i64(1_080_000));
        assert_eq!(strict.total_approved, Won::from_i64(1_020_000));
    }

    #[test]
    fn test_empty_claim_has_zero_ratio() {
        let analysis = CoverageAnalysis::from_lines(Vec::new());
        assert_eq!(analysis.approval_ratio(), Decimal::ZERO);
        assert!(analysis.approved_items().is_empty());
    }

    #[test]
    fn test_scale_usage_keeps_priced_usage_when_fully_approved() {
        let usage = vec![
            CoverageUsage {
                coverage_id: CoverageId::new(),
                amount: Won::from_i64(3_000_000),
                days: 0,
            },
            CoverageUsage {
                coverage_id: CoverageId::new(),
                amount: Won::ZERO,
                days: 5,
            },
        ];
        let adjudicated = Won::from_i64(3_500_000);
        assert_eq!(scale_usage(&usage, adjudicated, adjudicated), usage);
        assert_eq!(scale_usage(&usage, adjudicated, Won::from_i64(4_000_000)), usage);
    }

    #[test]
    fn test_scale_usage_shrinks_amounts_with_adjusted_approval() {
        let usage = vec![
            CoverageUsage {
                coverage_id: CoverageId::new(),
                amount: Won::from_i64(3_000_000),
                days: 0,
            },
            CoverageUsage {
                coverage_id: CoverageId::new(),
                amount: Won::from_i64(1_000_000),
                days: 0,
            },
            CoverageUsage {
                coverage_id: CoverageId::new(),
                amount: Won::ZERO,
                days: 4,
            },
        ];
        let scaled = scale_usage(&usage, Won::from_i64(4_000_000), Won::from_i64(2_000_000));
        assert_eq!(scaled[0].amount, Won::from_i64(1_500_000));
        assert_eq!(scaled[1].amount, Won::from_i64(500_000));
        assert_eq!(scaled[2].days, 4);
        assert_eq!(scaled[0].coverage_id, usage[0].coverage_id);
    }

    #[test]
    fn test_scale_usage_consumes_nothing_for_zero_approval() {
        let usage = vec![CoverageUsage {
            coverage_id: CoverageId::new(),
            amount: Won::from_i64(900_000),
            days: 3,
        }];
        let scaled = scale_usage(&usage, Won::from_i64(900_000), Won::ZERO);
        assert_eq!(scaled.len(), 1);
        assert!(scaled[0].amount.is_zero());
        assert_eq!(scaled[0].days, 0);
    }
}
