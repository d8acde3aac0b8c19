use serde::{Deserialize, Serialize};

use crate::models::job_completion::{JobCompletionEstimate, JobCompletionVariance};

/// Cost variance within +/- 5% of the estimate counts as on target.
pub const BUDGET_TOLERANCE_PERCENT: f64 = 5.0;
/// Individual materials get flagged at a stricter +/- 10%.
pub const MATERIAL_ATTENTION_PERCENT: f64 = 10.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LedgerTotals {
    pub hours: f64,
    pub labor_cost: f64,
    pub material_cost: f64,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BudgetClassification {
    OverBudget,
    UnderBudget,
    OnTarget,
}

pub fn percent_of_estimate(variance: f64, estimate: Option<f64>) -> Option<f64> {
    match estimate {
        Some(estimate) if estimate != 0.0 => Some(variance / estimate * 100.0),
        _ => None,
    }
}

// Always recalculates from the full ledger totals; callers must not feed
// incremental deltas through here.
pub fn compute(estimate: &JobCompletionEstimate, totals: &LedgerTotals) -> JobCompletionVariance {
    let actual_hours = totals.hours;
    let actual_total = totals.material_cost + totals.labor_cost;
    let hours_variance = actual_hours - estimate.hours.unwrap_or(0.0);
    let cost_variance = actual_total - estimate.total.unwrap_or(0.0);

    JobCompletionVariance {
        actual_hours,
        actual_total,
        hours_variance,
        hours_variance_percent: percent_of_estimate(hours_variance, estimate.hours),
        cost_variance,
        cost_variance_percent: percent_of_estimate(cost_variance, estimate.total),
    }
}

pub fn classify_budget(cost_variance_percent: Option<f64>) -> BudgetClassification {
    match cost_variance_percent {
        Some(percent) if percent > BUDGET_TOLERANCE_PERCENT => BudgetClassification::OverBudget,
        Some(percent) if percent < -BUDGET_TOLERANCE_PERCENT => BudgetClassification::UnderBudget,
        _ => BudgetClassification::OnTarget,
    }
}

pub fn material_needs_attention(variance_percent: Option<f64>) -> bool {
    matches!(variance_percent, Some(percent) if percent.abs() > MATERIAL_ATTENTION_PERCENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimate(hours: Option<f64>, total: Option<f64>) -> JobCompletionEstimate {
        JobCompletionEstimate {
            hours,
            material_cost: None,
            total,
        }
    }

    #[test]
    fn variance_against_estimate() {
        let totals = LedgerTotals {
            hours: 30.0,
            labor_cost: 0.0,
            material_cost: 0.0,
        };
        let variance = compute(&estimate(Some(24.0), None), &totals);

        assert_eq!(variance.actual_hours, 30.0);
        assert_eq!(variance.hours_variance, 6.0);
        assert_eq!(variance.hours_variance_percent, Some(25.0));
    }

    #[test]
    fn percent_is_none_without_estimate() {
        assert_eq!(percent_of_estimate(6.0, None), None);
        assert_eq!(percent_of_estimate(6.0, Some(0.0)), None);

        let totals = LedgerTotals {
            hours: 12.0,
            labor_cost: 0.0,
            material_cost: 0.0,
        };
        let variance = compute(&estimate(None, Some(0.0)), &totals);
        assert_eq!(variance.hours_variance_percent, None);
        assert_eq!(variance.cost_variance_percent, None);
        // the deltas are still reported against a zero baseline
        assert_eq!(variance.hours_variance, 12.0);
    }

    #[test]
    fn cost_combines_labor_and_material() {
        let totals = LedgerTotals {
            hours: 10.0,
            labor_cost: 400.0,
            material_cost: 100.0,
        };
        let variance = compute(&estimate(Some(10.0), Some(400.0)), &totals);

        assert_eq!(variance.actual_total, 500.0);
        assert_eq!(variance.cost_variance, 100.0);
        assert_eq!(variance.cost_variance_percent, Some(25.0));
        assert_eq!(variance.hours_variance, 0.0);
        assert_eq!(variance.hours_variance_percent, Some(0.0));
    }

    #[test]
    fn recompute_is_idempotent() {
        let totals = LedgerTotals {
            hours: 17.5,
            labor_cost: 612.5,
            material_cost: 89.99,
        };
        let first = compute(&estimate(Some(16.0), Some(700.0)), &totals);
        let second = compute(&estimate(Some(16.0), Some(700.0)), &totals);
        assert_eq!(first, second);
    }

    #[test]
    fn classification_thresholds() {
        assert_eq!(classify_budget(Some(5.1)), BudgetClassification::OverBudget);
        assert_eq!(classify_budget(Some(5.0)), BudgetClassification::OnTarget);
        assert_eq!(classify_budget(Some(-5.0)), BudgetClassification::OnTarget);
        assert_eq!(
            classify_budget(Some(-5.1)),
            BudgetClassification::UnderBudget
        );
        assert_eq!(classify_budget(Some(0.0)), BudgetClassification::OnTarget);
        assert_eq!(classify_budget(None), BudgetClassification::OnTarget);
    }

    #[test]
    fn material_attention_flag() {
        assert!(material_needs_attention(Some(10.5)));
        assert!(material_needs_attention(Some(-12.0)));
        assert!(!material_needs_attention(Some(10.0)));
        assert!(!material_needs_attention(Some(-3.0)));
        assert!(!material_needs_attention(None));
    }
}
