//! Top-N selection for "largest budgets" views.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::status::BudgetStatusClassifier;
use super::types::BudgetRecord;

/// Numeric field budgets can be ranked by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RankKey {
    /// Allocated amount.
    #[default]
    Amount,
    /// Actual spend.
    ActualCost,
    /// Allocated minus spent.
    Remaining,
    /// Clamped usage percentage.
    UsagePercentage,
}

impl RankKey {
    /// Reads the ranked value from a budget.
    #[must_use]
    pub fn value(self, budget: &BudgetRecord) -> Decimal {
        match self {
            Self::Amount => budget.amount,
            Self::ActualCost => budget.actual_cost(),
            Self::Remaining => budget.remaining(),
            Self::UsagePercentage => Decimal::from(BudgetStatusClassifier::usage_percentage(
                budget.amount,
                budget.actual_cost(),
            )),
        }
    }
}

impl std::str::FromStr for RankKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "amount" => Ok(Self::Amount),
            "actualCost" | "actual_cost" | "usage.actualCost" => Ok(Self::ActualCost),
            "remaining" => Ok(Self::Remaining),
            "usagePercentage" | "usage_percentage" => Ok(Self::UsagePercentage),
            _ => Err(format!("Unknown rank key: {s}")),
        }
    }
}

/// Ranking helpers.
pub struct TopNSelector;

impl TopNSelector {
    /// Returns the `n` budgets with the largest `key`, largest first.
    ///
    /// Ties keep their input order. The input is only borrowed.
    #[must_use]
    pub fn top_n<'a, I>(budgets: I, n: usize, key: RankKey) -> Vec<&'a BudgetRecord>
    where
        I: IntoIterator<Item = &'a BudgetRecord>,
    {
        Self::top_n_by(budgets, n, |budget: &BudgetRecord| key.value(budget))
    }

    /// Returns the `n` items with the largest key, largest first. Stable.
    #[must_use]
    pub fn top_n_by<'a, T, K, I, F>(items: I, n: usize, key: F) -> Vec<&'a T>
    where
        T: 'a,
        K: Ord,
        I: IntoIterator<Item = &'a T>,
        F: Fn(&T) -> K,
    {
        let mut ranked: Vec<&'a T> = items.into_iter().collect();
        ranked.sort_by(|a, b| key(b).cmp(&key(a)));
        ranked.truncate(n);
        ranked
    }
}
