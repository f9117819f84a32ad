//! Grouped budget summaries.
//!
//! [`BudgetAggregator::aggregate`] folds a list of budget records into grand
//! totals, per-category and per-period rows and status counts. Annual budgets
//! keep their own period bucket here; the monthly-trend projection in
//! [`super::trend`] spreads them across the year instead.

use std::collections::HashMap;
use std::hash::Hash;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use travelbudget_shared::types::CategoryId;
use travelbudget_shared::types::period::month_name;

use super::status::{BudgetStatusClassifier, StatusTag};
use super::types::{BudgetRecord, UNCATEGORIZED_COLOR, UNCATEGORIZED_ID, UNCATEGORIZED_NAME};

/// Grand totals across all aggregated budgets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetTotals {
    /// Sum of allocated amounts.
    pub total_allocated: Decimal,
    /// Sum of actual spend.
    pub total_spent: Decimal,
    /// Allocated minus spent (may be negative).
    pub remaining: Decimal,
    /// Overall clamped usage percentage.
    pub usage_percentage: u8,
}

/// Totals for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    /// Category ID ("uncategorized" for budgets without one).
    pub category_id: CategoryId,
    /// Category name.
    pub name: String,
    /// Display color.
    pub color: String,
    /// Sum of allocated amounts.
    pub total_allocated: Decimal,
    /// Sum of actual spend.
    pub total_spent: Decimal,
}

impl CategorySummary {
    /// Allocated minus spent.
    #[must_use]
    pub fn remaining(&self) -> Decimal {
        self.total_allocated.saturating_sub(self.total_spent)
    }

    /// Clamped usage percentage for the category.
    #[must_use]
    pub fn usage_percentage(&self) -> u8 {
        BudgetStatusClassifier::usage_percentage(self.total_allocated, self.total_spent)
    }
}

/// Totals for one month bucket (0 = annual budgets).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    /// Month number, 0 for annual.
    pub month: u8,
    /// Display name ("Annual", "January", ...).
    pub name: String,
    /// Sum of allocated amounts.
    pub total_allocated: Decimal,
    /// Sum of actual spend.
    pub total_spent: Decimal,
}

/// Number of budgets per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Budgets below the warning threshold.
    pub under: usize,
    /// Budgets at or above the warning threshold.
    pub warning: usize,
    /// Budgets at or above the critical threshold or over budget.
    pub critical: usize,
}

impl StatusCounts {
    /// Counts one more budget with the given status.
    pub fn record(&mut self, status: StatusTag) {
        match status {
            StatusTag::Under => self.under += 1,
            StatusTag::Warning => self.warning += 1,
            StatusTag::Critical => self.critical += 1,
        }
    }

    /// Count for a status.
    #[must_use]
    pub const fn get(&self, status: StatusTag) -> usize {
        match status {
            StatusTag::Under => self.under,
            StatusTag::Warning => self.warning,
            StatusTag::Critical => self.critical,
        }
    }

    /// Total number of budgets counted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.under + self.warning + self.critical
    }
}

/// Result of [`BudgetAggregator::aggregate`].
///
/// `by_category` and `by_period` are in first-seen order; sorting is left to
/// the caller (see [`sort_categories_by_allocated`], [`sort_periods_by_month`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAggregate {
    /// Grand totals.
    pub totals: BudgetTotals,
    /// Per-category rows.
    pub by_category: Vec<CategorySummary>,
    /// Per-month rows.
    pub by_period: Vec<PeriodSummary>,
    /// Status tallies.
    pub status_counts: StatusCounts,
}

/// Insertion-ordered accumulator.
struct Buckets<K, V> {
    index: HashMap<K, usize>,
    rows: Vec<V>,
}

impl<K: Eq + Hash, V> Buckets<K, V> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            rows: Vec::new(),
        }
    }

    fn entry(&mut self, key: K, make: impl FnOnce() -> V) -> &mut V {
        let next = self.rows.len();
        let slot = *self.index.entry(key).or_insert(next);
        if slot == next {
            self.rows.push(make());
        }
        &mut self.rows[slot]
    }

    fn into_rows(self) -> Vec<V> {
        self.rows
    }
}

/// Aggregates budget records into dashboard summaries.
pub struct BudgetAggregator;

impl BudgetAggregator {
    /// Folds budgets into totals, category rows, period rows and status
    /// counts in a single pass.
    ///
    /// Every record contributes exactly once: records without a category
    /// land in the "Uncategorized" bucket and records without usage count
    /// as zero spend.
    #[must_use]
    pub fn aggregate<'a, I>(budgets: I) -> BudgetAggregate
    where
        I: IntoIterator<Item = &'a BudgetRecord>,
    {
        let mut total_allocated = Decimal::ZERO;
        let mut total_spent = Decimal::ZERO;
        let mut categories: Buckets<String, CategorySummary> = Buckets::new();
        let mut periods: Buckets<u8, PeriodSummary> = Buckets::new();
        let mut status_counts = StatusCounts::default();

        for budget in budgets {
            let allocated = budget.amount;
            let spent = budget.actual_cost();

            total_allocated = total_allocated.saturating_add(allocated);
            total_spent = total_spent.saturating_add(spent);

            let category = categories.entry(budget.category_key().to_string(), || {
                Self::empty_category(budget)
            });
            category.total_allocated = category.total_allocated.saturating_add(allocated);
            category.total_spent = category.total_spent.saturating_add(spent);

            let period = periods.entry(budget.month, || PeriodSummary {
                month: budget.month,
                name: month_name(budget.month),
                total_allocated: Decimal::ZERO,
                total_spent: Decimal::ZERO,
            });
            period.total_allocated = period.total_allocated.saturating_add(allocated);
            period.total_spent = period.total_spent.saturating_add(spent);

            status_counts.record(BudgetStatusClassifier::classify(budget).status);
        }

        BudgetAggregate {
            totals: BudgetTotals {
                total_allocated,
                total_spent,
                remaining: total_allocated.saturating_sub(total_spent),
                usage_percentage: BudgetStatusClassifier::usage_percentage(
                    total_allocated,
                    total_spent,
                ),
            },
            by_category: categories.into_rows(),
            by_period: periods.into_rows(),
            status_counts,
        }
    }

    fn empty_category(budget: &BudgetRecord) -> CategorySummary {
        match &budget.category {
            Some(category) => CategorySummary {
                category_id: category.id.clone(),
                name: category.name.clone(),
                color: category
                    .color
                    .clone()
                    .unwrap_or_else(|| UNCATEGORIZED_COLOR.to_string()),
                total_allocated: Decimal::ZERO,
                total_spent: Decimal::ZERO,
            },
            None => CategorySummary {
                category_id: CategoryId::from(UNCATEGORIZED_ID),
                name: UNCATEGORIZED_NAME.to_string(),
                color: UNCATEGORIZED_COLOR.to_string(),
                total_allocated: Decimal::ZERO,
                total_spent: Decimal::ZERO,
            },
        }
    }
}

/// Sorts category rows by allocated total, largest first. Stable.
pub fn sort_categories_by_allocated(rows: &mut [CategorySummary]) {
    rows.sort_by(|a, b| b.total_allocated.cmp(&a.total_allocated));
}

/// Sorts period rows by month, annual bucket first. Stable.
pub fn sort_periods_by_month(rows: &mut [PeriodSummary]) {
    rows.sort_by_key(|row| row.month);
}
