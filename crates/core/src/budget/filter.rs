//! In-memory budget filtering.
//!
//! The backend normally filters before returning a page. This mirrors its
//! filter fields for callers holding a full snapshot.

use serde::{Deserialize, Serialize};
use travelbudget_shared::types::CategoryId;

use super::types::BudgetRecord;

/// Budget list filter. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetFilter {
    /// Calendar year.
    pub year: Option<i32>,
    /// Month 0-12.
    pub month: Option<u8>,
    /// Category ID; "uncategorized" selects budgets without a category.
    pub category_id: Option<CategoryId>,
    /// Active flag.
    pub is_active: Option<bool>,
}

impl BudgetFilter {
    /// Returns true if the budget passes every set criterion.
    #[must_use]
    pub fn matches(&self, budget: &BudgetRecord) -> bool {
        self.year.is_none_or(|year| budget.year == year)
            && self.month.is_none_or(|month| budget.month == month)
            && self
                .category_id
                .as_ref()
                .is_none_or(|id| budget.category_key() == id.as_str())
            && self.is_active.is_none_or(|active| budget.is_active == active)
    }

    /// Borrows the matching budgets, preserving order.
    #[must_use]
    pub fn apply<'a>(&self, budgets: &'a [BudgetRecord]) -> Vec<&'a BudgetRecord> {
        budgets.iter().filter(|budget| self.matches(budget)).collect()
    }
}
