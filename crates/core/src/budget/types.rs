//! Budget data types.
//!
//! Records arrive from the backend as JSON in camelCase. Numeric fields are
//! read leniently: a missing, non-numeric or negative amount, actual cost or
//! threshold becomes zero instead of failing the whole page.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use travelbudget_shared::types::{BudgetId, BudgetPeriod, CategoryId};

/// Category id used for budgets without a category.
pub const UNCATEGORIZED_ID: &str = "uncategorized";

/// Display name used for budgets without a category.
pub const UNCATEGORIZED_NAME: &str = "Uncategorized";

/// Month stored for records whose month is missing or unparseable. It is
/// out of range, so such records never count as annual budgets.
pub const INVALID_MONTH: u8 = u8::MAX;

/// Neutral gray for budgets without a category (or a category without color).
pub const UNCATEGORIZED_COLOR: &str = "#9E9E9E";

/// A budget record as returned by the backend. Read-only to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetRecord {
    /// Budget ID.
    #[serde(alias = "_id")]
    pub id: BudgetId,
    /// Calendar year.
    #[serde(default)]
    pub year: i32,
    /// Month 1-12, or 0 for an annual budget.
    #[serde(default = "lenient::invalid_month", deserialize_with = "lenient::month")]
    pub month: u8,
    /// Category, absent for uncategorized budgets.
    #[serde(default)]
    pub category: Option<CategoryRef>,
    /// Allocated amount.
    #[serde(default, deserialize_with = "lenient::amount")]
    pub amount: Decimal,
    /// Spend recorded against this budget.
    #[serde(default)]
    pub usage: Option<BudgetUsage>,
    /// Usage percentage at which the budget is flagged as warning.
    #[serde(default, deserialize_with = "lenient::threshold")]
    pub warning_threshold: u32,
    /// Usage percentage at which the budget is flagged as critical.
    #[serde(default, deserialize_with = "lenient::threshold")]
    pub critical_threshold: u32,
    /// Whether the budget is active.
    #[serde(default)]
    pub is_active: bool,
}

/// Category reference embedded in a budget record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    /// Category ID.
    #[serde(alias = "_id")]
    pub id: CategoryId,
    /// Category name.
    #[serde(default)]
    pub name: String,
    /// Display color (hex).
    #[serde(default)]
    pub color: Option<String>,
}

/// Usage block of a budget record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetUsage {
    /// Amount actually spent.
    #[serde(default, deserialize_with = "lenient::amount")]
    pub actual_cost: Decimal,
}

impl BudgetRecord {
    /// Creates an active, uncategorized record with no spend and zero
    /// thresholds (so it classifies as critical until thresholds are set).
    #[must_use]
    pub fn new(id: impl Into<BudgetId>, year: i32, month: u8, amount: Decimal) -> Self {
        Self {
            id: id.into(),
            year,
            month,
            category: None,
            amount,
            usage: None,
            warning_threshold: 0,
            critical_threshold: 0,
            is_active: true,
        }
    }

    /// Sets the actual cost.
    #[must_use]
    pub fn with_actual_cost(mut self, actual_cost: Decimal) -> Self {
        self.usage = Some(BudgetUsage { actual_cost });
        self
    }

    /// Sets the category.
    #[must_use]
    pub fn with_category(mut self, id: &str, name: &str, color: Option<&str>) -> Self {
        self.category = Some(CategoryRef {
            id: CategoryId::from(id),
            name: name.to_string(),
            color: color.map(str::to_string),
        });
        self
    }

    /// Sets warning and critical thresholds.
    #[must_use]
    pub fn with_thresholds(mut self, warning: u32, critical: u32) -> Self {
        self.warning_threshold = warning;
        self.critical_threshold = critical;
        self
    }

    /// Sets the active flag.
    #[must_use]
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Returns a copy with negative amounts clamped to zero, applying the
    /// same recovery as the lenient deserializer to records built in code.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.amount = self.amount.max(Decimal::ZERO);
        if let Some(usage) = self.usage.as_mut() {
            usage.actual_cost = usage.actual_cost.max(Decimal::ZERO);
        }
        self
    }

    /// Amount spent, zero when the record carries no usage.
    #[must_use]
    pub fn actual_cost(&self) -> Decimal {
        self.usage
            .as_ref()
            .map_or(Decimal::ZERO, |usage| usage.actual_cost)
    }

    /// Allocated minus spent. Negative when over budget.
    #[must_use]
    pub fn remaining(&self) -> Decimal {
        self.amount.saturating_sub(self.actual_cost())
    }

    /// The period this budget covers, `None` for an out-of-range month.
    #[must_use]
    pub fn period(&self) -> Option<BudgetPeriod> {
        BudgetPeriod::from_month(self.month)
    }

    /// Returns true for annual budgets (`month == 0`).
    #[must_use]
    pub fn is_annual(&self) -> bool {
        self.period().is_some_and(BudgetPeriod::is_annual)
    }

    /// Category id used for grouping.
    #[must_use]
    pub fn category_key(&self) -> &str {
        self.category
            .as_ref()
            .map_or(UNCATEGORIZED_ID, |category| category.id.as_str())
    }
}

mod lenient {
    use std::str::FromStr;

    use rust_decimal::prelude::ToPrimitive;
    use rust_decimal::{Decimal, RoundingStrategy};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn decimal_from_value(value: &Value) -> Option<Decimal> {
        let text = match value {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.trim().to_string(),
            _ => return None,
        };
        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .ok()
    }

    fn non_negative<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value
            .as_ref()
            .and_then(decimal_from_value)
            .filter(|d| !d.is_sign_negative())
            .unwrap_or(Decimal::ZERO))
    }

    pub fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        non_negative(deserializer)
    }

    pub fn threshold<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let value = non_negative(deserializer)?;
        Ok(value
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_u32()
            .unwrap_or(0))
    }

    pub fn month<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value
            .as_ref()
            .and_then(decimal_from_value)
            .filter(|d| !d.is_sign_negative())
            .and_then(|d| d.trunc().to_u8())
            .unwrap_or(super::INVALID_MONTH))
    }

    pub const fn invalid_month() -> u8 {
        super::INVALID_MONTH
    }
}
