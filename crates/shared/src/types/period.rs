//! Calendar period helpers.
//!
//! Budgets are either monthly (`month` 1-12) or annual (`month` 0).

use chrono::Month;
use serde::{Deserialize, Serialize};

/// Month number the backend uses for annual budgets.
pub const ANNUAL_MONTH: u8 = 0;

/// Label used for the annual bucket.
pub const ANNUAL_LABEL: &str = "Annual";

/// The period a budget applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPeriod {
    /// Whole calendar year.
    Annual,
    /// A single calendar month (1-12).
    Month(u8),
}

impl BudgetPeriod {
    /// Interprets a backend month number. Returns `None` outside 0-12.
    #[must_use]
    pub fn from_month(month: u8) -> Option<Self> {
        match month {
            ANNUAL_MONTH => Some(Self::Annual),
            1..=12 => Some(Self::Month(month)),
            _ => None,
        }
    }

    /// Returns the backend month number (0 for annual).
    #[must_use]
    pub const fn month_number(self) -> u8 {
        match self {
            Self::Annual => ANNUAL_MONTH,
            Self::Month(m) => m,
        }
    }

    /// Returns true for annual budgets.
    #[must_use]
    pub const fn is_annual(self) -> bool {
        matches!(self, Self::Annual)
    }

    /// Display name: "Annual" or the English month name.
    #[must_use]
    pub fn name(self) -> String {
        match self {
            Self::Annual => ANNUAL_LABEL.to_string(),
            Self::Month(m) => month_name(m),
        }
    }

    /// Display name qualified with the year, e.g. "March 2026".
    #[must_use]
    pub fn label(self, year: i32) -> String {
        format!("{} {year}", self.name())
    }
}

/// English name of a month number; anything outside 0-12 is shown as
/// "Month N" so malformed records stay visible.
#[must_use]
pub fn month_name(month: u8) -> String {
    if month == ANNUAL_MONTH {
        return ANNUAL_LABEL.to_string();
    }
    Month::try_from(month).map_or_else(|_| format!("Month {month}"), |m| m.name().to_string())
}

/// Iterates the twelve calendar month numbers.
pub fn calendar_months() -> impl Iterator<Item = u8> {
    1..=12
}
