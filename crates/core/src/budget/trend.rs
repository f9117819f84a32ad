//! Monthly-trend projection for line charts.
//!
//! Unlike the grouped totals, an annual budget is spread evenly over the
//! twelve months of its year so it can be plotted next to monthly budgets.
//! Shares are rounded to cents with the Largest Remainder Method: the
//! twelve shares always sum to exactly the annual amount.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;
use travelbudget_shared::types::BudgetPeriod;
use travelbudget_shared::types::period::{calendar_months, month_name};

use super::aggregator::BudgetAggregator;
use super::types::BudgetRecord;

/// Decimal places of a monthly share.
const SHARE_DECIMAL_PLACES: u32 = 2;

/// One month of the trend projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    /// Calendar year.
    pub year: i32,
    /// Month 1-12.
    pub month: u8,
    /// Month name.
    pub name: String,
    /// Allocation attributed to this month.
    pub allocated: Decimal,
    /// Spend attributed to this month.
    pub spent: Decimal,
}

impl BudgetAggregator {
    /// Projects budgets onto calendar months, ascending by year then month.
    ///
    /// Monthly budgets land in their own month. Annual budgets contribute
    /// one twelfth of their amount and of their spend to every month of
    /// their year. Records with an out-of-range month are skipped.
    #[must_use]
    pub fn monthly_trend<'a, I>(budgets: I) -> Vec<TrendPoint>
    where
        I: IntoIterator<Item = &'a BudgetRecord>,
    {
        let mut points: BTreeMap<(i32, u8), (Decimal, Decimal)> = BTreeMap::new();

        for budget in budgets {
            match budget.period() {
                Some(BudgetPeriod::Month(month)) => {
                    let point = points.entry((budget.year, month)).or_default();
                    point.0 = point.0.saturating_add(budget.amount);
                    point.1 = point.1.saturating_add(budget.actual_cost());
                }
                Some(BudgetPeriod::Annual) => {
                    let allocated = spread_evenly(budget.amount, 12);
                    let spent = spread_evenly(budget.actual_cost(), 12);
                    for ((month, allocated), spent) in calendar_months().zip(allocated).zip(spent) {
                        let point = points.entry((budget.year, month)).or_default();
                        point.0 = point.0.saturating_add(allocated);
                        point.1 = point.1.saturating_add(spent);
                    }
                }
                None => {
                    debug!(budget_id = %budget.id, month = budget.month, "skipping budget with invalid month");
                }
            }
        }

        points
            .into_iter()
            .map(|((year, month), (allocated, spent))| TrendPoint {
                year,
                month,
                name: month_name(month),
                allocated,
                spent,
            })
            .collect()
    }
}

/// Splits `total` into `count` cent-rounded shares that sum exactly to
/// `total`. Earlier shares receive the leftover cents; any sub-cent residue
/// stays on the first share.
#[must_use]
pub fn spread_evenly(total: Decimal, count: usize) -> Vec<Decimal> {
    if count == 0 {
        return vec![];
    }

    let count_dec = Decimal::from(count as u64);
    let unit = Decimal::new(1, SHARE_DECIMAL_PLACES);

    let base = (total / count_dec)
        .round_dp_with_strategy(SHARE_DECIMAL_PLACES, RoundingStrategy::ToZero);
    let remainder = total - base * count_dec;

    let extra_cents = (remainder / unit)
        .trunc()
        .to_u64()
        .unwrap_or(0)
        .min(count as u64);
    let residue = remainder - unit * Decimal::from(extra_cents);
    let extra_count = usize::try_from(extra_cents).unwrap_or(0);

    let mut shares: Vec<Decimal> = (0..count)
        .map(|i| if i < extra_count { base + unit } else { base })
        .collect();
    shares[0] += residue;
    shares
}
