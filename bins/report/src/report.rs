//! Dashboard report assembled from the core projections, with amounts
//! formatted for display.

use rust_decimal::Decimal;
use serde::Serialize;
use travelbudget_core::budget::types::UNCATEGORIZED_NAME;
use travelbudget_core::budget::{
    BudgetAggregator, BudgetMetrics, BudgetRecord, RankKey, StatusCounts, TopNSelector,
    sort_categories_by_allocated, sort_periods_by_month,
};
use travelbudget_core::settings::SettingValue;
use travelbudget_shared::config::DashboardConfig;
use travelbudget_shared::types::{Currency, Money};

/// Full dashboard output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    /// Year filter applied, if any.
    pub year: Option<i32>,
    /// Number of budgets in scope.
    pub budget_count: usize,
    /// Grand totals.
    pub totals: TotalsView,
    /// Budgets per status.
    pub status_counts: StatusCounts,
    /// Per-category totals, largest allocation first.
    pub by_category: Vec<CategoryView>,
    /// Per-period totals, annual first.
    pub by_period: Vec<PeriodView>,
    /// Largest budgets by allocation.
    pub top_budgets: Vec<BudgetView>,
    /// Monthly allocation versus spend.
    pub trend: Vec<TrendView>,
    /// Reimbursement rate per kilometer.
    pub cost_per_km: String,
}

/// Formatted grand totals.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalsView {
    pub allocated: String,
    pub spent: String,
    pub remaining: String,
    pub usage_percentage: u8,
}

/// One category row.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryView {
    pub name: String,
    pub color: String,
    pub allocated: String,
    pub spent: String,
    pub remaining: String,
    pub usage_percentage: u8,
}

/// One period row.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodView {
    pub name: String,
    pub allocated: String,
    pub spent: String,
}

/// One budget row.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetView {
    pub id: String,
    pub period: String,
    pub category: String,
    pub allocated: String,
    pub spent: String,
    pub usage_percentage: u8,
    pub status: &'static str,
    pub status_color: &'static str,
}

/// One trend point.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendView {
    pub label: String,
    pub allocated: String,
    pub spent: String,
}

impl DashboardReport {
    /// Builds the report for an already-filtered set of budgets.
    pub fn build(
        budgets: &[&BudgetRecord],
        config: &DashboardConfig,
        cost_per_km: &SettingValue,
        year: Option<i32>,
    ) -> Self {
        let currency = config.currency;
        let mut aggregate = BudgetAggregator::aggregate(budgets.iter().copied());
        sort_categories_by_allocated(&mut aggregate.by_category);
        sort_periods_by_month(&mut aggregate.by_period);

        let totals = TotalsView {
            allocated: format_money(aggregate.totals.total_allocated, currency),
            spent: format_money(aggregate.totals.total_spent, currency),
            remaining: format_money(aggregate.totals.remaining, currency),
            usage_percentage: aggregate.totals.usage_percentage,
        };

        let by_category = aggregate
            .by_category
            .iter()
            .map(|row| CategoryView {
                name: row.name.clone(),
                color: row.color.clone(),
                allocated: format_money(row.total_allocated, currency),
                spent: format_money(row.total_spent, currency),
                remaining: format_money(row.remaining(), currency),
                usage_percentage: row.usage_percentage(),
            })
            .collect();

        let by_period = aggregate
            .by_period
            .iter()
            .map(|row| PeriodView {
                name: row.name.clone(),
                allocated: format_money(row.total_allocated, currency),
                spent: format_money(row.total_spent, currency),
            })
            .collect();

        let top_budgets = TopNSelector::top_n(budgets.iter().copied(), config.top_n, RankKey::Amount)
            .into_iter()
            .map(|budget| budget_view(budget, currency))
            .collect();

        let trend = BudgetAggregator::monthly_trend(budgets.iter().copied())
            .into_iter()
            .map(|point| TrendView {
                label: format!("{} {}", point.name, point.year),
                allocated: format_money(point.allocated, currency),
                spent: format_money(point.spent, currency),
            })
            .collect();

        Self {
            year,
            budget_count: budgets.len(),
            totals,
            status_counts: aggregate.status_counts,
            by_category,
            by_period,
            top_budgets,
            trend,
            cost_per_km: cost_per_km.to_string(),
        }
    }
}

fn budget_view(budget: &BudgetRecord, currency: Currency) -> BudgetView {
    let metrics = BudgetMetrics::for_budget(budget);
    BudgetView {
        id: metrics.id.to_string(),
        period: budget.period().map_or_else(
            || format!("Month {} {}", budget.month, budget.year),
            |period| period.label(budget.year),
        ),
        category: budget
            .category
            .as_ref()
            .map_or_else(|| UNCATEGORIZED_NAME.to_string(), |category| category.name.clone()),
        allocated: format_money(metrics.allocated, currency),
        spent: format_money(metrics.spent, currency),
        usage_percentage: metrics.usage_percentage,
        status: metrics.status.display_name(),
        status_color: metrics.status.color(),
    }
}

fn format_money(amount: Decimal, currency: Currency) -> String {
    Money::new(amount, currency).format()
}
