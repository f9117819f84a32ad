//! Budget usage classification and aggregation.

pub mod aggregator;
pub mod filter;
pub mod ranking;
pub mod status;
pub mod trend;
pub mod types;


pub use aggregator::{
    BudgetAggregate, BudgetAggregator, BudgetTotals, CategorySummary, PeriodSummary,
    StatusCounts, sort_categories_by_allocated, sort_periods_by_month,
};
pub use filter::BudgetFilter;
pub use ranking::{RankKey, TopNSelector};
pub use status::{BudgetClassification, BudgetMetrics, BudgetStatusClassifier, StatusTag};
pub use trend::TrendPoint;
pub use types::{BudgetRecord, BudgetUsage, CategoryRef, INVALID_MONTH};
