//! Budget status classification.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use travelbudget_shared::types::BudgetId;

use super::types::BudgetRecord;

/// Health of a single budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTag {
    /// Spend is below the warning threshold.
    Under,
    /// Spend reached the warning threshold.
    Warning,
    /// Spend reached the critical threshold or exceeds the allocation.
    #[serde(alias = "over")]
    Critical,
}

impl StatusTag {
    /// All tags in severity order.
    pub const ALL: [Self; 3] = [Self::Under, Self::Warning, Self::Critical];

    /// Canonical label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Under => "under",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }

    /// Label used by views that call an exhausted budget "over".
    #[must_use]
    pub const fn legacy_label(self) -> &'static str {
        match self {
            Self::Under => "under",
            Self::Warning => "warning",
            Self::Critical => "over",
        }
    }

    /// Human readable label.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Under => "Under budget",
            Self::Warning => "Near limit",
            Self::Critical => "Over budget",
        }
    }

    /// Status color (hex).
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Under => "#4CAF50",
            Self::Warning => "#FF9800",
            Self::Critical => "#F44336",
        }
    }
}

impl std::fmt::Display for StatusTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StatusTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "under" => Ok(Self::Under),
            "warning" => Ok(Self::Warning),
            "critical" | "over" => Ok(Self::Critical),
            _ => Err(format!("Unknown budget status: {s}")),
        }
    }
}

/// Classification result for one budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetClassification {
    /// Spend as a percentage of the allocation, clamped to 0-100.
    pub usage_percentage: u8,
    /// Status tag.
    pub status: StatusTag,
}

/// Per-budget metrics for table rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetMetrics {
    /// Budget ID.
    pub id: BudgetId,
    /// Allocated amount.
    pub allocated: Decimal,
    /// Spent amount.
    pub spent: Decimal,
    /// Allocated minus spent (may be negative).
    pub remaining: Decimal,
    /// Clamped usage percentage.
    pub usage_percentage: u8,
    /// Status tag.
    pub status: StatusTag,
}

impl BudgetMetrics {
    /// Computes metrics for a single budget.
    #[must_use]
    pub fn for_budget(budget: &BudgetRecord) -> Self {
        let classification = BudgetStatusClassifier::classify(budget);
        Self {
            id: budget.id.clone(),
            allocated: budget.amount,
            spent: budget.actual_cost(),
            remaining: budget.remaining(),
            usage_percentage: classification.usage_percentage,
            status: classification.status,
        }
    }
}

/// Classifies budgets by how much of their allocation has been spent.
pub struct BudgetStatusClassifier;

impl BudgetStatusClassifier {
    /// Classifies one budget record.
    ///
    /// The status is decided on the unclamped ratio, so a budget can be
    /// critical while its displayed percentage caps at 100.
    #[must_use]
    pub fn classify(budget: &BudgetRecord) -> BudgetClassification {
        Self::classify_amounts(
            budget.amount,
            budget.actual_cost(),
            budget.warning_threshold,
            budget.critical_threshold,
        )
    }

    /// Classifies raw amounts and thresholds.
    ///
    /// Order: critical (critical threshold reached, or spend above a
    /// non-zero allocation, or spend against a zero allocation), then
    /// warning, then under. A zero threshold is reached by any usage.
    #[must_use]
    pub fn classify_amounts(
        allocated: Decimal,
        spent: Decimal,
        warning_threshold: u32,
        critical_threshold: u32,
    ) -> BudgetClassification {
        let ratio = UsageRatio::of(allocated, spent);

        let over_budget = allocated > Decimal::ZERO && spent > allocated;
        let status = if ratio.is_unbounded() || over_budget || ratio.reaches(critical_threshold) {
            StatusTag::Critical
        } else if ratio.reaches(warning_threshold) {
            StatusTag::Warning
        } else {
            StatusTag::Under
        };

        BudgetClassification {
            usage_percentage: Self::usage_percentage(allocated, spent),
            status,
        }
    }

    /// Spend as a whole percentage of the allocation, rounded half away from
    /// zero and clamped to 0-100. Zero allocation is always 0%.
    #[must_use]
    pub fn usage_percentage(allocated: Decimal, spent: Decimal) -> u8 {
        if allocated <= Decimal::ZERO {
            return 0;
        }
        let spent = spent.max(Decimal::ZERO);
        let percent = spent
            .checked_div(allocated)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .unwrap_or(Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .min(Decimal::ONE_HUNDRED);
        percent.to_u8().unwrap_or(0)
    }
}

/// Unclamped spend ratio in percent.
enum UsageRatio {
    Percent(Decimal),
    /// Spend against a zero allocation, or too large to represent.
    Unbounded,
}

impl UsageRatio {
    fn of(allocated: Decimal, spent: Decimal) -> Self {
        let spent = spent.max(Decimal::ZERO);
        if allocated <= Decimal::ZERO {
            return if spent.is_zero() {
                Self::Percent(Decimal::ZERO)
            } else {
                Self::Unbounded
            };
        }
        spent
            .checked_div(allocated)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .map_or(Self::Unbounded, Self::Percent)
    }

    fn is_unbounded(&self) -> bool {
        matches!(self, Self::Unbounded)
    }

    fn reaches(&self, threshold: u32) -> bool {
        match self {
            Self::Percent(percent) => *percent >= Decimal::from(threshold),
            Self::Unbounded => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(500), dec!(475), 75, 90, 95, StatusTag::Critical)]
    #[case(dec!(1000), dec!(800), 75, 90, 80, StatusTag::Warning)]
    #[case(dec!(1000), dec!(100), 75, 90, 10, StatusTag::Under)]
    #[case(dec!(1000), dec!(750), 75, 90, 75, StatusTag::Warning)]
    #[case(dec!(1000), dec!(900), 75, 90, 90, StatusTag::Critical)]
    #[case(dec!(100), dec!(150), 95, 99, 100, StatusTag::Critical)]
    #[case(dec!(100), dec!(101), 100, 100, 100, StatusTag::Critical)]
    #[case(dec!(0), dec!(0), 75, 90, 0, StatusTag::Under)]
    #[case(dec!(0), dec!(25), 75, 90, 0, StatusTag::Critical)]
    #[case(dec!(200), dec!(1), 75, 90, 1, StatusTag::Under)]
    #[case(dec!(3), dec!(0.045), 75, 90, 2, StatusTag::Under)]
    fn test_classify_amounts(
        #[case] allocated: Decimal,
        #[case] spent: Decimal,
        #[case] warning: u32,
        #[case] critical: u32,
        #[case] expected_percentage: u8,
        #[case] expected_status: StatusTag,
    ) {
        let result = BudgetStatusClassifier::classify_amounts(allocated, spent, warning, critical);
        assert_eq!(result.usage_percentage, expected_percentage);
        assert_eq!(result.status, expected_status);
    }

    #[test]
    fn test_zero_thresholds_always_trip() {
        let result = BudgetStatusClassifier::classify_amounts(dec!(100), dec!(10), 0, 0);
        assert_eq!(result.usage_percentage, 10);
        assert_eq!(result.status, StatusTag::Critical);

        let result = BudgetStatusClassifier::classify_amounts(dec!(100), dec!(0), 0, 0);
        assert_eq!(result.status, StatusTag::Critical);

        let result = BudgetStatusClassifier::classify_amounts(dec!(100), dec!(10), 0, 90);
        assert_eq!(result.status, StatusTag::Warning);
    }

    #[test]
    fn test_malformed_thresholds_classify_as_critical() {
        let budget: BudgetRecord = serde_json::from_value(serde_json::json!({
            "id": "b-1",
            "year": 2026,
            "month": 4,
            "amount": 100,
            "usage": { "actualCost": 10 },
            "warningThreshold": "abc",
            "criticalThreshold": -5
        }))
        .unwrap();

        assert_eq!(budget.critical_threshold, 0);
        assert_eq!(BudgetStatusClassifier::classify(&budget).status, StatusTag::Critical);
    }

    #[test]
    fn test_classify_record_without_usage() {
        let budget = BudgetRecord::new("b-1", 2026, 2, dec!(400)).with_thresholds(75, 90);
        let result = BudgetStatusClassifier::classify(&budget);
        assert_eq!(result.usage_percentage, 0);
        assert_eq!(result.status, StatusTag::Under);
    }

    #[test]
    fn test_budget_metrics() {
        let budget = BudgetRecord::new("b-2", 2026, 4, dec!(400))
            .with_actual_cost(dec!(410))
            .with_thresholds(75, 90);
        let metrics = BudgetMetrics::for_budget(&budget);

        assert_eq!(metrics.allocated, dec!(400));
        assert_eq!(metrics.spent, dec!(410));
        assert_eq!(metrics.remaining, dec!(-10));
        assert_eq!(metrics.usage_percentage, 100);
        assert_eq!(metrics.status, StatusTag::Critical);
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(StatusTag::Critical.as_str(), "critical");
        assert_eq!(StatusTag::Critical.legacy_label(), "over");
        assert_eq!(StatusTag::Warning.legacy_label(), "warning");
        assert_eq!(StatusTag::Under.display_name(), "Under budget");
        assert_eq!("over".parse::<StatusTag>().unwrap(), StatusTag::Critical);
        assert_eq!(" Warning ".parse::<StatusTag>().unwrap(), StatusTag::Warning);
        assert!("unknown".parse::<StatusTag>().is_err());
    }

    #[test]
    fn test_status_serde_accepts_legacy_label() {
        let tag: StatusTag = serde_json::from_str("\"over\"").unwrap();
        assert_eq!(tag, StatusTag::Critical);
        assert_eq!(serde_json::to_string(&tag).unwrap(), "\"critical\"");
    }
}
