//! JSON snapshot input: budget records plus the settings the backend would
//! serve for them.

use std::collections::HashMap;
use std::future::{Future, ready};
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use travelbudget_core::budget::BudgetRecord;
use travelbudget_core::settings::{Setting, SettingFetcher, SettingsError};

/// Budgets and settings read from disk.
#[derive(Debug, Default, Deserialize)]
pub struct Snapshot {
    /// Budget records, unfiltered.
    #[serde(default)]
    pub budgets: Vec<BudgetRecord>,
    /// Backend settings.
    #[serde(default)]
    pub settings: Vec<Setting>,
}

impl Snapshot {
    /// Reads and parses a snapshot file.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("Invalid snapshot {}", path.display()))
    }

    /// Parses a snapshot document.
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let mut snapshot: Self = serde_json::from_str(raw)?;
        snapshot.budgets = snapshot
            .budgets
            .into_iter()
            .map(BudgetRecord::sanitized)
            .collect();
        Ok(snapshot)
    }
}

/// Serves settings out of a snapshot.
pub struct SnapshotSettings {
    settings: HashMap<String, Setting>,
}

impl SnapshotSettings {
    /// Indexes settings by key; later duplicates win.
    pub fn new(settings: Vec<Setting>) -> Self {
        Self {
            settings: settings
                .into_iter()
                .map(|setting| (setting.key.clone(), setting))
                .collect(),
        }
    }
}

impl SettingFetcher for SnapshotSettings {
    fn fetch_setting(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<Setting>, SettingsError>> + Send {
        ready(Ok(self.settings.get(key).cloned()))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use travelbudget_core::settings::{SettingValue, SettingValueCache};

    use super::*;

    const EXAMPLE: &str = include_str!("../snapshot.example.json");

    #[test]
    fn test_parses_example_snapshot() {
        let snapshot = Snapshot::from_json(EXAMPLE).unwrap();

        assert_eq!(snapshot.budgets.len(), 5);
        assert_eq!(snapshot.budgets[2].amount, dec!(500));
        assert_eq!(snapshot.budgets[2].actual_cost(), dec!(475));
        assert!(snapshot.budgets[3].category.is_none());
        assert!(!snapshot.budgets[4].is_active);
        assert_eq!(snapshot.settings.len(), 1);
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let snapshot = Snapshot::from_json("{}").unwrap();
        assert!(snapshot.budgets.is_empty());
        assert!(snapshot.settings.is_empty());
    }

    #[test]
    fn test_rejects_malformed_document() {
        assert!(Snapshot::from_json("[1, 2").is_err());
    }

    #[tokio::test]
    async fn test_snapshot_settings_feed_the_cache() {
        let snapshot = Snapshot::from_json(EXAMPLE).unwrap();
        let cache = SettingValueCache::new(
            SnapshotSettings::new(snapshot.settings),
            std::time::Duration::ZERO,
        );
        let fallback = SettingValue::Number(dec!(0.7));

        assert_eq!(
            cache.read("cost_per_km", fallback.clone()).await,
            SettingValue::Number(dec!(0.85))
        );
        assert_eq!(cache.read("missing", fallback.clone()).await, fallback);
    }
}
