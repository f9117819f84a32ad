//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::Currency;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Settings cache configuration.
    #[serde(default)]
    pub settings_cache: SettingsCacheConfig,
    /// Dashboard presentation defaults.
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// Settings cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsCacheConfig {
    /// Quiet period before a manual refresh actually fetches.
    #[serde(default = "default_refresh_debounce_ms")]
    pub refresh_debounce_ms: u64,
}

fn default_refresh_debounce_ms() -> u64 {
    300
}

impl Default for SettingsCacheConfig {
    fn default() -> Self {
        Self {
            refresh_debounce_ms: default_refresh_debounce_ms(),
        }
    }
}

/// Dashboard configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// Number of rows in "largest budgets" views.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Currency used when formatting amounts.
    #[serde(default)]
    pub currency: Currency,
    /// Setting key holding the reimbursement rate per kilometer.
    #[serde(default = "default_cost_per_km_key")]
    pub cost_per_km_key: String,
    /// Rate shown until the setting has been fetched.
    #[serde(default = "default_cost_per_km")]
    pub cost_per_km_default: Decimal,
}

fn default_top_n() -> usize {
    5
}

fn default_cost_per_km_key() -> String {
    "cost_per_km".to_string()
}

fn default_cost_per_km() -> Decimal {
    Decimal::new(7, 1) // 0.7
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            currency: Currency::default(),
            cost_per_km_key: default_cost_per_km_key(),
            cost_per_km_default: default_cost_per_km(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("TRAVELBUDGET")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_sources() {
        temp_env::with_vars_unset(
            [
                "TRAVELBUDGET__DASHBOARD__TOP_N",
                "TRAVELBUDGET__SETTINGS_CACHE__REFRESH_DEBOUNCE_MS",
                "TRAVELBUDGET__DASHBOARD__CURRENCY",
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.settings_cache.refresh_debounce_ms, 300);
                assert_eq!(config.dashboard.top_n, 5);
                assert_eq!(config.dashboard.currency, Currency::Eur);
                assert_eq!(config.dashboard.cost_per_km_key, "cost_per_km");
                assert_eq!(config.dashboard.cost_per_km_default, Decimal::new(7, 1));
            },
        );
    }

    #[test]
    fn test_environment_overrides() {
        temp_env::with_vars(
            [
                ("TRAVELBUDGET__DASHBOARD__TOP_N", Some("10")),
                (
                    "TRAVELBUDGET__SETTINGS_CACHE__REFRESH_DEBOUNCE_MS",
                    Some("50"),
                ),
                ("TRAVELBUDGET__DASHBOARD__CURRENCY", Some("USD")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.dashboard.top_n, 10);
                assert_eq!(config.settings_cache.refresh_debounce_ms, 50);
                assert_eq!(config.dashboard.currency, Currency::Usd);
            },
        );
    }
}
