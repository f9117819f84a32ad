//! Travelbudget dashboard report
//!
//! Reads a JSON snapshot of budget records and settings and prints the
//! dashboard summary as JSON.
//!
//! Usage: `budget-report <snapshot.json> [year]`

mod report;
mod snapshot;

use std::path::PathBuf;

use anyhow::{Context, bail};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use travelbudget_core::budget::BudgetFilter;
use travelbudget_core::settings::{SettingValue, SettingValueCache};
use travelbudget_shared::AppConfig;

use crate::report::DashboardReport;
use crate::snapshot::{Snapshot, SnapshotSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Logs go to stderr, the report to stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "travelbudget=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let args = Args::parse(std::env::args().skip(1))?;

    let snapshot = Snapshot::from_path(&args.snapshot)?;
    info!(
        budgets = snapshot.budgets.len(),
        settings = snapshot.settings.len(),
        "Snapshot loaded"
    );

    let cache = SettingValueCache::with_config(
        SnapshotSettings::new(snapshot.settings),
        &config.settings_cache,
    );
    let cost_per_km = cache.cached_setting(
        &config.dashboard.cost_per_km_key,
        SettingValue::Number(config.dashboard.cost_per_km_default),
    );

    let filter = BudgetFilter {
        year: args.year,
        ..BudgetFilter::default()
    };
    let budgets = filter.apply(&snapshot.budgets);
    info!(in_scope = budgets.len(), year = ?args.year, "Budgets filtered");

    let rate = cost_per_km.load().await;
    cache.close();

    let report = DashboardReport::build(&budgets, &config.dashboard, &rate, args.year);
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

/// Command line arguments.
#[derive(Debug, PartialEq, Eq)]
struct Args {
    snapshot: PathBuf,
    year: Option<i32>,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> anyhow::Result<Self> {
        let Some(snapshot) = args.next() else {
            bail!("usage: budget-report <snapshot.json> [year]");
        };
        let year = args
            .next()
            .map(|raw| raw.parse::<i32>().with_context(|| format!("Invalid year: {raw}")))
            .transpose()?;
        if let Some(extra) = args.next() {
            bail!("Unexpected argument: {extra}");
        }

        Ok(Self {
            snapshot: PathBuf::from(snapshot),
            year,
        })
    }
}
