//! Backend settings with a single-flight, debounced cache.

pub mod cache;
pub mod error;
pub mod types;

pub use cache::{CachedSetting, FetchPhase, SettingFetcher, SettingValueCache};
pub use error::SettingsError;
pub use types::{Setting, SettingValue};
