//! Settings error types.

use thiserror::Error;
use travelbudget_shared::AppError;

/// Errors reported by a setting fetcher.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The backend has no setting with this key.
    #[error("Setting not found: {0}")]
    NotFound(String),

    /// The backend call failed.
    #[error("Failed to fetch setting {key}: {message}")]
    Fetch {
        /// Setting key.
        key: String,
        /// Transport or HTTP error description.
        message: String,
    },
}

impl From<SettingsError> for AppError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::NotFound(_) => Self::NotFound(err.to_string()),
            SettingsError::Fetch { .. } => Self::ExternalService(err.to_string()),
        }
    }
}
