//! Shared types, errors, and configuration for Travelbudget.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for backend-issued identifiers
//! - Money and currency formatting with decimal precision
//! - Calendar period helpers (annual vs monthly budgets)
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
