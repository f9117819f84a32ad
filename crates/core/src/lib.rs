//! Core business logic for Travelbudget.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Budget calculations are synchronous and side-effect free; the settings cache
//! is the only async component and talks to the backend through a trait.
//!
//! # Modules
//!
//! - `budget` - Status classification, aggregation, trends and ranking
//! - `settings` - Backend settings with a single-flight, debounced cache

pub mod budget;
pub mod settings;
