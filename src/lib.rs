//! Forecast Goals Library
//!
//! This library authenticates against Google OAuth2, reads forecast
//! spreadsheets through the Sheets API, extracts monthly goal figures
//! and generates data modules from them.

pub mod config;
pub mod error;
pub mod helpers;
pub mod models;
pub mod service;

pub use config::{GoalsConfig, Location};
pub use error::GoalsError;
pub use service::GoalsService;

// Re-export key types for convenience
pub use helpers::extract::{extract_monthly_goals, NotFound};
pub use models::goals::{LocationGoals, Month, MonthlyGoals, SheetRange};
