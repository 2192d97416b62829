use thiserror::Error;

use crate::helpers::extract::NotFound;

/// Errors surfaced by the Sheets, OAuth and generation layers.
#[derive(Debug, Error)]
pub enum GoalsError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Google API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error(transparent)]
    NotFound(#[from] NotFound),
}

pub type Result<T> = std::result::Result<T, GoalsError>;
