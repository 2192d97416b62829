use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::info;

use crate::error::{GoalsError, Result};
use crate::helpers::sheets::SHEETS_API_BASE;

/// A tracked store and the spreadsheet holding its forecast.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Location {
    /// Key used in reports and generated modules, e.g. `charleston`.
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub spreadsheet_id: String,
}

impl Location {
    /// `display_name`, or `name` with its first letter upper-cased.
    pub fn label(&self) -> String {
        if let Some(display) = &self.display_name {
            return display.clone();
        }
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// Which spreadsheets to read and how to find the goal row in them.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GoalsConfig {
    pub locations: Vec<Location>,
    #[serde(default = "default_forecast_range")]
    pub forecast_range: String,
    #[serde(default = "default_section_label")]
    pub section_label: String,
    #[serde(default = "default_row_labels")]
    pub row_labels: (String, String),
    /// A1 range of a monthly tab, used for exploring and daily totals.
    #[serde(default = "default_monthly_tab_range")]
    pub monthly_tab_range: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_forecast_range() -> String {
    "2025 Forecast!A30:N50".to_string()
}

fn default_section_label() -> String {
    "2025 Goal".to_string()
}

fn default_row_labels() -> (String, String) {
    ("Sales".to_string(), "Merchandise".to_string())
}

fn default_monthly_tab_range() -> String {
    "Jul 2025!A1:G35".to_string()
}

fn default_api_base() -> String {
    SHEETS_API_BASE.to_string()
}

impl GoalsConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading goals config from {}", path.display());

        let text = fs::read_to_string(path).map_err(|e| {
            GoalsError::Config(format!("could not read config {}: {e}", path.display()))
        })?;
        let config: GoalsConfig = serde_json::from_str(&text)?;
        config.validate()?;

        info!("Config lists {} locations", config.locations.len());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.locations.is_empty() {
            return Err(GoalsError::Config("no locations configured".to_string()));
        }
        for location in &self.locations {
            if location.name.is_empty() || location.spreadsheet_id.is_empty() {
                return Err(GoalsError::Config(format!(
                    "location {location:?} needs both a name and a spreadsheet_id"
                )));
            }
        }
        if self.section_label.is_empty() {
            return Err(GoalsError::Config("section_label must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn location(&self, name: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.name == name)
    }
}
