use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::{
    config::{GoalsConfig, Location},
    error::{GoalsError, Result},
    helpers::{
        codegen::{self, ModuleEntry},
        extract::{self, LabeledRow, MatchCase, PreviewRow, ROW_SEARCH_WINDOW},
        sheets,
    },
    models::{
        goals::{GoalsReport, LocationGoals, SheetRange},
        sheets::Spreadsheet,
    },
};

pub const SOURCE_NAME: &str = "Google Sheets API";

const METRIC_KEYWORDS: [&str; 7] = [
    "revenue",
    "sales",
    "traffic",
    "conversion",
    "average",
    "goal",
    "forecast",
];

/// What a quick look at a forecast spreadsheet turned up.
#[derive(Debug)]
pub struct Exploration {
    pub header_rows: Vec<LabeledRow>,
    /// Column letter and header text of the first forecast row.
    pub columns: Vec<(String, String)>,
    pub monthly_sample: Vec<LabeledRow>,
    pub metric_rows: Vec<LabeledRow>,
}

/// Outcome of a generation run: the goals that went into the modules and
/// where the modules were written.
#[derive(Debug)]
pub struct GeneratedModules {
    pub report: GoalsReport,
    pub js_path: PathBuf,
    pub py_path: PathBuf,
}

/// Reads forecast spreadsheets for every configured location and extracts
/// their monthly goals.
#[derive(Clone)]
pub struct GoalsService {
    pub sheets_client: Client,
    pub config: GoalsConfig,
}

impl GoalsService {
    pub fn new(sheets_client: Client, config: GoalsConfig) -> Self {
        info!(
            "Creating new GoalsService for {} locations",
            config.locations.len()
        );
        Self {
            sheets_client,
            config,
        }
    }

    pub fn location(&self, name: &str) -> Result<&Location> {
        self.config
            .location(name)
            .ok_or_else(|| GoalsError::Config(format!("unknown location '{name}'")))
    }

    /// The first configured location, used when a command is not told which.
    pub fn default_location(&self) -> Result<&Location> {
        self.config
            .locations
            .first()
            .ok_or_else(|| GoalsError::Config("no locations configured".to_string()))
    }

    pub async fn read_range(&self, location: &Location, range: &str) -> Result<SheetRange> {
        sheets::fetch_values(
            &self.sheets_client,
            &self.config.api_base,
            &location.spreadsheet_id,
            range,
        )
        .await
    }

    pub async fn try_read_monthly_goals(&self, location: &Location) -> Result<LocationGoals> {
        info!("Reading monthly goals for {}", location.name);

        let range = self.read_range(location, &self.config.forecast_range).await?;
        let (category, sub_category) = &self.config.row_labels;
        let monthly_goals = extract::extract_monthly_goals(
            &range,
            &self.config.section_label,
            (category.as_str(), sub_category.as_str()),
        )?;

        info!(
            "Extracted {} months for {}, total {:.2}",
            monthly_goals.len(),
            location.name,
            monthly_goals.total()
        );
        Ok(LocationGoals {
            location: location.name.clone(),
            source: SOURCE_NAME.to_string(),
            sheet_id: location.spreadsheet_id.clone(),
            monthly_goals,
        })
    }

    /// Like [`Self::try_read_monthly_goals`], but a failure is logged and
    /// reported as `None` so one location cannot sink the others.
    pub async fn read_monthly_goals(&self, location: &Location) -> Option<LocationGoals> {
        match self.try_read_monthly_goals(location).await {
            Ok(goals) => Some(goals),
            Err(GoalsError::NotFound(e)) => {
                warn!("Goals not found in {} sheet: {}", location.name, e);
                None
            }
            Err(e) => {
                error!("Error reading {} goals: {}", location.name, e);
                None
            }
        }
    }

    pub async fn get_all_monthly_goals(&self) -> GoalsReport {
        let mut locations = Vec::with_capacity(self.config.locations.len());
        for location in &self.config.locations {
            let goals = self.read_monthly_goals(location).await;
            locations.push((location.name.clone(), goals));
        }

        GoalsReport {
            locations,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Labeled rows of the goal section, for eyeballing the sheet layout.
    pub async fn forecast_preview(&self, location: &Location) -> Result<Vec<PreviewRow>> {
        let range = self.read_range(location, &self.config.forecast_range).await?;
        let preview = extract::section_preview(&range, &self.config.section_label, ROW_SEARCH_WINDOW);
        if preview.is_empty() {
            warn!(
                "No '{}' section in {} forecast range",
                self.config.section_label, location.name
            );
        }
        Ok(preview)
    }

    /// Rows of a monthly tab whose label contains `Total` or `Goal`.
    pub async fn daily_totals(&self, location: &Location, tab_range: &str) -> Result<Vec<LabeledRow>> {
        let range = self.read_range(location, tab_range).await?;
        let rows = extract::find_labeled_rows(&range, &["Total", "Goal"], MatchCase::Sensitive);
        info!("Found {} total/goal rows in {}", rows.len(), tab_range);
        Ok(rows)
    }

    /// Spreadsheet metadata for every location, in config order.
    pub async fn test_access(&self) -> Vec<(String, Result<Spreadsheet>)> {
        let mut results = Vec::with_capacity(self.config.locations.len());
        for location in &self.config.locations {
            let outcome = sheets::fetch_spreadsheet(
                &self.sheets_client,
                &self.config.api_base,
                &location.spreadsheet_id,
            )
            .await;
            if let Err(e) = &outcome {
                error!("Error accessing {} spreadsheet: {}", location.name, e);
            }
            results.push((location.name.clone(), outcome));
        }
        results
    }

    pub async fn explore(&self, location: &Location) -> Result<Exploration> {
        info!("Exploring {} forecast sheet structure", location.name);
        let tab = forecast_tab(&self.config.forecast_range);

        let headers = self.read_range(location, &format!("{tab}!A1:Z5")).await?;
        let header_rows = non_empty_rows(&headers, usize::MAX);

        let top = self.read_range(location, &format!("{tab}!A1:N20")).await?;
        let columns = top
            .row(0)
            .unwrap_or_default()
            .iter()
            .enumerate()
            .filter(|(_, header)| !header.is_empty())
            .map(|(i, header)| (extract::column_letter(i), header.clone()))
            .collect();

        let monthly = self.read_range(location, &self.config.monthly_tab_range).await?;
        let monthly_sample = non_empty_rows(&monthly, 10);

        let labels = self.read_range(location, &format!("{tab}!A1:B50")).await?;
        let metric_rows = extract::find_labeled_rows(&labels, &METRIC_KEYWORDS, MatchCase::Insensitive);

        Ok(Exploration {
            header_rows,
            columns,
            monthly_sample,
            metric_rows,
        })
    }

    /// Reads every location and writes the JS and Python goal modules.
    pub async fn generate_modules(&self, out_dir: &Path) -> Result<GeneratedModules> {
        let report = self.get_all_monthly_goals().await;

        let entries: Vec<ModuleEntry<'_>> = self
            .config
            .locations
            .iter()
            .zip(&report.locations)
            .map(|(location, (_, goals))| ModuleEntry {
                location,
                goals: goals.as_ref().map(|g| &g.monthly_goals),
            })
            .collect();

        let (js_path, py_path) = codegen::write_modules(out_dir, &report.timestamp, &entries)?;
        Ok(GeneratedModules {
            report,
            js_path,
            py_path,
        })
    }
}

/// Tab name of an A1 range, e.g. `2025 Forecast` from `2025 Forecast!A30:N50`.
fn forecast_tab(range: &str) -> &str {
    range.split_once('!').map_or(range, |(tab, _)| tab)
}

/// Rows among the first `limit` that have at least one non-empty cell.
fn non_empty_rows(range: &SheetRange, limit: usize) -> Vec<LabeledRow> {
    range
        .rows()
        .iter()
        .take(limit)
        .enumerate()
        .filter(|(_, row)| row.iter().any(|c| !c.is_empty()))
        .map(|(i, row)| LabeledRow {
            number: i + 1,
            cells: row.clone(),
        })
        .collect()
}
