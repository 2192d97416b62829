use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::goals::SheetRange;

// Response structs for the Sheets v4 API
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    pub range: Option<String>,
    pub major_dimension: Option<String>,
    // Omitted by the API when the range is blank
    #[serde(default)]
    pub values: Vec<Vec<String>>,
}

impl From<ValueRange> for SheetRange {
    fn from(value_range: ValueRange) -> Self {
        SheetRange::new(value_range.values)
    }
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Spreadsheet {
    pub spreadsheet_id: String,
    pub properties: SpreadsheetProperties,
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

impl Spreadsheet {
    pub fn tab_titles(&self) -> Vec<&str> {
        self.sheets
            .iter()
            .map(|s| s.properties.title.as_str())
            .collect()
    }
}

impl fmt::Display for Spreadsheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Title: {}", self.properties.title)?;
        write!(f, "Sheets: {}", self.tab_titles().join(", "))
    }
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetProperties {
    pub title: String,
    pub locale: Option<String>,
    pub time_zone: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Sheet {
    pub properties: SheetProperties,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    pub sheet_id: Option<i64>,
    pub title: String,
    pub index: Option<i64>,
}
