use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Calendar months, ordered January through December.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Month::January => "January",
            Month::February => "February",
            Month::March => "March",
            Month::April => "April",
            Month::May => "May",
            Month::June => "June",
            Month::July => "July",
            Month::August => "August",
            Month::September => "September",
            Month::October => "October",
            Month::November => "November",
            Month::December => "December",
        }
    }

    pub fn from_name(name: &str) -> Option<Month> {
        Month::ALL.into_iter().find(|m| m.name() == name)
    }

    /// Zero-based position in the year.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Month name to goal value, iterated in calendar order.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct MonthlyGoals(BTreeMap<Month, f64>);

impl MonthlyGoals {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, month: Month, value: f64) {
        self.0.insert(month, value);
    }

    pub fn get(&self, month: Month) -> Option<f64> {
        self.0.get(&month).copied()
    }

    pub fn get_by_name(&self, name: &str) -> Option<f64> {
        Month::from_name(name).and_then(|m| self.get(m))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Month, f64)> + '_ {
        self.0.iter().map(|(m, v)| (*m, *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }
}

impl fmt::Display for MonthlyGoals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (month, value) in self.iter() {
            writeln!(f, "  {:<10} {:>12.2}", month.name(), value)?;
        }
        Ok(())
    }
}

/// A snapshot of string cells read from a sheet. Rows may be ragged.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct SheetRange {
    rows: Vec<Vec<String>>,
}

impl SheetRange {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Bounds-checked cell access; cells past the end of a short row are `None`.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl From<Vec<Vec<String>>> for SheetRange {
    fn from(rows: Vec<Vec<String>>) -> Self {
        Self::new(rows)
    }
}

impl<'a> From<&[&[&'a str]]> for SheetRange {
    fn from(rows: &[&[&'a str]]) -> Self {
        Self::new(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }
}

/// Goals read for a single location.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LocationGoals {
    pub location: String,
    pub source: String,
    pub sheet_id: String,
    pub monthly_goals: MonthlyGoals,
}

/// Goals for every configured location at a point in time.
/// A location whose read failed maps to `None`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GoalsReport {
    pub locations: Vec<(String, Option<LocationGoals>)>,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn months_are_in_calendar_order() {
        assert_eq!(Month::ALL[0], Month::January);
        assert_eq!(Month::December.index(), 11);
        assert!(Month::March < Month::October);
        assert_eq!(Month::from_name("July"), Some(Month::July));
        assert_eq!(Month::from_name("july"), None);
    }

    #[test]
    fn cell_access_is_bounds_checked() {
        let range = SheetRange::from(&[&["a", "b"][..], &[][..], &["c"][..]][..]);
        assert_eq!(range.cell(0, 1), Some("b"));
        assert_eq!(range.cell(0, 2), None);
        assert_eq!(range.cell(1, 0), None);
        assert_eq!(range.cell(7, 0), None);
        assert_eq!(range.len(), 3);
    }

    #[test]
    fn goals_serialize_as_named_months() {
        let mut goals = MonthlyGoals::new();
        goals.insert(Month::February, 2.5);
        goals.insert(Month::January, 1000.0);
        let json = serde_json::to_string(&goals).unwrap();
        assert_eq!(json, r#"{"January":1000.0,"February":2.5}"#);

        let back: MonthlyGoals = serde_json::from_str(&json).unwrap();
        assert_eq!(back, goals);
        assert_eq!(back.get_by_name("February"), Some(2.5));
        assert_eq!(back.total(), 1002.5);
    }
}
