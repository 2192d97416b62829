//! Locating goal rows inside a sheet range and parsing their monthly values.
//!
//! Everything here is pure: functions take a borrowed [`SheetRange`] and
//! never perform I/O.

use thiserror::Error;

use crate::models::goals::{Month, MonthlyGoals, SheetRange};

/// Rows spanned by the data row search, counted from the section header.
/// The header itself is never taken as the data row.
pub const ROW_SEARCH_WINDOW: usize = 10;

/// Column holding January; December follows eleven columns later.
pub const FIRST_MONTH_COLUMN: usize = 2;

/// Which lookup failed during extraction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFound {
    #[error("no section labeled '{label}' in range")]
    Section { label: String },
    #[error("no '{category}' / '{sub_category}' row below the section header")]
    Row {
        category: String,
        sub_category: String,
    },
}

/// Index of the last row whose first cell contains `label`.
pub fn find_section(range: &SheetRange, label: &str) -> Option<usize> {
    (0..range.len())
        .filter(|&i| range.cell(i, 0).is_some_and(|c| c.contains(label)))
        .last()
}

/// Finds the row labeled `row_labels` under the last `section_label` header
/// and parses columns C..N as January..December.
///
/// Every month gets a value; empty, missing or unparsable cells become 0.
pub fn extract_monthly_goals(
    range: &SheetRange,
    section_label: &str,
    row_labels: (&str, &str),
) -> Result<MonthlyGoals, NotFound> {
    let anchor = find_section(range, section_label).ok_or_else(|| NotFound::Section {
        label: section_label.to_string(),
    })?;

    let end = (anchor + ROW_SEARCH_WINDOW).min(range.len());
    let row = (anchor + 1..end)
        .find(|&i| {
            range.cell(i, 0) == Some(row_labels.0) && range.cell(i, 1) == Some(row_labels.1)
        })
        .ok_or_else(|| NotFound::Row {
            category: row_labels.0.to_string(),
            sub_category: row_labels.1.to_string(),
        })?;

    let mut goals = MonthlyGoals::new();
    for month in Month::ALL {
        let value = match range.cell(row, FIRST_MONTH_COLUMN + month.index()) {
            Some(cell) if !cell.is_empty() => parse_currency(cell),
            _ => 0.0,
        };
        goals.insert(month, value);
    }
    Ok(goals)
}

/// Removes the first `$` and the first `,` and parses the leading number.
///
/// Only one comma is removed, so "$1,234,567" reads as 1234.
pub fn parse_currency(cell: &str) -> f64 {
    let cleaned = cell.replacen('$', "", 1).replacen(',', "", 1);
    match parse_float_prefix(&cleaned) {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Parses the longest decimal prefix after leading whitespace, ignoring
/// any trailing text. Returns `None` when there is no numeric prefix.
fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}

/// A labeled row from a section preview: the label and up to twelve values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRow {
    pub label: String,
    pub cells: Vec<String>,
}

/// Rows of the last `section_label` section that carry a label in column A,
/// limited to `window` rows from the header.
pub fn section_preview(range: &SheetRange, section_label: &str, window: usize) -> Vec<PreviewRow> {
    let Some(anchor) = find_section(range, section_label) else {
        return Vec::new();
    };
    let end = (anchor + window).min(range.len());

    (anchor..end)
        .filter_map(|i| {
            let label = range.cell(i, 0).filter(|c| !c.is_empty())?;
            let cells = (1..=12)
                .map_while(|col| range.cell(i, col))
                .map(str::to_string)
                .collect();
            Some(PreviewRow {
                label: label.to_string(),
                cells,
            })
        })
        .collect()
}

/// A row whose first cell matched a keyword; `number` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledRow {
    pub number: usize,
    pub cells: Vec<String>,
}

/// How keywords are compared against row labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchCase {
    Sensitive,
    Insensitive,
}

/// Every row whose first cell contains one of `keywords`.
pub fn find_labeled_rows(range: &SheetRange, keywords: &[&str], case: MatchCase) -> Vec<LabeledRow> {
    let fold = |s: &str| match case {
        MatchCase::Sensitive => s.to_string(),
        MatchCase::Insensitive => s.to_lowercase(),
    };
    let keywords: Vec<String> = keywords.iter().map(|k| fold(k)).collect();

    range
        .rows()
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            range.cell(*i, 0).is_some_and(|label| {
                let label = fold(label);
                !label.is_empty() && keywords.iter().any(|k| label.contains(k.as_str()))
            })
        })
        .map(|(i, row)| LabeledRow {
            number: i + 1,
            cells: row.clone(),
        })
        .collect()
}

/// Spreadsheet column letter for a zero-based index (0 -> A, 26 -> AA).
pub fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(rows: &[&[&str]]) -> SheetRange {
        SheetRange::from(rows)
    }

    fn merch_row<'a>(values: &[&'a str]) -> Vec<&'a str> {
        let mut row = vec!["Sales", "Merchandise"];
        row.extend_from_slice(values);
        row
    }

    #[test]
    fn missing_section_is_not_found() {
        let r = range(&[&["2024 Goal"], &["Sales", "Merchandise", "$1"]]);
        let err = extract_monthly_goals(&r, "2025 Goal", ("Sales", "Merchandise")).unwrap_err();
        assert!(matches!(err, NotFound::Section { .. }));
    }

    #[test]
    fn empty_range_is_not_found() {
        let r = SheetRange::default();
        assert!(extract_monthly_goals(&r, "2025 Goal", ("Sales", "Merchandise")).is_err());
    }

    #[test]
    fn row_outside_window_is_not_found() {
        let mut rows: Vec<Vec<&str>> = vec![vec!["2025 Goal"]];
        for _ in 0..9 {
            rows.push(vec!["Other", "Row"]);
        }
        rows.push(merch_row(&["$1,000"]));
        let rows: Vec<&[&str]> = rows.iter().map(Vec::as_slice).collect();
        let r = range(&rows);

        let err = extract_monthly_goals(&r, "2025 Goal", ("Sales", "Merchandise")).unwrap_err();
        assert_eq!(
            err,
            NotFound::Row {
                category: "Sales".to_string(),
                sub_category: "Merchandise".to_string(),
            }
        );
        assert_eq!(
            err.to_string(),
            "no 'Sales' / 'Merchandise' row below the section header"
        );
    }

    #[test]
    fn row_on_last_window_row_is_found() {
        let mut rows: Vec<Vec<&str>> = vec![vec!["2025 Goal"]];
        for _ in 0..8 {
            rows.push(vec![]);
        }
        rows.push(merch_row(&["$7"]));
        let rows: Vec<&[&str]> = rows.iter().map(Vec::as_slice).collect();
        let goals = extract_monthly_goals(&range(&rows), "2025 Goal", ("Sales", "Merchandise"))
            .unwrap();
        assert_eq!(goals.get(Month::January), Some(7.0));
    }

    #[test]
    fn parses_currency_and_defaults_blanks() {
        let row = merch_row(&["$1,000", "", "2500", "$3,000.50"]);
        let r = range(&[&["2025 Goal"], &row]);
        let goals = extract_monthly_goals(&r, "2025 Goal", ("Sales", "Merchandise")).unwrap();

        assert_eq!(goals.len(), 12);
        assert_eq!(goals.get(Month::January), Some(1000.0));
        assert_eq!(goals.get(Month::February), Some(0.0));
        assert_eq!(goals.get(Month::March), Some(2500.0));
        assert_eq!(goals.get(Month::April), Some(3000.50));
        assert_eq!(goals.get(Month::December), Some(0.0));
    }

    #[test]
    fn only_first_comma_is_removed() {
        assert_eq!(parse_currency("$4,444,444"), 4444.0);
        assert_eq!(parse_currency("1,234,567"), 1234.0);
        assert_eq!(parse_currency("$12,345"), 12345.0);
    }

    #[test]
    fn unparsable_cells_become_zero() {
        assert_eq!(parse_currency("n/a"), 0.0);
        assert_eq!(parse_currency("$"), 0.0);
        assert_eq!(parse_currency(" "), 0.0);
        assert_eq!(parse_currency("(1,000)"), 0.0);
        assert_eq!(parse_currency("-$250"), -250.0);
        assert_eq!(parse_currency("12.5%"), 12.5);
        assert_eq!(parse_currency(".5"), 0.5);
        assert_eq!(parse_currency("1e3"), 1000.0);
        assert_eq!(parse_currency("2e"), 2.0);
    }

    #[test]
    fn last_section_header_wins() {
        let early = merch_row(&["$1"]);
        let late = merch_row(&["$2"]);
        let r = range(&[
            &["2025 Goal (draft)"],
            &early,
            &["2025 Goal"],
            &late,
        ]);
        let goals = extract_monthly_goals(&r, "2025 Goal", ("Sales", "Merchandise")).unwrap();
        assert_eq!(goals.get(Month::January), Some(2.0));
        assert_eq!(find_section(&r, "2025 Goal"), Some(2));
    }

    #[test]
    fn end_to_end_full_year() {
        let values = [
            "$10,000", "$20,000", "$30,000", "$40,000", "$50,000", "$60,000", "$70,000",
            "$80,000", "$90,000", "$100,000", "$110,000", "$120,000",
        ];
        let row = merch_row(&values);
        let r = range(&[&["2025 Goal"], &[], &row, &["Sales", "Workshops", "$5"]]);
        let goals = extract_monthly_goals(&r, "2025 Goal", ("Sales", "Merchandise")).unwrap();

        for (i, (month, value)) in goals.iter().enumerate() {
            assert_eq!(month, Month::ALL[i]);
            assert_eq!(value, 10_000.0 * (i as f64 + 1.0));
        }
    }

    #[test]
    fn labels_must_match_exactly() {
        let r = range(&[
            &["2025 Goal"],
            &["Sales ", "Merchandise", "$1"],
            &["Sales", "merchandise", "$1"],
        ]);
        assert!(extract_monthly_goals(&r, "2025 Goal", ("Sales", "Merchandise")).is_err());
    }

    #[test]
    fn extraction_is_repeatable_and_leaves_input_alone() {
        let row = merch_row(&["$1,000", "abc", "3"]);
        let r = range(&[&["2025 Goal"], &row]);
        let before = r.clone();
        let a = extract_monthly_goals(&r, "2025 Goal", ("Sales", "Merchandise")).unwrap();
        let b = extract_monthly_goals(&r, "2025 Goal", ("Sales", "Merchandise")).unwrap();
        assert_eq!(a, b);
        assert_eq!(r, before);
    }

    #[test]
    fn preview_keeps_labeled_rows_of_last_section() {
        let r = range(&[
            &["2025 Goal"],
            &["", "ignored"],
            &["Sales", "Merchandise", "$1"],
            &["Traffic"],
        ]);
        let preview = section_preview(&r, "2025 Goal", ROW_SEARCH_WINDOW);
        assert_eq!(preview.len(), 3);
        assert_eq!(preview[1].label, "Sales");
        assert_eq!(preview[1].cells, vec!["Merchandise", "$1"]);
        assert!(preview[2].cells.is_empty());
        assert!(section_preview(&r, "2026 Goal", 10).is_empty());
    }

    #[test]
    fn labeled_rows_match_keywords_case_insensitively() {
        let r = range(&[
            &["Date", "Sales"],
            &["Monthly TOTAL", "$9"],
            &[],
            &["Daily goal", "$1"],
        ]);
        let rows = find_labeled_rows(&r, &["total", "goal"], MatchCase::Insensitive);
        let numbers: Vec<usize> = rows.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![2, 4]);
    }

    #[test]
    fn case_sensitive_scan_skips_lowercase_matches() {
        let r = range(&[
            &["Subtotal", "$3"],
            &["Monthly Total", "$9"],
            &["daily goal", "$1"],
            &["Goal", "$2"],
        ]);
        let rows = find_labeled_rows(&r, &["Total", "Goal"], MatchCase::Sensitive);
        let numbers: Vec<usize> = rows.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![2, 4]);
    }

    #[test]
    fn header_row_is_not_its_own_data_row() {
        let r = range(&[&["Sales", "Merchandise", "$5"]]);
        let err = extract_monthly_goals(&r, "Sales", ("Sales", "Merchandise")).unwrap_err();
        assert!(matches!(err, NotFound::Row { .. }));

        let r = range(&[&["Merchandise Goal", "Merchandise", "$5"], &["Merchandise Goal", "Merchandise", "$6"]]);
        let err = extract_monthly_goals(&r, "Goal", ("Merchandise Goal", "Merchandise")).unwrap_err();
        assert!(matches!(err, NotFound::Row { .. }));
    }

    #[test]
    fn section_error_names_the_label() {
        let err = extract_monthly_goals(&SheetRange::default(), "2025 Goal", ("a", "b")).unwrap_err();
        assert_eq!(err.to_string(), "no section labeled '2025 Goal' in range");
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(13), "N");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
    }
}
