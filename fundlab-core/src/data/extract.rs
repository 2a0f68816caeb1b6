//! Wide extract parsing — locating the identifier and date columns.
//!
//! Source extracts arrive as wide tables: one row per instrument, one column
//! per observation date, plus descriptive columns (name, category text,
//! volume sums) that the engine ignores. This module turns such a table into
//! per-instrument batches of raw date/value cells without interpreting the
//! cell text; numeric parsing and the merge policy live in [`super::ingest`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Category;

/// Header date formats accepted for date-valued columns.
const HEADER_DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%Y-%m-%d"];

/// One extract file's contents as parsed by the host (e.g., via the csv
/// crate). `rows` may be ragged; short rows are treated as having blank
/// trailing cells.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Where to find the instrument identifier in an extract, and which
/// valuation convention the extract carries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractLayout {
    pub id_column: String,
    pub category: Category,
}

/// Raw dated cells for one instrument from one extract, in header order.
/// Cell text is unparsed; unparseable values are dropped later, silently.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBatch {
    pub instrument_id: String,
    pub category: Category,
    pub cells: Vec<(NaiveDate, String)>,
}

/// Errors from extract parsing.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("extract has no '{0}' column")]
    MissingIdColumn(String),

    #[error("extract has no date-valued columns")]
    NoDateColumns,
}

/// Parse a column header as an observation date, if it looks like one.
fn header_date(header: &str) -> Option<NaiveDate> {
    let trimmed = header.trim();
    HEADER_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// Split a wide extract table into one raw batch per instrument row.
///
/// Columns whose header parses as a `YYYY/M/D`-like date become observation
/// cells; the column named by `layout.id_column` supplies the instrument
/// identifier; every other column is ignored. Rows with a blank identifier
/// are skipped.
pub fn parse_extract(table: &RawTable, layout: &ExtractLayout) -> Result<Vec<RawBatch>, ExtractError> {
    let id_index = table
        .columns
        .iter()
        .position(|c| c.trim() == layout.id_column)
        .ok_or_else(|| ExtractError::MissingIdColumn(layout.id_column.clone()))?;

    let date_columns: Vec<(usize, NaiveDate)> = table
        .columns
        .iter()
        .enumerate()
        .filter_map(|(i, header)| header_date(header).map(|date| (i, date)))
        .collect();

    if date_columns.is_empty() {
        return Err(ExtractError::NoDateColumns);
    }

    let mut batches = Vec::new();
    for row in &table.rows {
        let instrument_id = match row.get(id_index) {
            Some(cell) if !cell.trim().is_empty() => cell.trim().to_string(),
            _ => continue,
        };

        let cells = date_columns
            .iter()
            .filter_map(|&(i, date)| row.get(i).map(|cell| (date, cell.clone())))
            .collect();

        batches.push(RawBatch {
            instrument_id,
            category: layout.category,
            cells,
        });
    }

    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn layout() -> ExtractLayout {
        ExtractLayout {
            id_column: "fund_id".into(),
            category: Category::Nav,
        }
    }

    fn table() -> RawTable {
        RawTable {
            columns: vec![
                "fund_id".into(),
                "fund_name".into(),
                "2024/1/2".into(),
                "2024/1/3".into(),
                "total_volume".into(),
            ],
            rows: vec![
                vec![
                    "0050".into(),
                    "Flagship Fund".into(),
                    "10.52".into(),
                    "10.61".into(),
                    "12345".into(),
                ],
                vec![
                    "0056".into(),
                    "Dividend Fund".into(),
                    "".into(),
                    "32.10".into(),
                    "999".into(),
                ],
            ],
        }
    }

    #[test]
    fn date_columns_located_by_header() {
        let batches = parse_extract(&table(), &layout()).unwrap();
        assert_eq!(batches.len(), 2);

        let first = &batches[0];
        assert_eq!(first.instrument_id, "0050");
        assert_eq!(first.category, Category::Nav);
        assert_eq!(
            first.cells,
            vec![
                (d("2024-01-02"), "10.52".to_string()),
                (d("2024-01-03"), "10.61".to_string()),
            ]
        );
    }

    #[test]
    fn non_date_columns_ignored() {
        let batches = parse_extract(&table(), &layout()).unwrap();
        // name and volume columns never show up as cells
        assert!(batches.iter().all(|b| b.cells.len() == 2));
    }

    #[test]
    fn dashed_date_headers_accepted() {
        let t = RawTable {
            columns: vec!["fund_id".into(), "2024-01-02".into()],
            rows: vec![vec!["0050".into(), "10.5".into()]],
        };
        let batches = parse_extract(&t, &layout()).unwrap();
        assert_eq!(batches[0].cells[0].0, d("2024-01-02"));
    }

    #[test]
    fn blank_identifier_rows_skipped() {
        let mut t = table();
        t.rows.push(vec!["  ".into(), "x".into(), "1.0".into(), "2.0".into()]);
        let batches = parse_extract(&t, &layout()).unwrap();
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn short_rows_yield_fewer_cells() {
        let mut t = table();
        t.rows.push(vec!["0052".into(), "Short Row".into(), "44.1".into()]);
        let batches = parse_extract(&t, &layout()).unwrap();
        let short = batches.iter().find(|b| b.instrument_id == "0052").unwrap();
        assert_eq!(short.cells.len(), 1);
    }

    #[test]
    fn missing_id_column_is_an_error() {
        let t = RawTable {
            columns: vec!["code".into(), "2024/1/2".into()],
            rows: vec![],
        };
        let err = parse_extract(&t, &layout()).unwrap_err();
        assert!(err.to_string().contains("fund_id"));
    }

    #[test]
    fn no_date_columns_is_an_error() {
        let t = RawTable {
            columns: vec!["fund_id".into(), "fund_name".into()],
            rows: vec![],
        };
        assert!(matches!(
            parse_extract(&t, &layout()),
            Err(ExtractError::NoDateColumns)
        ));
    }
}
