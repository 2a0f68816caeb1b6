//! Merge raw batches into clean per-instrument series.
//!
//! Extracts from overlapping date windows routinely disagree: a later
//! re-extract may revise a value the older file already carried. The merge
//! resolves this deterministically: batches are processed in the order the
//! caller supplies (oldest covering window first, as established by the
//! external catalog), and for each (instrument, category, date) a later
//! batch's value overwrites an earlier one. Repeating the merge with the
//! same batches in the same order yields an identical result.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::{Category, DateRange, InstrumentSeries, SeriesPoint};

use super::extract::RawBatch;

/// Parse one raw cell into a valuation.
///
/// Source data is known noise: blank cells, placeholder dashes, thousands
/// separators. Anything that does not parse to a finite non-negative number
/// is missing, not zero.
fn parse_value(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value)
}

/// Merge raw batches into one series per (instrument, category).
///
/// - Cells that fail numeric parse are dropped silently.
/// - Cells outside `range` are dropped.
/// - Later batches overwrite earlier ones per date (last-write-wins under
///   the caller's precedence order).
/// - Output series carry ascending, duplicate-free dates; instruments whose
///   every cell was filtered out come back as valid empty series.
/// - Output order is deterministic: sorted by (instrument id, category).
pub fn merge_batches(batches: &[RawBatch], range: &DateRange) -> Vec<InstrumentSeries> {
    let mut merged: BTreeMap<(String, Category), BTreeMap<NaiveDate, f64>> = BTreeMap::new();

    for batch in batches {
        let points = merged
            .entry((batch.instrument_id.clone(), batch.category))
            .or_default();
        for (date, raw) in &batch.cells {
            if !range.contains(*date) {
                continue;
            }
            if let Some(value) = parse_value(raw) {
                points.insert(*date, value);
            }
        }
    }

    merged
        .into_iter()
        .map(|((instrument_id, category), points)| InstrumentSeries {
            instrument_id,
            category,
            points: points
                .into_iter()
                .map(|(date, value)| SeriesPoint::new(date, value))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn batch(id: &str, cells: &[(&str, &str)]) -> RawBatch {
        RawBatch {
            instrument_id: id.into(),
            category: Category::Nav,
            cells: cells
                .iter()
                .map(|(date, value)| (d(date), value.to_string()))
                .collect(),
        }
    }

    #[test]
    fn points_sorted_and_unique() {
        let batches = vec![batch(
            "0050",
            &[("2024-01-03", "10.6"), ("2024-01-02", "10.5"), ("2024-01-03", "10.7")],
        )];
        let series = merge_batches(&batches, &DateRange::all());
        assert_eq!(series.len(), 1);
        let points = &series[0].points;
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, d("2024-01-02"));
        assert_eq!(points[1].date, d("2024-01-03"));
        // last cell for the duplicated date wins
        assert_eq!(points[1].value, 10.7);
    }

    #[test]
    fn later_batch_overwrites_earlier() {
        let batches = vec![
            batch("0050", &[("2024-01-02", "10.5")]),
            batch("0050", &[("2024-01-02", "10.9")]),
        ];
        let series = merge_batches(&batches, &DateRange::all());
        assert_eq!(series[0].points[0].value, 10.9);
    }

    #[test]
    fn merge_is_idempotent() {
        let batches = vec![
            batch("0050", &[("2024-01-02", "10.5"), ("2024-01-03", "10.6")]),
            batch("0050", &[("2024-01-03", "10.8"), ("2024-01-04", "10.9")]),
        ];
        let first = merge_batches(&batches, &DateRange::all());
        let second = merge_batches(&batches, &DateRange::all());
        assert_eq!(first, second);
    }

    #[test]
    fn malformed_cells_dropped_silently() {
        let batches = vec![batch(
            "0050",
            &[
                ("2024-01-02", "10.5"),
                ("2024-01-03", "--"),
                ("2024-01-04", ""),
                ("2024-01-05", "abc"),
                ("2024-01-06", "-3.0"),
                ("2024-01-08", "NaN"),
            ],
        )];
        let series = merge_batches(&batches, &DateRange::all());
        assert_eq!(series[0].points.len(), 1);
        assert_eq!(series[0].points[0].value, 10.5);
    }

    #[test]
    fn thousands_separators_accepted() {
        let batches = vec![batch("0050", &[("2024-01-02", " 1,234.56 ")])];
        let series = merge_batches(&batches, &DateRange::all());
        assert_eq!(series[0].points[0].value, 1234.56);
    }

    #[test]
    fn window_excluding_everything_yields_empty_series() {
        let batches = vec![batch("0050", &[("2024-01-02", "10.5")])];
        let range = DateRange::new(Some(d("2025-01-01")), None);
        let series = merge_batches(&batches, &range);
        assert_eq!(series.len(), 1);
        assert!(series[0].is_empty());
    }

    #[test]
    fn categories_never_merged() {
        let nav = batch("0050", &[("2024-01-02", "10.5")]);
        let market = RawBatch {
            category: Category::Market,
            ..batch("0050", &[("2024-01-02", "10.8")])
        };
        let series = merge_batches(&[nav, market], &DateRange::all());
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].category, Category::Nav);
        assert_eq!(series[1].category, Category::Market);
        assert_eq!(series[0].points[0].value, 10.5);
        assert_eq!(series[1].points[0].value, 10.8);
    }

    #[test]
    fn output_order_deterministic_across_instruments() {
        let batches = vec![
            batch("0056", &[("2024-01-02", "32.0")]),
            batch("0050", &[("2024-01-02", "10.5")]),
        ];
        let series = merge_batches(&batches, &DateRange::all());
        assert_eq!(series[0].instrument_id, "0050");
        assert_eq!(series[1].instrument_id, "0056");
    }
}
