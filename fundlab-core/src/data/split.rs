//! Heuristic split detection and prefix rescaling.
//!
//! A fund that splits its units (one share becomes N) shows an abrupt
//! proportional price drop that corrupts every return and volatility figure
//! computed across the jump. The detector scans adjacent observations for a
//! drop matching one of a small table of integer ratios and, on a match,
//! divides the pre-event prefix by the ratio. This is a heuristic over the
//! price series itself, not a corporate-action lookup, and at most one event
//! is ever applied per series; multi-event detection would require iterative
//! re-scanning after each adjustment and is deliberately not modeled.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{InstrumentSeries, SeriesPoint};

/// Integer split ratios the detector recognizes.
const KNOWN_RATIOS: [u32; 5] = [2, 3, 4, 5, 10];

/// Values at or below this are placeholder noise, discarded before scanning.
const PREFILTER_FLOOR: f64 = 1.0;

/// Pairs where either value sits below this are too noisy to trust.
const NOISE_FLOOR: f64 = 10.0;

/// A pair further apart than this many calendar days is a data gap, not a
/// split.
const MAX_GAP_DAYS: i64 = 14;

/// Minimum proportional drop for a pair to be a candidate at all.
const MIN_DROP: f64 = 0.40;

/// Half-width of the accepted band around each ratio's expected drop.
const DROP_BAND: f64 = 0.02;

/// Maximum relative error between the observed value ratio and the candidate
/// integer ratio.
const RATIO_TOLERANCE: f64 = 0.15;

/// A detected split: the last pre-split date and the ratio to divide the
/// prefix by.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SplitEvent {
    /// Date of the last observation at the pre-split scale. Every point at
    /// or before this date gets rescaled.
    pub at_date: NaiveDate,
    pub ratio: u32,
    /// Pre-event value, used to pick the most economically significant jump
    /// when several candidates pass the filters.
    pub pre_value: f64,
}

/// Match a proportional drop and value ratio against the known ratio table.
///
/// The drop must fall within the band around `1 - 1/ratio`, and the raw
/// value ratio must be within [`RATIO_TOLERANCE`] relative error of the
/// integer ratio — the second check rejects drops that merely land in the
/// percentage band by coincidence.
fn match_ratio(before: f64, after: f64) -> Option<u32> {
    let drop = 1.0 - after / before;
    KNOWN_RATIOS.into_iter().find(|&ratio| {
        let expected_drop = 1.0 - 1.0 / ratio as f64;
        let value_ratio = before / after;
        (drop - expected_drop).abs() <= DROP_BAND
            && ((value_ratio - ratio as f64) / ratio as f64).abs() <= RATIO_TOLERANCE
    })
}

/// Scan a series for a single structural split.
///
/// Returns the candidate with the highest pre-event value when several pairs
/// pass all filters, or `None` when nothing qualifies.
pub fn detect_split(series: &InstrumentSeries) -> Option<SplitEvent> {
    let scanned: Vec<&SeriesPoint> = series
        .points
        .iter()
        .filter(|p| p.value > PREFILTER_FLOOR)
        .collect();

    let mut best: Option<SplitEvent> = None;
    for pair in scanned.windows(2) {
        let (before, after) = (pair[0], pair[1]);

        if (after.date - before.date).num_days() > MAX_GAP_DAYS {
            continue;
        }
        if before.value < NOISE_FLOOR || after.value < NOISE_FLOOR {
            continue;
        }
        if 1.0 - after.value / before.value < MIN_DROP {
            continue;
        }

        if let Some(ratio) = match_ratio(before.value, after.value) {
            let candidate = SplitEvent {
                at_date: before.date,
                ratio,
                pre_value: before.value,
            };
            if best.map_or(true, |b| candidate.pre_value > b.pre_value) {
                best = Some(candidate);
            }
        }
    }
    best
}

/// Detect a split and rescale the pre-event prefix.
///
/// The adjustment is applied against the original, unfiltered series: the
/// result has the same length and date set as the input, with every value at
/// or before the event date divided by the ratio. With no detection the
/// input comes back unchanged, value-for-value.
pub fn adjust_split(series: &InstrumentSeries) -> InstrumentSeries {
    let Some(event) = detect_split(series) else {
        return series.clone();
    };

    let divisor = event.ratio as f64;
    InstrumentSeries {
        instrument_id: series.instrument_id.clone(),
        category: series.category,
        points: series
            .points
            .iter()
            .map(|p| {
                if p.date <= event.at_date {
                    SeriesPoint::new(p.date, p.value / divisor)
                } else {
                    *p
                }
            })
            .collect(),
    }
}
