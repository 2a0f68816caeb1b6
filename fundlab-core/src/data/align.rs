//! Multi-instrument date alignment.
//!
//! Given several instrument series, align them to the union of their dates
//! with per-instrument forward-fill. An instrument has no value before its
//! first native observation: that axis slot is `None`, never zero and never
//! interpolated backward.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::InstrumentSeries;

/// How aligned values are expressed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlignMode {
    /// Raw valuations.
    Absolute,
    /// Percent change from each instrument's own first aligned value.
    RebasedPercent,
}

/// Aligned values for multiple instruments on a common date axis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlignedSeries {
    /// The common date axis (strictly ascending).
    pub dates: Vec<NaiveDate>,
    /// Values per instrument, one slot per axis date. `None` before the
    /// instrument's first native observation.
    pub values: HashMap<String, Vec<Option<f64>>>,
    /// Instruments included, in input order.
    pub instruments: Vec<String>,
}

/// Align instrument series onto the union of their dates with forward-fill.
///
/// In `RebasedPercent` mode each instrument's filled values become
/// `100 * (v - v0) / v0`, with `v0` that instrument's own first aligned
/// value — each instrument rebases independently from wherever its data
/// begins, so its first aligned value is exactly 0. An instrument whose
/// first value is 0 cannot be rebased and keeps all slots `None`.
pub fn align(series: &[InstrumentSeries], mode: AlignMode) -> AlignedSeries {
    let mut all_dates = BTreeSet::new();
    for s in series {
        for p in &s.points {
            all_dates.insert(p.date);
        }
    }
    let dates: Vec<NaiveDate> = all_dates.into_iter().collect();

    let mut values: HashMap<String, Vec<Option<f64>>> = HashMap::new();
    let mut instruments = Vec::with_capacity(series.len());

    for s in series {
        instruments.push(s.instrument_id.clone());

        let native: HashMap<NaiveDate, f64> =
            s.points.iter().map(|p| (p.date, p.value)).collect();

        let mut last_known: Option<f64> = None;
        let mut filled: Vec<Option<f64>> = dates
            .iter()
            .map(|date| {
                if let Some(&v) = native.get(date) {
                    last_known = Some(v);
                }
                last_known
            })
            .collect();

        if mode == AlignMode::RebasedPercent {
            let base = filled.iter().flatten().next().copied();
            filled = match base {
                Some(v0) if v0 != 0.0 => filled
                    .iter()
                    .map(|v| v.map(|v| 100.0 * (v - v0) / v0))
                    .collect(),
                // zero base: percent change undefined for the whole series
                Some(_) => vec![None; filled.len()],
                None => filled,
            };
        }

        values.insert(s.instrument_id.clone(), filled);
    }

    AlignedSeries {
        dates,
        values,
        instruments,
    }
}
