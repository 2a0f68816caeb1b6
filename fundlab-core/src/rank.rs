//! Null-safe ranking and fee attribute joins.
//!
//! Entries missing the sort key's value sort strictly after every defined
//! value, in both directions: an instrument with too little history for a
//! Sharpe ratio never floats to the top of a "worst Sharpe" view.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Category, FeeRecord};
use crate::metrics::MetricsResult;

/// Sortable columns of the ranking table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Instrument,
    Return1m,
    Return3m,
    Return6m,
    Return1y,
    Return3y,
    ReturnYtd,
    Volatility,
    Sharpe,
    Sortino,
    MaxDrawdown,
    WinRate,
    TotalExpenseRatio,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// One row of the ranking table: an instrument, its metrics, and the fee
/// attributes joined by instrument id (when available).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedEntry {
    pub instrument_id: String,
    pub category: Category,
    pub metrics: MetricsResult,
    pub fees: Option<FeeRecord>,
}

impl RankedEntry {
    pub fn new(instrument_id: impl Into<String>, category: Category, metrics: MetricsResult) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            category,
            metrics,
            fees: None,
        }
    }

    /// Attach the latest fee record for this instrument, if one exists.
    pub fn with_fees(mut self, latest: &HashMap<String, FeeRecord>) -> Self {
        self.fees = latest.get(&self.instrument_id).cloned();
        self
    }

    /// Numeric value of a sort key, `None` when not computable.
    /// `SortKey::Instrument` has no numeric value; identity sorts
    /// lexicographically instead.
    pub fn sort_value(&self, key: SortKey) -> Option<f64> {
        match key {
            SortKey::Instrument => None,
            SortKey::Return1m => self.metrics.return_1m,
            SortKey::Return3m => self.metrics.return_3m,
            SortKey::Return6m => self.metrics.return_6m,
            SortKey::Return1y => self.metrics.return_1y,
            SortKey::Return3y => self.metrics.return_3y,
            SortKey::ReturnYtd => self.metrics.return_ytd,
            SortKey::Volatility => self.metrics.volatility,
            SortKey::Sharpe => self.metrics.sharpe,
            SortKey::Sortino => self.metrics.sortino,
            SortKey::MaxDrawdown => self.metrics.max_drawdown,
            SortKey::WinRate => self.metrics.win_rate,
            SortKey::TotalExpenseRatio => {
                self.fees.as_ref().map(|f| f.total_expense_ratio)
            }
        }
    }
}

/// Current sort column and direction, with the toggle rule used by the
/// presentation layer: re-selecting the active key flips the direction, a
/// new key always starts descending.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortState {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(key: SortKey) -> Self {
        Self {
            key,
            direction: SortDirection::Descending,
        }
    }

    pub fn toggle(&mut self, key: SortKey) {
        if self.key == key {
            self.direction = match self.direction {
                SortDirection::Ascending => SortDirection::Descending,
                SortDirection::Descending => SortDirection::Ascending,
            };
        } else {
            self.key = key;
            self.direction = SortDirection::Descending;
        }
    }
}

/// Produce a total order over the entries: stable sort by the chosen key,
/// `None` values strictly last regardless of direction.
pub fn rank(mut entries: Vec<RankedEntry>, key: SortKey, direction: SortDirection) -> Vec<RankedEntry> {
    entries.sort_by(|a, b| {
        if key == SortKey::Instrument {
            let ord = a.instrument_id.cmp(&b.instrument_id);
            return match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            };
        }
        match (a.sort_value(key), b.sort_value(key)) {
            (Some(va), Some(vb)) => {
                let ord = va.total_cmp(&vb);
                match direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            }
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
    });
    entries
}
