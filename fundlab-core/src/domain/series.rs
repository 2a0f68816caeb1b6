use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Valuation convention for a fund series.
///
/// An instrument may carry one series per category; the two are never merged
/// with each other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Net-asset-value quotes published by the fund itself.
    Nav,
    /// Market-traded prices (exchange-listed funds).
    Market,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Nav => "nav",
            Category::Market => "market",
        }
    }
}

/// A single dated observation. No time-of-day component; one point per
/// instrument per date.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    /// Non-negative valuation. Malformed or negative source cells never
    /// reach this type; they are dropped at the ingestion boundary.
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// A cleaned per-instrument time series.
///
/// Invariants enforced by ingestion: points sorted ascending by date, no two
/// points share a date. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstrumentSeries {
    pub instrument_id: String,
    pub category: Category,
    pub points: Vec<SeriesPoint>,
}

impl InstrumentSeries {
    pub fn new(instrument_id: impl Into<String>, category: Category) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            category,
            points: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&SeriesPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.last()
    }

    /// Values in date order.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
}

/// Optional date window filter. Open bounds mean unbounded.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// The unbounded range: accepts every date.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        if let Some(start) = self.start {
            if date < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if date > end {
                return false;
            }
        }
        true
    }
}
