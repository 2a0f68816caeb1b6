//! Domain types for FundLab

pub mod fees;
pub mod series;

pub use fees::{latest_fees, FeeRecord};
pub use series::{Category, DateRange, InstrumentSeries, SeriesPoint};
