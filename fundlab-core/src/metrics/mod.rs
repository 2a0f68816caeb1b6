//! Metrics engine — pure functions that turn a cleaned series into
//! return, risk, and risk-adjusted performance figures.
//!
//! Every metric is a pure function: a chronologically sorted series in,
//! scalars out. Any ratio whose denominator is zero, and any statistic whose
//! sample is too small, comes back as `None` — never `NaN` or infinity.

pub mod detailed;
pub mod summary;

pub use detailed::{compute_detailed, DetailedMetrics};
pub use summary::{compute_metrics, horizon_return, ytd_return, MetricsResult};

/// Trading days per year, used for annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Calendar days per year (Julian), used for elapsed-time CAGR.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Fixed annual risk-free rate for Sharpe/Sortino numerators.
pub const RISK_FREE_RATE: f64 = 0.012;

/// Minimum series length for the volatility family (volatility, Sharpe,
/// Sortino, win rate): 31 points give at least 30 return observations.
pub const MIN_POINTS_VOLATILITY: usize = 31;

/// Minimum raw series length before monthly resampling; below this the
/// whole detailed block is `None`.
pub const MIN_POINTS_DETAILED: usize = 30;

/// Sentinel profit factor when there are gains and no losing months.
pub const PROFIT_FACTOR_SENTINEL: f64 = 100.0;

// ─── Shared helpers ──────────────────────────────────────────────────

/// Point-to-point fractional returns of consecutive values.
///
/// Not calendar-gap-aware: a return spans whatever the actual gap between
/// two adjacent points is. A non-positive predecessor yields 0.0 so one
/// placeholder cannot poison the whole distribution.
pub fn simple_returns(values: &[f64]) -> Vec<f64> {
    if values.len() < 2 {
        return Vec::new();
    }
    values
        .windows(2)
        .map(|w| {
            if w[0] > 0.0 {
                (w[1] - w[0]) / w[0]
            } else {
                0.0
            }
        })
        .collect()
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (not Bessel-corrected), matching the
/// convention used throughout: volatility, skewness, and kurtosis all
/// standardize by the same denominator.
pub(crate) fn pop_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Maximum drawdown from a running peak, as a signed negative percentage
/// (e.g., -18.2 = an 18.2% decline). `None` under 2 values.
///
/// The magnitude is always within [0, 100] and is 0 only for a
/// monotonically non-decreasing series.
pub fn max_drawdown_pct(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mut peak = values[0];
    let mut worst = 0.0_f64;
    for &v in values {
        if v > peak {
            peak = v;
        }
        if peak > 0.0 {
            let dd = (v - peak) / peak;
            if dd < worst {
                worst = dd;
            }
        }
    }
    Some(worst * 100.0)
}
