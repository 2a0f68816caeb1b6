//! Summary metrics: horizon returns, volatility, Sharpe/Sortino, win rate,
//! max drawdown.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::InstrumentSeries;

use super::{
    max_drawdown_pct, mean, pop_std, simple_returns, MIN_POINTS_VOLATILITY, RISK_FREE_RATE,
    TRADING_DAYS_PER_YEAR,
};

/// Headline metrics for one instrument series.
///
/// `None` always means "not computable from this sample" — callers must not
/// read it as zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MetricsResult {
    /// Horizon returns, percent.
    pub return_1m: Option<f64>,
    pub return_3m: Option<f64>,
    pub return_6m: Option<f64>,
    pub return_1y: Option<f64>,
    pub return_3y: Option<f64>,
    pub return_ytd: Option<f64>,
    /// Annualized volatility, percent.
    pub volatility: Option<f64>,
    pub sharpe: Option<f64>,
    pub sortino: Option<f64>,
    /// Percent of point-to-point returns strictly greater than zero.
    pub win_rate: Option<f64>,
    /// Signed negative percent (see [`max_drawdown_pct`]).
    pub max_drawdown: Option<f64>,
}

/// Return over the trailing `months` horizon, percent.
///
/// The anchor is the first point whose date is on or after
/// `last date - months`. A series whose history starts after that target
/// does not reach back far enough and yields `None`.
pub fn horizon_return(series: &InstrumentSeries, months: u32) -> Option<f64> {
    let latest = series.last()?;
    let target = latest.date.checked_sub_months(Months::new(months))?;
    return_since(series, target)
}

/// Year-to-date return, percent: anchored at January 1 of the last point's
/// year under the same first-point-on-or-after rule.
pub fn ytd_return(series: &InstrumentSeries) -> Option<f64> {
    let latest = series.last()?;
    let target = NaiveDate::from_ymd_opt(latest.date.year(), 1, 1)?;
    return_since(series, target)
}

fn return_since(series: &InstrumentSeries, target: NaiveDate) -> Option<f64> {
    let first = series.first()?;
    if first.date > target {
        // series doesn't reach that far back
        return None;
    }
    let latest = series.last()?;
    let anchor = series.points.iter().find(|p| p.date >= target)?;
    if anchor.value == 0.0 {
        return None;
    }
    Some((latest.value - anchor.value) / anchor.value * 100.0)
}

/// Compute the headline metrics block.
///
/// Fewer than 2 points: everything is `None`. The volatility family
/// (volatility, Sharpe, Sortino, win rate) additionally requires
/// [`MIN_POINTS_VOLATILITY`] points, i.e. at least 30 return observations.
pub fn compute_metrics(series: &InstrumentSeries) -> MetricsResult {
    if series.len() < 2 {
        return MetricsResult::default();
    }

    let values = series.values();
    let returns = simple_returns(&values);

    let mut result = MetricsResult {
        return_1m: horizon_return(series, 1),
        return_3m: horizon_return(series, 3),
        return_6m: horizon_return(series, 6),
        return_1y: horizon_return(series, 12),
        return_3y: horizon_return(series, 36),
        return_ytd: ytd_return(series),
        max_drawdown: max_drawdown_pct(&values),
        ..MetricsResult::default()
    };

    if series.len() < MIN_POINTS_VOLATILITY {
        return result;
    }

    let vol = pop_std(&returns) * TRADING_DAYS_PER_YEAR.sqrt();
    result.volatility = Some(vol * 100.0);

    let annualized_return = mean(&returns) * TRADING_DAYS_PER_YEAR;
    if vol > 0.0 {
        result.sharpe = Some((annualized_return - RISK_FREE_RATE) / vol);
    }

    // Downside deviation uses the full return count in the denominator,
    // not just the count of negative returns.
    let downside_sq_sum: f64 = returns.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum();
    let downside = (downside_sq_sum / returns.len() as f64).sqrt() * TRADING_DAYS_PER_YEAR.sqrt();
    if downside > 0.0 {
        result.sortino = Some((annualized_return - RISK_FREE_RATE) / downside);
    }

    let winners = returns.iter().filter(|&&r| r > 0.0).count();
    result.win_rate = Some(winners as f64 / returns.len() as f64 * 100.0);

    result
}
