//! Detailed metrics block: CAGR, Calmar, and monthly-frequency
//! distribution statistics (VaR/CVaR, skew/kurtosis, profit factor).

use serde::{Deserialize, Serialize};

use crate::domain::InstrumentSeries;

use super::{
    max_drawdown_pct, mean, pop_std, simple_returns, DAYS_PER_YEAR, MIN_POINTS_DETAILED,
    PROFIT_FACTOR_SENTINEL,
};

/// Monthly-frequency statistics for one instrument series.
///
/// Produced only when the raw series carries at least
/// [`MIN_POINTS_DETAILED`] points; individual fields still degrade to `None`
/// (or a documented sentinel) on their own thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetailedMetrics {
    /// CAGR over the exact elapsed calendar span, percent. `None` for a
    /// single-day span or a zero first value.
    pub annualized_return: Option<f64>,
    /// Daily-granularity max drawdown over the full series, signed negative
    /// percent.
    pub max_drawdown: Option<f64>,
    /// `annualized_return / |max_drawdown|`. Zero drawdown yields `None`,
    /// consistent with the null-on-zero-denominator policy of
    /// Sharpe/Sortino.
    pub calmar: Option<f64>,
    /// Monthly 95% Value-at-Risk: the monthly return at rank
    /// `floor(0.05 * count)` of the ascending sort, percent.
    pub var_95: Option<f64>,
    /// Mean of the monthly returns at or below the VaR rank, percent.
    pub cvar_95: Option<f64>,
    /// Third standardized moment of monthly returns (population).
    pub skewness: Option<f64>,
    /// Excess kurtosis of monthly returns (population, raw minus 3).
    pub kurtosis: Option<f64>,
    /// Sum of positive monthly returns over |sum of negative ones|.
    /// [`PROFIT_FACTOR_SENTINEL`] with gains and no losses, 0.0 with
    /// neither — explicit non-null degenerate outputs.
    pub profit_factor: f64,
    /// Mean positive / negative monthly return, percent; 0.0 when the
    /// respective set is empty.
    pub avg_monthly_gain: f64,
    pub avg_monthly_loss: f64,
    pub positive_months: usize,
    pub negative_months: usize,
    /// Number of daily return observations used.
    pub sample_size: usize,
}

/// Resample to one representative value per (year, month): the last point
/// seen in a single ascending pass.
fn monthly_values(series: &InstrumentSeries) -> Vec<f64> {
    use chrono::Datelike;
    use std::collections::BTreeMap;

    let mut by_month: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for p in &series.points {
        by_month.insert((p.date.year(), p.date.month()), p.value);
    }
    by_month.into_values().collect()
}

/// Consecutive percent changes of the monthly representative values.
fn monthly_returns(series: &InstrumentSeries) -> Vec<f64> {
    simple_returns(&monthly_values(series))
        .into_iter()
        .map(|r| r * 100.0)
        .collect()
}

/// Compute the detailed block, or `None` when the raw series is shorter
/// than [`MIN_POINTS_DETAILED`].
pub fn compute_detailed(series: &InstrumentSeries) -> Option<DetailedMetrics> {
    if series.len() < MIN_POINTS_DETAILED {
        return None;
    }

    let values = series.values();
    let daily = simple_returns(&values);

    let first = series.first()?;
    let last = series.last()?;
    let years = (last.date - first.date).num_days() as f64 / DAYS_PER_YEAR;

    let annualized_return = if years > 0.0 && first.value > 0.0 {
        let total = (last.value - first.value) / first.value;
        Some(((1.0 + total).powf(1.0 / years) - 1.0) * 100.0)
    } else {
        None
    };

    let max_drawdown = max_drawdown_pct(&values);

    let calmar = match (annualized_return, max_drawdown) {
        (Some(ann), Some(dd)) if dd != 0.0 => Some(ann / dd.abs()),
        _ => None,
    };

    let monthly = monthly_returns(series);

    let (var_95, cvar_95) = tail_risk(&monthly);

    let (skewness, kurtosis) = if monthly.is_empty() {
        (None, None)
    } else {
        (Some(skew(&monthly)), Some(excess_kurtosis(&monthly)))
    };

    let gains: Vec<f64> = monthly.iter().copied().filter(|&r| r > 0.0).collect();
    let losses: Vec<f64> = monthly.iter().copied().filter(|&r| r < 0.0).collect();

    let gain_sum: f64 = gains.iter().sum();
    let loss_sum: f64 = losses.iter().map(|l| l.abs()).sum();
    let profit_factor = if loss_sum > 0.0 {
        gain_sum / loss_sum
    } else if gain_sum > 0.0 {
        PROFIT_FACTOR_SENTINEL
    } else {
        0.0
    };

    Some(DetailedMetrics {
        annualized_return,
        max_drawdown,
        calmar,
        var_95,
        cvar_95,
        skewness,
        kurtosis,
        profit_factor,
        avg_monthly_gain: mean(&gains),
        avg_monthly_loss: mean(&losses),
        positive_months: gains.len(),
        negative_months: losses.len(),
        sample_size: daily.len(),
    })
}

/// Monthly VaR95 and CVaR95 over ascending-sorted monthly returns.
///
/// VaR is the element at rank `floor(0.05 * n)` (0-indexed); CVaR averages
/// everything at or below that rank, which is never empty when VaR exists,
/// so the degenerate one-element tail falls out naturally.
fn tail_risk(monthly: &[f64]) -> (Option<f64>, Option<f64>) {
    if monthly.is_empty() {
        return (None, None);
    }
    let mut sorted = monthly.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (0.05 * sorted.len() as f64).floor() as usize;
    let var = sorted[rank];
    let cvar = mean(&sorted[..=rank]);
    (Some(var), Some(cvar))
}

/// Third standardized moment, population convention. 0.0 on zero spread.
fn skew(returns: &[f64]) -> f64 {
    let std = pop_std(returns);
    if std < 1e-15 {
        return 0.0;
    }
    let m = mean(returns);
    returns.iter().map(|r| ((r - m) / std).powi(3)).sum::<f64>() / returns.len() as f64
}

/// Fourth standardized moment minus 3, population convention. 0.0 on zero
/// spread.
fn excess_kurtosis(returns: &[f64]) -> f64 {
    let std = pop_std(returns);
    if std < 1e-15 {
        return 0.0;
    }
    let m = mean(returns);
    returns.iter().map(|r| ((r - m) / std).powi(4)).sum::<f64>() / returns.len() as f64 - 3.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, SeriesPoint};
    use chrono::{Duration, NaiveDate};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn daily(start: &str, values: &[f64]) -> InstrumentSeries {
        let start = d(start);
        InstrumentSeries {
            instrument_id: "0050".into(),
            category: Category::Nav,
            points: values
                .iter()
                .enumerate()
                .map(|(i, &v)| SeriesPoint::new(start + Duration::days(i as i64), v))
                .collect(),
        }
    }

    /// Eleven points per month, the month's representative (last) value
    /// landing on the 15th. Three months already clear the 30-point gate.
    fn semimonthly(values_by_month: &[f64]) -> InstrumentSeries {
        let mut points = Vec::new();
        let mut year = 2022;
        let mut month = 1;
        for &v in values_by_month {
            for day in 1..=10 {
                points.push(SeriesPoint::new(
                    NaiveDate::from_ymd_opt(year, month, day).unwrap(),
                    v * 0.99,
                ));
            }
            points.push(SeriesPoint::new(
                NaiveDate::from_ymd_opt(year, month, 15).unwrap(),
                v,
            ));
            month += 1;
            if month > 12 {
                month = 1;
                year += 1;
            }
        }
        InstrumentSeries {
            instrument_id: "0050".into(),
            category: Category::Nav,
            points,
        }
    }

    // ── Gate ──

    #[test]
    fn under_thirty_points_is_none() {
        let s = daily("2024-01-02", &vec![100.0; 29]);
        assert!(compute_detailed(&s).is_none());
    }

    #[test]
    fn thirty_points_is_some() {
        let s = daily("2024-01-02", &vec![100.0; 30]);
        assert!(compute_detailed(&s).is_some());
    }

    // ── Monthly resampling ──

    #[test]
    fn representative_monthly_value_is_last_of_month() {
        let s = semimonthly(&[100.0, 110.0, 121.0]);
        let values = monthly_values(&s);
        assert_eq!(values, vec![100.0, 110.0, 121.0]);
    }

    #[test]
    fn monthly_returns_are_consecutive_percent_changes() {
        let s = semimonthly(&[100.0, 110.0, 121.0]);
        let returns = monthly_returns(&s);
        assert_eq!(returns.len(), 2);
        assert!((returns[0] - 10.0).abs() < 1e-10);
        assert!((returns[1] - 10.0).abs() < 1e-10);
    }

    // ── CAGR ──

    #[test]
    fn cagr_doubles_in_a_year() {
        let mut values = vec![100.0];
        for i in 1..366 {
            values.push(100.0 * 2.0f64.powf(i as f64 / 365.0));
        }
        let s = daily("2023-01-01", &values);
        let m = compute_detailed(&s).unwrap();
        // 365 elapsed days over a 365.25-day year: a hair above 100%
        let ann = m.annualized_return.unwrap();
        assert!((ann - 100.0).abs() < 1.0, "CAGR should be ~100%, got {ann}");
    }

    #[test]
    fn zero_first_value_null_cagr() {
        let mut values = vec![0.0];
        values.extend(std::iter::repeat(100.0).take(29));
        let s = daily("2024-01-02", &values);
        let m = compute_detailed(&s).unwrap();
        assert!(m.annualized_return.is_none());
        assert!(m.calmar.is_none());
    }

    // ── Calmar ──

    #[test]
    fn calmar_none_on_zero_drawdown() {
        let values: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let s = daily("2024-01-02", &values);
        let m = compute_detailed(&s).unwrap();
        assert_eq!(m.max_drawdown, Some(0.0));
        assert!(m.calmar.is_none());
    }

    #[test]
    fn calmar_positive_for_gain_with_dip() {
        let mut values: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        values.extend((0..20).map(|i| 139.0 - i as f64)); // dip
        values.extend((0..40).map(|i| 120.0 + i as f64 * 2.0)); // recover
        let s = daily("2023-01-01", &values);
        let m = compute_detailed(&s).unwrap();
        let calmar = m.calmar.unwrap();
        assert!(calmar > 0.0, "calmar should be positive, got {calmar}");
    }

    // ── Tail risk ──

    #[test]
    fn var_rank_and_inclusive_tail() {
        // 40 monthly returns: rank = floor(0.05 * 40) = 2
        let monthly: Vec<f64> = (0..40).map(|i| i as f64 - 20.0).collect();
        let (var, cvar) = tail_risk(&monthly);
        assert_eq!(var, Some(-18.0));
        // tail = {-20, -19, -18}
        assert!((cvar.unwrap() - (-19.0)).abs() < 1e-10);
    }

    #[test]
    fn degenerate_tail_falls_back_to_var() {
        // fewer than 20 observations: rank 0, tail = the single VaR element
        let monthly = vec![-5.0, 1.0, 2.0, 3.0];
        let (var, cvar) = tail_risk(&monthly);
        assert_eq!(var, Some(-5.0));
        assert_eq!(cvar, Some(-5.0));
    }

    #[test]
    fn single_month_series_null_distribution_block() {
        // 30 daily points inside one calendar month: no monthly returns
        let values: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let s = daily("2024-01-01", &values);
        let m = compute_detailed(&s).unwrap();
        assert!(m.var_95.is_none());
        assert!(m.cvar_95.is_none());
        assert!(m.skewness.is_none());
        assert!(m.kurtosis.is_none());
        assert_eq!(m.profit_factor, 0.0);
        assert_eq!(m.avg_monthly_gain, 0.0);
        assert_eq!(m.positive_months, 0);
    }

    // ── Moments ──

    #[test]
    fn symmetric_returns_near_zero_skew() {
        let monthly: Vec<f64> = (0..20)
            .map(|i| if i % 2 == 0 { 2.0 } else { -2.0 })
            .collect();
        assert!(skew(&monthly).abs() < 1e-10);
    }

    #[test]
    fn constant_returns_zero_moments() {
        let monthly = vec![1.5; 12];
        assert_eq!(skew(&monthly), 0.0);
        assert_eq!(excess_kurtosis(&monthly), 0.0);
    }

    #[test]
    fn two_point_distribution_excess_kurtosis_is_minus_two() {
        // a symmetric two-point distribution has kurtosis 1, excess -2
        let monthly: Vec<f64> = (0..20)
            .map(|i| if i % 2 == 0 { 2.0 } else { -2.0 })
            .collect();
        assert!((excess_kurtosis(&monthly) - (-2.0)).abs() < 1e-10);
    }

    // ── Profit factor and monthly aggregates ──

    #[test]
    fn profit_factor_mixed_months() {
        let s = semimonthly(&[100.0, 110.0, 99.0, 108.9]);
        let m = compute_detailed(&s).unwrap();
        // monthly returns: +10%, -10%, +10%
        assert!((m.profit_factor - 2.0).abs() < 1e-10);
        assert_eq!(m.positive_months, 2);
        assert_eq!(m.negative_months, 1);
        assert!((m.avg_monthly_gain - 10.0).abs() < 1e-10);
        assert!((m.avg_monthly_loss - (-10.0)).abs() < 1e-10);
    }

    #[test]
    fn all_gaining_months_sentinel_profit_factor() {
        let s = semimonthly(&[100.0, 105.0, 110.25]);
        let m = compute_detailed(&s).unwrap();
        assert_eq!(m.profit_factor, PROFIT_FACTOR_SENTINEL);
        assert_eq!(m.avg_monthly_loss, 0.0);
    }

    #[test]
    fn flat_months_zero_profit_factor() {
        let s = semimonthly(&[100.0, 100.0, 100.0]);
        let m = compute_detailed(&s).unwrap();
        assert_eq!(m.profit_factor, 0.0);
        assert_eq!(m.positive_months, 0);
        assert_eq!(m.negative_months, 0);
    }

    #[test]
    fn sample_size_counts_daily_returns() {
        let values: Vec<f64> = (0..45).map(|i| 100.0 + i as f64).collect();
        let s = daily("2024-01-02", &values);
        let m = compute_detailed(&s).unwrap();
        assert_eq!(m.sample_size, 44);
    }

    #[test]
    fn all_fields_finite_on_realistic_series() {
        let values: Vec<f64> = (0..200)
            .map(|i| 100.0 * (1.0 + 0.001 * i as f64) * if i % 7 == 0 { 0.98 } else { 1.0 })
            .collect();
        let s = daily("2023-01-01", &values);
        let m = compute_detailed(&s).unwrap();
        for field in [
            m.annualized_return,
            m.max_drawdown,
            m.calmar,
            m.var_95,
            m.cvar_95,
            m.skewness,
            m.kurtosis,
        ]
        .into_iter()
        .flatten()
        {
            assert!(field.is_finite());
        }
        assert!(m.profit_factor.is_finite());
    }
}
