//! Per-path statistics and small cross-path aggregates.

use crate::types::{years_to_days, PRICE_FLOOR, TRADING_DAYS_PER_YEAR};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathStatistics {
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    /// Peak-to-trough decline as a fraction, in [0, 1).
    pub max_drawdown: f64,
    /// Largest single-day percentage fall, as a positive fraction.
    pub max_daily_drop: f64,
    pub lost_year_count: usize,
    pub lost_five_year_count: usize,
    pub lost_decade_count: usize,
}

impl PathStatistics {
    pub fn from_path(prices: &[f64]) -> Self {
        Self {
            annualized_return: annualized_return(prices),
            annualized_volatility: annualized_volatility(prices),
            max_drawdown: max_drawdown(prices),
            max_daily_drop: max_daily_drop(prices),
            lost_year_count: count_lost_periods(prices, 1.0),
            lost_five_year_count: count_lost_periods(prices, 5.0),
            lost_decade_count: count_lost_periods(prices, 10.0),
        }
    }
}

/// Length of a path in years: (points − 1) / 252.
pub fn path_years(prices: &[f64]) -> f64 {
    prices.len().saturating_sub(1) as f64 / TRADING_DAYS_PER_YEAR as f64
}

/// `(P_end / P_start)^(1 / years) − 1`. Zero for paths shorter than two points.
pub fn annualized_return(prices: &[f64]) -> f64 {
    let years = path_years(prices);
    match (prices.first(), prices.last()) {
        (Some(&start), Some(&end)) if years > 0.0 => (end / start).powf(1.0 / years) - 1.0,
        _ => 0.0,
    }
}

/// `1 − min(P_t / max_{s<=t} P_s)`.
pub fn max_drawdown(prices: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst_ratio: f64 = 1.0;
    for &price in prices {
        peak = peak.max(price);
        if peak > 0.0 {
            worst_ratio = worst_ratio.min(price / peak);
        }
    }
    1.0 - worst_ratio
}

/// Population standard deviation of daily log returns, times √252.
pub fn annualized_volatility(prices: &[f64]) -> f64 {
    let returns: Vec<f64> = prices
        .windows(2)
        .map(|w| (w[1].max(PRICE_FLOOR) / w[0].max(PRICE_FLOOR)).ln())
        .collect();
    if returns.is_empty() {
        return 0.0;
    }
    let m = mean(&returns);
    let variance = returns.iter().map(|r| (r - m).powi(2)).sum::<f64>() / returns.len() as f64;
    variance.sqrt() * (TRADING_DAYS_PER_YEAR as f64).sqrt()
}

/// Magnitude of the worst single-day percentage change (0 if the path never falls).
pub fn max_daily_drop(prices: &[f64]) -> f64 {
    prices
        .windows(2)
        .map(|w| (w[1] - w[0]) / w[0])
        .fold(0.0_f64, f64::min)
        .abs()
}

/// Count non-overlapping "lost periods" of `period_years`.
///
/// Scanning from day 0: if the price on day i is below the running peak
/// and stays below that peak for the next `period_days` days, count one
/// and jump past the span; otherwise step forward one day. One long
/// drought counts once per full period it spans, never once per day.
pub fn count_lost_periods(prices: &[f64], period_years: f64) -> usize {
    let period = years_to_days(period_years).max(1);
    let n = prices.len();
    if n < period {
        return 0;
    }

    // next_touch[i]: first j >= i whose price reaches the running peak as
    // of i. Within a drawdown the peak is constant, so this is simply the
    // next day that sits at a running high.
    let mut next_touch = vec![n; n + 1];
    let mut running_peak = f64::MIN;
    let mut at_high = vec![false; n];
    for (i, &price) in prices.iter().enumerate() {
        running_peak = running_peak.max(price);
        at_high[i] = price >= running_peak;
    }
    for i in (0..n).rev() {
        next_touch[i] = if at_high[i] { i } else { next_touch[i + 1] };
    }

    let mut count = 0;
    let mut i = 0;
    while i + period <= n {
        if next_touch[i] >= i + period {
            count += 1;
            i += period;
        } else {
            i += 1;
        }
    }
    count
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Percentile with linear interpolation between closest ranks
/// (rank = pct/100 · (n − 1)). `pct` is in [0, 100]. NaN for empty input.
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// Normalised dispersion of final prices: (P95 − P5) / mean.
pub fn spread(final_prices: &[f64]) -> f64 {
    (percentile(final_prices, 95.0) - percentile(final_prices, 5.0)) / mean(final_prices)
}
