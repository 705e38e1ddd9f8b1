//! Indicator calculation
//!
//! Pure functions from a per-symbol price series to momentum metrics for
//! its latest date. Input may be unordered and may contain duplicate
//! dates; a stable sort runs first and the last writer wins on duplicates.

use crate::analytics::types::{IndicatorSet, PriceBar};
use crate::error::{AppError, Result};

/// Trading days in a year, used to annualize daily volatility.
const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Return lookback windows in trading days
#[derive(Debug, Clone, Copy)]
pub struct LookbackWindows {
    pub r1m: usize,
    pub r3m: usize,
    pub r6m: usize,
    pub r12m: usize,
}

/// Volatility windows in trading days
#[derive(Debug, Clone, Copy)]
pub struct VolWindows {
    pub short: usize,
    pub long: usize,
}

/// Computes momentum indicators from price series
pub struct IndicatorCalculator {
    lookbacks: LookbackWindows,
    vol_windows: VolWindows,
}

impl IndicatorCalculator {
    pub fn new(lookbacks: LookbackWindows, vol_windows: VolWindows) -> Self {
        Self {
            lookbacks,
            vol_windows,
        }
    }

    /// Compute the full indicator set for a symbol's series. The reference
    /// date is the latest date in the series. Score and rank are left at
    /// zero for the scorer.
    pub fn compute(&self, symbol: &str, bars: &[PriceBar]) -> Result<IndicatorSet> {
        if bars.is_empty() {
            return Err(AppError::InsufficientHistory { need: 1, have: 0 });
        }

        let sorted = sort_bars(bars);
        let latest = sorted[sorted.len() - 1];

        let r_1m = total_return(&sorted, self.lookbacks.r1m)?;
        let r_3m = total_return(&sorted, self.lookbacks.r3m)?;
        let r_6m = total_return(&sorted, self.lookbacks.r6m)?;
        let r_12m = total_return(&sorted, self.lookbacks.r12m)?;

        let vol_3m = volatility(&sorted, self.vol_windows.short)?;
        let vol_6m = volatility(&sorted, self.vol_windows.long)?;

        let adv = average_dollar_volume(&sorted, self.vol_windows.short)?;

        Ok(IndicatorSet {
            symbol: symbol.to_string(),
            date: latest.date,
            r_1m,
            r_3m,
            r_6m,
            r_12m,
            vol_3m,
            vol_6m,
            adv,
            score: 0.0,
            rank: 0,
        })
    }
}

/// Stable sort by date ascending; on duplicate dates the bar appearing
/// later in the input wins.
pub fn sort_bars(bars: &[PriceBar]) -> Vec<PriceBar> {
    let mut sorted = bars.to_vec();
    sorted.sort_by_key(|bar| bar.date);

    let mut deduped: Vec<PriceBar> = Vec::with_capacity(sorted.len());
    for bar in sorted {
        match deduped.last_mut() {
            Some(last) if last.date == bar.date => *last = bar,
            _ => deduped.push(bar),
        }
    }
    deduped
}

/// Total return over `lookback` rows: `p[T] / p[T-lookback] - 1`.
pub fn total_return(sorted: &[PriceBar], lookback: usize) -> Result<f64> {
    if sorted.len() < lookback + 1 {
        return Err(AppError::InsufficientHistory {
            need: lookback + 1,
            have: sorted.len(),
        });
    }

    let current = sorted[sorted.len() - 1].adj_close;
    let past = sorted[sorted.len() - 1 - lookback].adj_close;
    if past == 0.0 {
        return Err(AppError::InsufficientHistory {
            need: lookback + 1,
            have: sorted.len(),
        });
    }

    Ok(current / past - 1.0)
}

/// Annualized volatility of daily log returns over the trailing `window`.
/// Uses the population standard deviation and multiplies by sqrt(252).
pub fn volatility(sorted: &[PriceBar], window: usize) -> Result<f64> {
    if sorted.len() < window + 1 {
        return Err(AppError::InsufficientHistory {
            need: window + 1,
            have: sorted.len(),
        });
    }

    let start = sorted.len() - window - 1;
    let mut log_returns = Vec::with_capacity(window);
    for i in start + 1..sorted.len() {
        let prev = sorted[i - 1].adj_close;
        let cur = sorted[i].adj_close;
        if prev == 0.0 || cur == 0.0 {
            return Err(AppError::ZeroPrice);
        }
        log_returns.push((cur / prev).ln());
    }

    let mean = log_returns.iter().sum::<f64>() / log_returns.len() as f64;
    let variance = log_returns
        .iter()
        .map(|r| (r - mean) * (r - mean))
        .sum::<f64>()
        / log_returns.len() as f64;

    Ok(variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt())
}

/// Arithmetic mean of close × volume over the trailing `window` rows.
pub fn average_dollar_volume(sorted: &[PriceBar], window: usize) -> Result<f64> {
    if sorted.len() < window {
        return Err(AppError::InsufficientHistory {
            need: window,
            have: sorted.len(),
        });
    }

    let start = sorted.len() - window;
    let sum: f64 = sorted[start..]
        .iter()
        .map(|bar| bar.close * bar.volume)
        .sum();
    Ok(sum / window as f64)
}

/// True iff at least `min_positive` of the returns are strictly positive.
/// Empty input never passes.
pub fn breadth_ok(returns: &[f64], min_positive: usize) -> bool {
    if returns.is_empty() {
        return false;
    }
    returns.iter().filter(|r| **r > 0.0).count() >= min_positive
}
