//! Rolling midpoints of a single series or a high/low pair

use super::{nan_vec, require_len, require_period, require_same_len};
use crate::error::Result;

pub const fn midpoint_lookback(period: usize) -> usize {
    period.saturating_sub(1)
}

/// `(max + min) / 2` over the trailing window
pub fn midpoint(data: &[f64], period: usize) -> Result<Vec<f64>> {
    require_period("timeperiod", period)?;
    let n = data.len();
    require_len(n, period)?;
    let mut out = nan_vec(n);
    for i in (period - 1)..n {
        let window = &data[i + 1 - period..=i];
        let (lo, hi) = window
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        out[i] = (hi + lo) / 2.0;
    }
    Ok(out)
}

pub const fn midprice_lookback(period: usize) -> usize {
    period.saturating_sub(1)
}

/// `(highest high + lowest low) / 2` over the trailing window
pub fn midprice(high: &[f64], low: &[f64], period: usize) -> Result<Vec<f64>> {
    require_period("timeperiod", period)?;
    require_same_len(high, low)?;
    let n = high.len();
    require_len(n, period)?;
    let mut out = nan_vec(n);
    for i in (period - 1)..n {
        let start = i + 1 - period;
        let hi = high[start..=i]
            .iter()
            .fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
        let lo = low[start..=i].iter().fold(f64::INFINITY, |acc, &v| acc.min(v));
        out[i] = (hi + lo) / 2.0;
    }
    Ok(out)
}
