//! Relative Strength Index with Wilder smoothing

use super::{nan_vec, require_len, require_period};
use crate::error::Result;

pub const fn rsi_lookback(period: usize) -> usize {
    period
}

#[inline]
fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    let total = avg_gain + avg_loss;
    if total == 0.0 {
        0.0
    } else {
        100.0 * avg_gain / total
    }
}

/// RSI over `period` price changes; the first value lands at index `period`.
pub fn rsi(data: &[f64], period: usize) -> Result<Vec<f64>> {
    require_period("timeperiod", period)?;
    let n = data.len();
    require_len(n, rsi_lookback(period) + 1)?;

    let p = period as f64;
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let change = data[i] - data[i - 1];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss -= change;
        }
    }
    avg_gain /= p;
    avg_loss /= p;

    let mut out = nan_vec(n);
    out[period] = rsi_value(avg_gain, avg_loss);

    for i in (period + 1)..n {
        let change = data[i] - data[i - 1];
        let (gain, loss) = if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, -change)
        };
        avg_gain = (avg_gain * (p - 1.0) + gain) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss) / p;
        out[i] = rsi_value(avg_gain, avg_loss);
    }
    Ok(out)
}
