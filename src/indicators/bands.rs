//! Bollinger Bands

use super::moving_average::{ma, ma_lookback, MaType};
use super::{nan_vec, require_len, require_period};
use crate::error::{Result, TaError};

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

pub fn bbands_lookback(period: usize, matype: MaType) -> usize {
    ma_lookback(period, matype).max(period.saturating_sub(1))
}

/// Middle band is the selected moving average; the envelope uses the
/// population standard deviation of the trailing `period` samples.
pub fn bbands(
    data: &[f64],
    period: usize,
    nbdev_up: f64,
    nbdev_dn: f64,
    matype: MaType,
) -> Result<BollingerBands> {
    require_period("timeperiod", period)?;
    if !nbdev_up.is_finite() {
        return Err(TaError::invalid_parameter("nbdevup", "must be finite"));
    }
    if !nbdev_dn.is_finite() {
        return Err(TaError::invalid_parameter("nbdevdn", "must be finite"));
    }

    let n = data.len();
    let lookback = bbands_lookback(period, matype);
    require_len(n, lookback + 1)?;

    let average = ma(data, period, matype)?;
    let mut bands = BollingerBands {
        upper: nan_vec(n),
        middle: nan_vec(n),
        lower: nan_vec(n),
    };

    let p = period as f64;
    for i in lookback..n {
        let window = &data[i + 1 - period..=i];
        let mean = window.iter().sum::<f64>() / p;
        let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / p;
        let sd = variance.sqrt();
        let mid = average[i];
        bands.middle[i] = mid;
        bands.upper[i] = mid + nbdev_up * sd;
        bands.lower[i] = mid - nbdev_dn * sd;
    }
    Ok(bands)
}
