//! Moving averages: SMA, EMA, WMA, DEMA, TEMA, TRIMA, KAMA, T3, MA and MAVP

use super::{nan_vec, require_len, require_period};
use crate::error::{Result, TaError};
use crate::indicators::hilbert;

/// Moving-average type codes shared by `ma` and `bbands`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaType {
    Sma,
    Ema,
    Wma,
    Dema,
    Tema,
    Trima,
    Kama,
    Mama,
    T3,
}

impl TryFrom<i64> for MaType {
    type Error = TaError;

    fn try_from(code: i64) -> Result<Self> {
        Ok(match code {
            0 => MaType::Sma,
            1 => MaType::Ema,
            2 => MaType::Wma,
            3 => MaType::Dema,
            4 => MaType::Tema,
            5 => MaType::Trima,
            6 => MaType::Kama,
            7 => MaType::Mama,
            8 => MaType::T3,
            other => {
                return Err(TaError::invalid_parameter(
                    "matype",
                    format!("unknown moving average type {}", other),
                ))
            }
        })
    }
}

impl std::fmt::Display for MaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MaType::Sma => "sma",
            MaType::Ema => "ema",
            MaType::Wma => "wma",
            MaType::Dema => "dema",
            MaType::Tema => "tema",
            MaType::Trima => "trima",
            MaType::Kama => "kama",
            MaType::Mama => "mama",
            MaType::T3 => "t3",
        };
        f.write_str(name)
    }
}

pub const fn sma_lookback(period: usize) -> usize {
    period.saturating_sub(1)
}

pub fn sma(data: &[f64], period: usize) -> Result<Vec<f64>> {
    require_period("timeperiod", period)?;
    sma_from(data, 0, period)
}

/// SMA over `data[start..]`; positions before `start + period - 1` are NaN
fn sma_from(data: &[f64], start: usize, period: usize) -> Result<Vec<f64>> {
    let n = data.len();
    require_len(n, start + period)?;
    let mut out = nan_vec(n);
    let p = period as f64;
    let first = start + period - 1;
    let mut sum: f64 = data[start..=first].iter().sum();
    out[first] = sum / p;
    for i in (first + 1)..n {
        sum += data[i] - data[i - period];
        out[i] = sum / p;
    }
    Ok(out)
}

pub const fn ema_lookback(period: usize) -> usize {
    period.saturating_sub(1)
}

/// EMA seeded with the SMA of the first `period` samples
pub fn ema(data: &[f64], period: usize) -> Result<Vec<f64>> {
    require_period("timeperiod", period)?;
    ema_from(data, 0, period)
}

fn ema_from(data: &[f64], start: usize, period: usize) -> Result<Vec<f64>> {
    let n = data.len();
    require_len(n, start + period)?;
    let mut out = nan_vec(n);
    let alpha = 2.0 / (period as f64 + 1.0);
    let first = start + period - 1;
    let mut prev = data[start..=first].iter().sum::<f64>() / period as f64;
    out[first] = prev;
    for i in (first + 1)..n {
        prev = (data[i] - prev) * alpha + prev;
        out[i] = prev;
    }
    Ok(out)
}

pub const fn wma_lookback(period: usize) -> usize {
    period.saturating_sub(1)
}

/// Linearly weighted average, newest sample weighted `period`
pub fn wma(data: &[f64], period: usize) -> Result<Vec<f64>> {
    require_period("timeperiod", period)?;
    let n = data.len();
    require_len(n, period)?;
    let mut out = nan_vec(n);
    let divisor = (period * (period + 1) / 2) as f64;
    for i in (period - 1)..n {
        let window = &data[i + 1 - period..=i];
        let weighted: f64 = window
            .iter()
            .enumerate()
            .map(|(j, v)| (j + 1) as f64 * v)
            .sum();
        out[i] = weighted / divisor;
    }
    Ok(out)
}

pub const fn dema_lookback(period: usize) -> usize {
    period.saturating_sub(1).saturating_mul(2)
}

pub fn dema(data: &[f64], period: usize) -> Result<Vec<f64>> {
    require_period("timeperiod", period)?;
    require_len(data.len(), dema_lookback(period) + 1)?;
    let ema1 = ema_from(data, 0, period)?;
    let ema2 = ema_from(&ema1, period - 1, period)?;
    let lookback = dema_lookback(period);
    let mut out = nan_vec(data.len());
    for i in lookback..data.len() {
        out[i] = 2.0 * ema1[i] - ema2[i];
    }
    Ok(out)
}

pub const fn tema_lookback(period: usize) -> usize {
    period.saturating_sub(1).saturating_mul(3)
}

pub fn tema(data: &[f64], period: usize) -> Result<Vec<f64>> {
    require_period("timeperiod", period)?;
    require_len(data.len(), tema_lookback(period) + 1)?;
    let step = period - 1;
    let ema1 = ema_from(data, 0, period)?;
    let ema2 = ema_from(&ema1, step, period)?;
    let ema3 = ema_from(&ema2, 2 * step, period)?;
    let lookback = tema_lookback(period);
    let mut out = nan_vec(data.len());
    for i in lookback..data.len() {
        out[i] = 3.0 * ema1[i] - 3.0 * ema2[i] + ema3[i];
    }
    Ok(out)
}

pub const fn trima_lookback(period: usize) -> usize {
    period.saturating_sub(1)
}

/// Triangular MA: an SMA of an SMA, split so the total window is `period`
pub fn trima(data: &[f64], period: usize) -> Result<Vec<f64>> {
    require_period("timeperiod", period)?;
    require_len(data.len(), period)?;
    let (first, second) = if period % 2 == 1 {
        let half = (period + 1) / 2;
        (half, half)
    } else {
        (period / 2, period / 2 + 1)
    };
    let inner = sma_from(data, 0, first)?;
    sma_from(&inner, first - 1, second)
}

pub const fn kama_lookback(period: usize) -> usize {
    period
}

/// Kaufman adaptive MA with the classic 2/30 fast/slow constants
pub fn kama(data: &[f64], period: usize) -> Result<Vec<f64>> {
    require_period("timeperiod", period)?;
    let n = data.len();
    require_len(n, kama_lookback(period) + 1)?;

    let fast_sc = 2.0 / 3.0;
    let slow_sc = 2.0 / 31.0;
    let mut out = nan_vec(n);
    let mut prev = data[period - 1];

    for i in period..n {
        let change = (data[i] - data[i - period]).abs();
        let volatility: f64 = ((i + 1 - period)..=i)
            .map(|j| (data[j] - data[j - 1]).abs())
            .sum();
        let er = if volatility > 0.0 {
            change / volatility
        } else {
            0.0
        };
        let sc = (er * (fast_sc - slow_sc) + slow_sc).powi(2);
        prev += sc * (data[i] - prev);
        out[i] = prev;
    }
    Ok(out)
}

pub const fn t3_lookback(period: usize) -> usize {
    period.saturating_sub(1).saturating_mul(6)
}

/// Tillson T3: six chained EMAs blended by the volume factor
pub fn t3(data: &[f64], period: usize, vfactor: f64) -> Result<Vec<f64>> {
    require_period("timeperiod", period)?;
    let n = data.len();
    let lookback = t3_lookback(period);
    require_len(n, lookback + 1)?;

    let step = period - 1;
    let e1 = ema_from(data, 0, period)?;
    let e2 = ema_from(&e1, step, period)?;
    let e3 = ema_from(&e2, 2 * step, period)?;
    let e4 = ema_from(&e3, 3 * step, period)?;
    let e5 = ema_from(&e4, 4 * step, period)?;
    let e6 = ema_from(&e5, 5 * step, period)?;

    let v = vfactor;
    let (v2, v3) = (v * v, v * v * v);
    let c1 = -v3;
    let c2 = 3.0 * v2 + 3.0 * v3;
    let c3 = -6.0 * v2 - 3.0 * v - 3.0 * v3;
    let c4 = 1.0 + 3.0 * v + v3 + 3.0 * v2;

    let mut out = nan_vec(n);
    for i in lookback..n {
        out[i] = c1 * e6[i] + c2 * e5[i] + c3 * e4[i] + c4 * e3[i];
    }
    Ok(out)
}

pub fn ma_lookback(period: usize, matype: MaType) -> usize {
    match matype {
        MaType::Sma => sma_lookback(period),
        MaType::Ema => ema_lookback(period),
        MaType::Wma => wma_lookback(period),
        MaType::Dema => dema_lookback(period),
        MaType::Tema => tema_lookback(period),
        MaType::Trima => trima_lookback(period),
        MaType::Kama => kama_lookback(period),
        MaType::Mama => hilbert::mama_lookback(),
        MaType::T3 => t3_lookback(period),
    }
}

/// Moving average selected by type code. MAMA ignores `period`.
pub fn ma(data: &[f64], period: usize, matype: MaType) -> Result<Vec<f64>> {
    match matype {
        MaType::Sma => sma(data, period),
        MaType::Ema => ema(data, period),
        MaType::Wma => wma(data, period),
        MaType::Dema => dema(data, period),
        MaType::Tema => tema(data, period),
        MaType::Trima => trima(data, period),
        MaType::Kama => kama(data, period),
        MaType::Mama => hilbert::mama(data, 0.5, 0.05).map(|m| m.mama),
        MaType::T3 => t3(data, period, 0.7),
    }
}

pub const fn mavp_lookback(max_period: usize) -> usize {
    max_period.saturating_sub(1)
}

/// SMA whose window is `periods` rounded and clamped into `[min_period, max_period]`
pub fn mavp(data: &[f64], periods: f64, min_period: usize, max_period: usize) -> Result<Vec<f64>> {
    require_period("minperiod", min_period)?;
    require_period("maxperiod", max_period)?;
    if min_period > max_period {
        return Err(TaError::invalid_parameter(
            "minperiod",
            format!(
                "minperiod ({}) must not exceed maxperiod ({})",
                min_period, max_period
            ),
        ));
    }
    if !periods.is_finite() {
        return Err(TaError::invalid_parameter("periods", "must be finite"));
    }

    let n = data.len();
    require_len(n, max_period)?;
    let period = (periods.round().max(0.0) as usize).clamp(min_period, max_period);

    let mut out = nan_vec(n);
    for i in mavp_lookback(max_period)..n {
        let window = &data[i + 1 - period..=i];
        out[i] = window.iter().sum::<f64>() / period as f64;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_util::{assert_close, leading_nans};
    use crate::indicators::MAX_PERIOD;

    const NAN: f64 = f64::NAN;

    #[test]
    fn test_sma_basic() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
        assert_close(&out, &[NAN, NAN, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_sma_insufficient_data() {
        let err = sma(&[1.0, 2.0, 3.0], 10).unwrap_err();
        assert!(matches!(
            err,
            TaError::InsufficientData {
                required: 10,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_sma_zero_period() {
        assert!(matches!(
            sma(&[1.0, 2.0], 0),
            Err(TaError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_ema_seeded_with_sma() {
        let out = ema(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
        assert_close(&out, &[NAN, NAN, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_wma_weights() {
        let out = wma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
        assert_close(&out, &[NAN, NAN, 14.0 / 6.0, 20.0 / 6.0, 26.0 / 6.0]);
    }

    #[test]
    fn test_dema_on_linear_series() {
        let out = dema(&[1.0, 2.0, 3.0, 4.0, 5.0], 2).unwrap();
        assert_close(&out, &[NAN, NAN, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_tema_lookback() {
        let data: Vec<f64> = (1..=20).map(f64::from).collect();
        let out = tema(&data, 4).unwrap();
        assert_eq!(leading_nans(&out), tema_lookback(4));
    }

    #[test]
    fn test_lookbacks_saturate_on_huge_periods() {
        assert_eq!(dema_lookback(usize::MAX), usize::MAX);
        assert_eq!(tema_lookback(usize::MAX / 2), usize::MAX);
        assert_eq!(t3_lookback(7_000_000_000_000_000_000), usize::MAX);
        assert_eq!(ma_lookback(usize::MAX, MaType::Tema), usize::MAX);
    }

    #[test]
    fn test_period_above_cap_is_rejected() {
        let data = [1.0, 2.0, 3.0];
        for result in [
            sma(&data, MAX_PERIOD + 1),
            tema(&data, 7_000_000_000_000_000_000),
            t3(&data, 7_000_000_000_000_000_000, 0.7),
            ma(&data, usize::MAX, MaType::Dema),
        ] {
            assert!(matches!(result, Err(TaError::InvalidParameter { .. })));
        }
    }

    #[test]
    fn test_trima_odd_and_even() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_close(&trima(&data, 3).unwrap(), &[NAN, NAN, 2.0, 3.0, 4.0]);

        let even = trima(&data, 4).unwrap();
        assert_eq!(leading_nans(&even), 3);
        // (1*1 + 2*2 + 3*2 + 4*1) / 6
        assert!((even[3] - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_kama_constant_series_stays_flat() {
        let data = [5.0; 12];
        let out = kama(&data, 4).unwrap();
        assert_eq!(leading_nans(&out), 4);
        assert!(out[4..].iter().all(|v| (v - 5.0).abs() < 1e-12));
    }

    #[test]
    fn test_t3_period_one_is_identity() {
        let data = [3.0, 1.0, 4.0, 1.0, 5.0];
        let out = t3(&data, 1, 0.7).unwrap();
        assert_close(&out, &data);
    }

    #[test]
    fn test_t3_lookback() {
        let data: Vec<f64> = (0..40).map(|i| (i as f64).sin() + 10.0).collect();
        let out = t3(&data, 5, 0.7).unwrap();
        assert_eq!(leading_nans(&out), 24);
        assert!(t3(&data[..24], 5, 0.7).is_err());
    }

    #[test]
    fn test_ma_dispatches_by_type() {
        let data: Vec<f64> = (1..=10).map(f64::from).collect();
        assert_close(&ma(&data, 3, MaType::Sma).unwrap(), &sma(&data, 3).unwrap());
        assert_close(&ma(&data, 3, MaType::Wma).unwrap(), &wma(&data, 3).unwrap());
        assert!(MaType::try_from(9).is_err());
    }

    #[test]
    fn test_mavp_clamps_period() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        let out = mavp(&data, 10.0, 2, 3).unwrap();
        assert_close(&out, &[NAN, NAN, 2.0, 3.0, 4.0]);

        let out = mavp(&data, 1.0, 2, 3).unwrap();
        assert_close(&out, &[NAN, NAN, 2.5, 3.5, 4.5]);
    }

    #[test]
    fn test_mavp_rejects_inverted_bounds() {
        assert!(matches!(
            mavp(&[1.0; 10], 3.0, 5, 2),
            Err(TaError::InvalidParameter { .. })
        ));
    }
}
