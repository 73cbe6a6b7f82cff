//! Ehlers Hilbert-transform cycle measurement, MAMA/FAMA and the
//! instantaneous trendline.
//!
//! Both indicators share one pass that smooths the price, runs the
//! Hilbert discriminator and tracks the dominant cycle period and phase.

use super::{nan_vec, require_len};
use crate::error::{Result, TaError};

const A: f64 = 0.0962;
const B: f64 = 0.5769;

/// Bars the discriminator needs before its first estimate
const WARMUP: usize = 6;

pub const fn mama_lookback() -> usize {
    32
}

pub const fn ht_trendline_lookback() -> usize {
    63
}

/// Adaptive moving average pair
#[derive(Debug, Clone, PartialEq)]
pub struct Mama {
    pub mama: Vec<f64>,
    pub fama: Vec<f64>,
}

/// Per-bar output of the cycle discriminator
struct CycleState {
    smooth_period: Vec<f64>,
    /// Phase of the in-phase/quadrature pair, degrees
    phase: Vec<f64>,
}

#[inline]
fn hilbert(series: &[f64], i: usize) -> f64 {
    A * series[i] + B * series[i - 2] - B * series[i - 4] - A * series[i - 6]
}

#[inline]
fn atan_deg(x: f64) -> f64 {
    x.atan().to_degrees()
}

fn measure_cycle(data: &[f64]) -> CycleState {
    let n = data.len();
    let mut smooth = vec![0.0; n];
    let mut detrender = vec![0.0; n];
    let mut i1 = vec![0.0; n];
    let mut q1 = vec![0.0; n];
    let mut phase = vec![0.0; n];
    let mut smooth_period = vec![WARMUP as f64; n];

    let (mut i2_prev, mut q2_prev) = (0.0, 0.0);
    let (mut re_prev, mut im_prev) = (0.0, 0.0);
    let mut period_prev = WARMUP as f64;

    for i in 0..n {
        smooth[i] = if i >= 3 {
            (4.0 * data[i] + 3.0 * data[i - 1] + 2.0 * data[i - 2] + data[i - 3]) / 10.0
        } else {
            data[i]
        };
        if i < WARMUP {
            continue;
        }

        let adj = 0.075 * period_prev + 0.54;
        detrender[i] = hilbert(&smooth, i) * adj;
        q1[i] = hilbert(&detrender, i) * adj;
        i1[i] = detrender[i - 3];

        let ji = hilbert(&i1, i) * adj;
        let jq = hilbert(&q1, i) * adj;

        let i2 = 0.2 * (i1[i] - jq) + 0.8 * i2_prev;
        let q2 = 0.2 * (q1[i] + ji) + 0.8 * q2_prev;

        let re = 0.2 * (i2 * i2_prev + q2 * q2_prev) + 0.8 * re_prev;
        let im = 0.2 * (i2 * q2_prev - q2 * i2_prev) + 0.8 * im_prev;
        i2_prev = i2;
        q2_prev = q2;
        re_prev = re;
        im_prev = im;

        let mut period = if im != 0.0 && re != 0.0 {
            360.0 / atan_deg(im / re)
        } else {
            period_prev
        };
        period = period.min(1.5 * period_prev).max(0.67 * period_prev);
        period = period.clamp(6.0, 50.0);
        period = 0.2 * period + 0.8 * period_prev;
        period_prev = period;

        smooth_period[i] = 0.33 * period + 0.67 * smooth_period[i - 1];
        phase[i] = if i1[i] != 0.0 {
            atan_deg(q1[i] / i1[i])
        } else {
            phase[i - 1]
        };
    }

    CycleState {
        smooth_period,
        phase,
    }
}

/// MESA adaptive moving average.
///
/// `fast_limit` and `slow_limit` bound the adaptive smoothing factor.
pub fn mama(data: &[f64], fast_limit: f64, slow_limit: f64) -> Result<Mama> {
    if !(fast_limit > 0.0 && fast_limit <= 1.0) {
        return Err(TaError::invalid_parameter(
            "fastlimit",
            "must be in (0, 1]",
        ));
    }
    if !(slow_limit > 0.0 && slow_limit <= 1.0) {
        return Err(TaError::invalid_parameter(
            "slowlimit",
            "must be in (0, 1]",
        ));
    }
    if slow_limit > fast_limit {
        return Err(TaError::invalid_parameter(
            "slowlimit",
            "must not exceed fastlimit",
        ));
    }

    let n = data.len();
    let lookback = mama_lookback();
    require_len(n, lookback + 1)?;

    let cycle = measure_cycle(data);
    let mut out = Mama {
        mama: nan_vec(n),
        fama: nan_vec(n),
    };
    let mut mama = data[0];
    let mut fama = data[0];

    for i in 0..n {
        if i < WARMUP {
            mama = data[i];
            fama = data[i];
            continue;
        }
        let delta_phase = (cycle.phase[i - 1] - cycle.phase[i]).max(1.0);
        let alpha = (fast_limit / delta_phase).max(slow_limit).min(fast_limit);

        mama = alpha * data[i] + (1.0 - alpha) * mama;
        fama = 0.5 * alpha * mama + (1.0 - 0.5 * alpha) * fama;

        if i >= lookback {
            out.mama[i] = mama;
            out.fama[i] = fama;
        }
    }
    Ok(out)
}

/// Hilbert-transform instantaneous trendline
pub fn ht_trendline(data: &[f64]) -> Result<Vec<f64>> {
    let n = data.len();
    let lookback = ht_trendline_lookback();
    require_len(n, lookback + 1)?;

    let cycle = measure_cycle(data);
    let mut itrend = vec![0.0; n];
    let mut out = nan_vec(n);

    for i in 0..n {
        let dc_period = ((cycle.smooth_period[i] + 0.5) as usize).max(1);
        let start = (i + 1).saturating_sub(dc_period);
        let window = &data[start..=i];
        itrend[i] = window.iter().sum::<f64>() / window.len() as f64;

        if i >= lookback {
            out[i] = (4.0 * itrend[i]
                + 3.0 * itrend[i - 1]
                + 2.0 * itrend[i - 2]
                + itrend[i - 3])
                / 10.0;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_util::leading_nans;

    fn wave(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + 5.0 * (i as f64 * std::f64::consts::PI / 10.0).sin())
            .collect()
    }

    #[test]
    fn test_mama_lookback_and_finiteness() {
        let data = wave(100);
        let out = mama(&data, 0.5, 0.05).unwrap();
        assert_eq!(leading_nans(&out.mama), 32);
        assert_eq!(leading_nans(&out.fama), 32);
        assert!(out.mama[32..].iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_mama_constant_series() {
        let data = vec![42.0; 50];
        let out = mama(&data, 0.5, 0.05).unwrap();
        assert!(out.mama[32..].iter().all(|v| (v - 42.0).abs() < 1e-9));
        assert!(out.fama[32..].iter().all(|v| (v - 42.0).abs() < 1e-9));
    }

    #[test]
    fn test_mama_rejects_inverted_limits() {
        let data = wave(50);
        assert!(matches!(
            mama(&data, 0.05, 0.5),
            Err(TaError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_mama_insufficient_data() {
        assert!(matches!(
            mama(&wave(32), 0.5, 0.05),
            Err(TaError::InsufficientData {
                required: 33,
                actual: 32
            })
        ));
    }

    #[test]
    fn test_ht_trendline_tracks_level() {
        let data = wave(200);
        let out = ht_trendline(&data).unwrap();
        assert_eq!(leading_nans(&out), 63);
        for v in &out[63..] {
            assert!((95.0..=105.0).contains(v), "trendline escaped range: {}", v);
        }
    }

    #[test]
    fn test_ht_trendline_insufficient_data() {
        assert!(ht_trendline(&wave(63)).is_err());
        assert!(ht_trendline(&wave(64)).is_ok());
    }
}
