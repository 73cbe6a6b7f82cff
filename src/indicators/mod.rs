//! Numerical kernels for technical-analysis indicators.
//!
//! Every kernel takes plain `f64` slices and returns a vector of the same
//! length as its input. The first `lookback` positions hold NaN; callers
//! that publish trimmed output slice them off. Kernels are pure: no shared
//! state, no mutation of their inputs.
//!
//! Failures are reported through [`TaError`]:
//!
//! - [`TaError::InsufficientData`] when the series is shorter than the
//!   window the kernel needs
//! - [`TaError::InvalidParameter`] for periods or limits that cannot work

pub mod bands;
pub mod hilbert;
pub mod momentum;
pub mod moving_average;
pub mod range;
pub mod sar;

pub use bands::{bbands, bbands_lookback, BollingerBands};
pub use hilbert::{ht_trendline, ht_trendline_lookback, mama, mama_lookback, Mama};
pub use momentum::{rsi, rsi_lookback};
pub use moving_average::{
    dema, dema_lookback, ema, ema_lookback, kama, kama_lookback, ma, ma_lookback, mavp,
    mavp_lookback, sma, sma_lookback, t3, t3_lookback, tema, tema_lookback, trima,
    trima_lookback, wma, wma_lookback, MaType,
};
pub use range::{midpoint, midpoint_lookback, midprice, midprice_lookback};
pub use sar::{sar, sar_lookback, sarext, sarext_lookback, SarExtParams};

use crate::error::{Result, TaError};

pub(crate) fn require_len(actual: usize, required: usize) -> Result<()> {
    if actual < required {
        return Err(TaError::InsufficientData { required, actual });
    }
    Ok(())
}

/// Largest window any kernel accepts
pub const MAX_PERIOD: usize = 100_000;

pub(crate) fn require_period(name: &str, period: usize) -> Result<()> {
    if period == 0 {
        return Err(TaError::invalid_parameter(name, "period must be at least 1"));
    }
    if period > MAX_PERIOD {
        return Err(TaError::invalid_parameter(
            name,
            format!("period must not exceed {}", MAX_PERIOD),
        ));
    }
    Ok(())
}

pub(crate) fn require_same_len(high: &[f64], low: &[f64]) -> Result<()> {
    if high.len() != low.len() {
        return Err(TaError::InvalidInput(format!(
            "high has {} elements, low has {}",
            high.len(),
            low.len()
        )));
    }
    Ok(())
}

pub(crate) fn nan_vec(n: usize) -> Vec<f64> {
    vec![f64::NAN; n]
}

#[cfg(test)]
pub(crate) mod test_util {
    pub fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "length mismatch");
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            if e.is_nan() {
                assert!(a.is_nan(), "index {}: expected NaN, got {}", i, a);
            } else {
                assert!((a - e).abs() < 1e-9, "index {}: expected {}, got {}", i, e, a);
            }
        }
    }

    pub fn leading_nans(values: &[f64]) -> usize {
        values.iter().take_while(|v| v.is_nan()).count()
    }
}
