//! Parabolic SAR and its extended variant.
//!
//! Both run the same stop-and-reverse engine. The extended form takes
//! independent acceleration settings for long and short trends, an
//! optional starting value and an offset applied on reversal, and
//! reports short-trend values as negative numbers.

use super::{nan_vec, require_len, require_same_len};
use crate::error::{Result, TaError};

pub const fn sar_lookback() -> usize {
    1
}

pub const fn sarext_lookback() -> usize {
    1
}

#[derive(Debug, Clone, Copy)]
struct Acceleration {
    init: f64,
    step: f64,
    max: f64,
}

impl Acceleration {
    fn validate(self, names: [&str; 3]) -> Result<Self> {
        for (value, name) in [self.init, self.step, self.max].into_iter().zip(names) {
            if !value.is_finite() || value < 0.0 {
                return Err(TaError::invalid_parameter(
                    name,
                    "must be a non-negative number",
                ));
            }
        }
        Ok(Self {
            init: self.init.min(self.max),
            step: self.step.min(self.max),
            max: self.max,
        })
    }
}

/// Settings for [`sarext`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SarExtParams {
    /// Positive starts long at that level, negative starts short at its
    /// magnitude, zero picks the direction from the first two bars
    pub start_value: f64,
    pub offset_on_reverse: f64,
    pub accel_init_long: f64,
    pub accel_long: f64,
    pub accel_max_long: f64,
    pub accel_init_short: f64,
    pub accel_short: f64,
    pub accel_max_short: f64,
}

impl Default for SarExtParams {
    fn default() -> Self {
        Self {
            start_value: 0.0,
            offset_on_reverse: 0.0,
            accel_init_long: 0.02,
            accel_long: 0.02,
            accel_max_long: 0.2,
            accel_init_short: 0.02,
            accel_short: 0.02,
            accel_max_short: 0.2,
        }
    }
}

struct Engine {
    long: Acceleration,
    short: Acceleration,
    start_value: f64,
    offset_on_reverse: f64,
    signed: bool,
}

impl Engine {
    fn run(&self, high: &[f64], low: &[f64]) -> Result<Vec<f64>> {
        require_same_len(high, low)?;
        let n = high.len();
        require_len(n, sar_lookback() + 1)?;

        let mut is_long = if self.start_value > 0.0 {
            true
        } else if self.start_value < 0.0 {
            false
        } else {
            !opens_short(high, low)
        };

        let (mut sar, mut ep) = match (is_long, self.start_value) {
            (true, sv) if sv > 0.0 => (sv, high[1]),
            (false, sv) if sv < 0.0 => (-sv, low[1]),
            (true, _) => (low[0], high[1]),
            (false, _) => (high[0], low[1]),
        };
        let mut af = if is_long {
            self.long.init
        } else {
            self.short.init
        };

        let mut out = nan_vec(n);
        let (mut prev_high, mut prev_low) = (high[1], low[1]);

        for i in 1..n {
            let (new_high, new_low) = (high[i], low[i]);

            if is_long {
                if new_low <= sar {
                    is_long = false;
                    sar = ep.max(prev_high).max(new_high);
                    sar += sar * self.offset_on_reverse;
                    out[i] = self.emit(sar, is_long);

                    af = self.short.init;
                    ep = new_low;
                    sar = (sar + af * (ep - sar)).max(prev_high).max(new_high);
                } else {
                    out[i] = self.emit(sar, is_long);

                    if new_high > ep {
                        ep = new_high;
                        af = (af + self.long.step).min(self.long.max);
                    }
                    sar = (sar + af * (ep - sar)).min(prev_low).min(new_low);
                }
            } else if new_high >= sar {
                is_long = true;
                sar = ep.min(prev_low).min(new_low);
                sar -= sar * self.offset_on_reverse;
                out[i] = self.emit(sar, is_long);

                af = self.long.init;
                ep = new_high;
                sar = (sar + af * (ep - sar)).min(prev_low).min(new_low);
            } else {
                out[i] = self.emit(sar, is_long);

                if new_low < ep {
                    ep = new_low;
                    af = (af + self.short.step).min(self.short.max);
                }
                sar = (sar + af * (ep - sar)).max(prev_high).max(new_high);
            }

            prev_high = new_high;
            prev_low = new_low;
        }
        Ok(out)
    }

    #[inline]
    fn emit(&self, sar: f64, is_long: bool) -> f64 {
        if self.signed && !is_long {
            -sar
        } else {
            sar
        }
    }
}

/// First-bar direction from one-period directional movement: short when
/// the drop in lows is positive and larger than the rise in highs
fn opens_short(high: &[f64], low: &[f64]) -> bool {
    let up = high[1] - high[0];
    let down = low[0] - low[1];
    down > 0.0 && down > up
}

/// Parabolic SAR with one acceleration step and ceiling for both directions
pub fn sar(high: &[f64], low: &[f64], acceleration: f64, maximum: f64) -> Result<Vec<f64>> {
    let accel = Acceleration {
        init: acceleration,
        step: acceleration,
        max: maximum,
    }
    .validate(["acceleration", "acceleration", "maximum"])?;

    Engine {
        long: accel,
        short: accel,
        start_value: 0.0,
        offset_on_reverse: 0.0,
        signed: false,
    }
    .run(high, low)
}

/// Extended parabolic SAR; short-trend values come back negative
pub fn sarext(high: &[f64], low: &[f64], params: &SarExtParams) -> Result<Vec<f64>> {
    if !params.start_value.is_finite() {
        return Err(TaError::invalid_parameter("startvalue", "must be finite"));
    }
    if !params.offset_on_reverse.is_finite() || params.offset_on_reverse < 0.0 {
        return Err(TaError::invalid_parameter(
            "offsetonreverse",
            "must be a non-negative number",
        ));
    }

    let long = Acceleration {
        init: params.accel_init_long,
        step: params.accel_long,
        max: params.accel_max_long,
    }
    .validate([
        "acceleration_initlong",
        "acceleration_long",
        "acceleration_maxlong",
    ])?;
    let short = Acceleration {
        init: params.accel_init_short,
        step: params.accel_short,
        max: params.accel_max_short,
    }
    .validate([
        "acceleration_initshort",
        "acceleration_short",
        "acceleration_maxshort",
    ])?;

    Engine {
        long,
        short,
        start_value: params.start_value,
        offset_on_reverse: params.offset_on_reverse,
        signed: true,
    }
    .run(high, low)
}
