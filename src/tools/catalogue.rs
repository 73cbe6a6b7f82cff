//! Built-in indicator catalogue

use crate::error::Result;
use crate::indicators::{self, MaType, SarExtParams};
use crate::types::{Inputs, OutputConvention, ParamSpec, Params, Role};

use super::unit::{Indicator, KernelOutput};

const PERIOD_DOC: &str = "Number of periods in the window";
const MATYPE_DOC: &str =
    "Moving average type: 0 SMA, 1 EMA, 2 WMA, 3 DEMA, 4 TEMA, 5 TRIMA, 6 KAMA, 7 MAMA, 8 T3";

const MAX_PERIOD: f64 = indicators::MAX_PERIOD as f64;

fn timeperiod(default: i64) -> ParamSpec {
    ParamSpec::integer("timeperiod", default, PERIOD_DOC)
        .min(1.0)
        .max(MAX_PERIOD)
}

fn matype() -> ParamSpec {
    ParamSpec::integer("matype", 0, MATYPE_DOC).min(0.0).max(8.0)
}

fn acceleration(name: &'static str, default: f64, description: &'static str) -> ParamSpec {
    ParamSpec::number(name, default, description).min(0.0)
}

fn single_period(
    inputs: &Inputs,
    params: &Params,
    kernel: fn(&[f64], usize) -> Result<Vec<f64>>,
    lookback: fn(usize) -> usize,
) -> Result<KernelOutput> {
    let close = inputs.require(Role::Close)?;
    let period = params.period("timeperiod")?;
    Ok(KernelOutput::single(lookback(period), kernel(close, period)?))
}

fn period_unit(
    name: &'static str,
    description: &'static str,
    convention: OutputConvention,
    default_period: i64,
    kernel: super::unit::KernelFn,
) -> Indicator {
    Indicator::new(name, description, convention, kernel)
        .input(Role::Close)
        .param(timeperiod(default_period))
        .output(name)
}

/// Every indicator shipped with the server, in no particular order
pub fn builtin_indicators() -> Vec<Indicator> {
    use OutputConvention::{Padded, Trimmed};

    vec![
        period_unit(
            "sma",
            "Simple Moving Average (SMA): arithmetic mean of the closing price over the window",
            Trimmed,
            20,
            |i, p| single_period(i, p, indicators::sma, indicators::sma_lookback),
        ),
        period_unit(
            "ema",
            "Exponential Moving Average (EMA): weights recent prices more heavily",
            Trimmed,
            20,
            |i, p| single_period(i, p, indicators::ema, indicators::ema_lookback),
        ),
        period_unit(
            "rsi",
            "Relative Strength Index (RSI): momentum oscillator bounded to 0..100",
            Trimmed,
            14,
            |i, p| single_period(i, p, indicators::rsi, indicators::rsi_lookback),
        ),
        period_unit(
            "wma",
            "Weighted Moving Average (WMA)",
            Padded,
            30,
            |i, p| single_period(i, p, indicators::wma, indicators::wma_lookback),
        ),
        period_unit(
            "dema",
            "Double Exponential Moving Average (DEMA)",
            Padded,
            30,
            |i, p| single_period(i, p, indicators::dema, indicators::dema_lookback),
        ),
        period_unit(
            "tema",
            "Triple Exponential Moving Average (TEMA)",
            Padded,
            30,
            |i, p| single_period(i, p, indicators::tema, indicators::tema_lookback),
        ),
        period_unit(
            "trima",
            "Triangular Moving Average (TRIMA)",
            Padded,
            30,
            |i, p| single_period(i, p, indicators::trima, indicators::trima_lookback),
        ),
        period_unit(
            "kama",
            "Kaufman Adaptive Moving Average (KAMA)",
            Padded,
            10,
            |i, p| single_period(i, p, indicators::kama, indicators::kama_lookback),
        ),
        period_unit(
            "midpoint",
            "MidPoint over period: (highest + lowest) / 2 of the closing price",
            Padded,
            14,
            |i, p| single_period(i, p, indicators::midpoint, indicators::midpoint_lookback),
        ),
        Indicator::new(
            "t3",
            "Triple Exponential Moving Average (T3)",
            Padded,
            |inputs, params| {
                let close = inputs.require(Role::Close)?;
                let period = params.period("timeperiod")?;
                let vfactor = params.number("vfactor")?;
                Ok(KernelOutput::single(
                    indicators::t3_lookback(period),
                    indicators::t3(close, period, vfactor)?,
                ))
            },
        )
        .input(Role::Close)
        .param(timeperiod(5))
        .param(ParamSpec::number("vfactor", 0.7, "Volume factor").min(0.0).max(1.0))
        .output("t3"),
        Indicator::new("ma", "Moving Average (MA) of the selected type", Padded, |inputs, params| {
            let close = inputs.require(Role::Close)?;
            let period = params.period("timeperiod")?;
            let matype = MaType::try_from(params.integer("matype")?)?;
            Ok(KernelOutput::single(
                indicators::ma_lookback(period, matype),
                indicators::ma(close, period, matype)?,
            ))
        })
        .input(Role::Close)
        .param(timeperiod(30))
        .param(matype())
        .output("ma"),
        Indicator::new("bbands", "Bollinger Bands (BBANDS)", Padded, |inputs, params| {
            let close = inputs.require(Role::Close)?;
            let period = params.period("timeperiod")?;
            let matype = MaType::try_from(params.integer("matype")?)?;
            let bands = indicators::bbands(
                close,
                period,
                params.number("nbdevup")?,
                params.number("nbdevdn")?,
                matype,
            )?;
            Ok(KernelOutput::multi(
                indicators::bbands_lookback(period, matype),
                vec![bands.upper, bands.middle, bands.lower],
            ))
        })
        .input(Role::Close)
        .param(timeperiod(20))
        .param(ParamSpec::number("nbdevup", 2.0, "Deviation multiplier for the upper band"))
        .param(ParamSpec::number("nbdevdn", 2.0, "Deviation multiplier for the lower band"))
        .param(matype())
        .output("upperband")
        .output("middleband")
        .output("lowerband"),
        Indicator::new("mama", "MESA Adaptive Moving Average (MAMA)", Padded, |inputs, params| {
            let close = inputs.require(Role::Close)?;
            let out = indicators::mama(
                close,
                params.number("fastlimit")?,
                params.number("slowlimit")?,
            )?;
            Ok(KernelOutput::multi(
                indicators::mama_lookback(),
                vec![out.mama, out.fama],
            ))
        })
        .input(Role::Close)
        .param(
            ParamSpec::number("fastlimit", 0.5, "Upper limit of the adaptive factor")
                .min(0.01)
                .max(0.99),
        )
        .param(
            ParamSpec::number("slowlimit", 0.05, "Lower limit of the adaptive factor")
                .min(0.01)
                .max(0.99),
        )
        .output("mama")
        .output("fama"),
        Indicator::new(
            "mavp",
            "Moving Average with Variable Period (MAVP)",
            Padded,
            |inputs, params| {
                let close = inputs.require(Role::Close)?;
                let max_period = params.period("maxperiod")?;
                let out = indicators::mavp(
                    close,
                    params.number("periods")?,
                    params.period("minperiod")?,
                    max_period,
                )?;
                Ok(KernelOutput::single(indicators::mavp_lookback(max_period), out))
            },
        )
        .input(Role::Close)
        .param(ParamSpec::required_number(
            "periods",
            "Period applied to every bar, clamped into [minperiod, maxperiod]",
        ))
        .param(
            ParamSpec::integer("minperiod", 2, "Smallest allowed period")
                .min(1.0)
                .max(MAX_PERIOD),
        )
        .param(
            ParamSpec::integer("maxperiod", 30, "Largest allowed period")
                .min(1.0)
                .max(MAX_PERIOD),
        )
        .output("mavp"),
        Indicator::new(
            "midprice",
            "Midpoint Price over period: (highest high + lowest low) / 2",
            Padded,
            |inputs, params| {
                let high = inputs.require(Role::High)?;
                let low = inputs.require(Role::Low)?;
                let period = params.period("timeperiod")?;
                Ok(KernelOutput::single(
                    indicators::midprice_lookback(period),
                    indicators::midprice(high, low, period)?,
                ))
            },
        )
        .input(Role::High)
        .input(Role::Low)
        .param(timeperiod(14))
        .output("midprice"),
        Indicator::new(
            "ht_trendline",
            "Hilbert Transform - Instantaneous Trendline",
            Padded,
            |inputs, _params| {
                let close = inputs.require(Role::Close)?;
                Ok(KernelOutput::single(
                    indicators::ht_trendline_lookback(),
                    indicators::ht_trendline(close)?,
                ))
            },
        )
        .input(Role::Close)
        .output("ht_trendline"),
        Indicator::new("sar", "Parabolic SAR", Padded, |inputs, params| {
            let high = inputs.require(Role::High)?;
            let low = inputs.require(Role::Low)?;
            Ok(KernelOutput::single(
                indicators::sar_lookback(),
                indicators::sar(
                    high,
                    low,
                    params.number("acceleration")?,
                    params.number("maximum")?,
                )?,
            ))
        })
        .input(Role::High)
        .input(Role::Low)
        .param(acceleration("acceleration", 0.02, "Acceleration factor step"))
        .param(acceleration("maximum", 0.2, "Acceleration factor ceiling"))
        .output("sar"),
        Indicator::new(
            "sarext",
            "Parabolic SAR - Extended (short positions reported as negative values)",
            Padded,
            |inputs, params| {
                let high = inputs.require(Role::High)?;
                let low = inputs.require(Role::Low)?;
                let settings = SarExtParams {
                    start_value: params.optional_number("startvalue")?.unwrap_or(0.0),
                    offset_on_reverse: params.number("offsetonreverse")?,
                    accel_init_long: params.number("acceleration_initlong")?,
                    accel_long: params.number("acceleration_long")?,
                    accel_max_long: params.number("acceleration_maxlong")?,
                    accel_init_short: params.number("acceleration_initshort")?,
                    accel_short: params.number("acceleration_short")?,
                    accel_max_short: params.number("acceleration_maxshort")?,
                };
                Ok(KernelOutput::single(
                    indicators::sarext_lookback(),
                    indicators::sarext(high, low, &settings)?,
                ))
            },
        )
        .input(Role::High)
        .input(Role::Low)
        .param(ParamSpec::optional_number(
            "startvalue",
            "Starting SAR; positive starts long, negative starts short, null derives it",
        ))
        .param(acceleration("offsetonreverse", 0.0, "Fractional offset applied on reversal"))
        .param(acceleration("acceleration_initlong", 0.02, "Initial long acceleration"))
        .param(acceleration("acceleration_long", 0.02, "Long acceleration step"))
        .param(acceleration("acceleration_maxlong", 0.2, "Long acceleration ceiling"))
        .param(acceleration("acceleration_initshort", 0.02, "Initial short acceleration"))
        .param(acceleration("acceleration_short", 0.02, "Short acceleration step"))
        .param(acceleration("acceleration_maxshort", 0.2, "Short acceleration ceiling"))
        .output("sarext"),
    ]
}
