//! Uniform invocation of registered units.
//!
//! The dispatcher is the single failure boundary between transports and
//! computation units: every outcome, including a panic inside a unit,
//! comes back as an [`Envelope`].

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{Result, TaError};
use crate::types::{Computation, Envelope, Inputs, Params, Role, Series};

use super::registry::ToolRegistry;
use super::unit::ComputationUnit;

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Invoke `name` with already-parsed series and raw parameter overrides
    pub fn invoke(&self, name: &str, inputs: &Inputs, raw_params: &Map<String, Value>) -> Envelope {
        self.try_invoke(name, inputs, raw_params).into()
    }

    /// Invoke `name` with a flat JSON object carrying both series and parameters
    pub fn invoke_json(&self, name: &str, arguments: &Value) -> Envelope {
        self.try_invoke_json(name, arguments).into()
    }

    fn try_invoke_json(&self, name: &str, arguments: &Value) -> Result<Computation> {
        let unit = self.lookup(name)?;
        let object = arguments
            .as_object()
            .ok_or_else(|| TaError::InvalidInput("arguments must be a JSON object".into()))?;
        let (inputs, params) = split_arguments(unit.as_ref(), object)?;
        self.run(unit.as_ref(), &inputs, &params)
    }

    fn try_invoke(
        &self,
        name: &str,
        inputs: &Inputs,
        raw_params: &Map<String, Value>,
    ) -> Result<Computation> {
        let unit = self.lookup(name)?;
        self.run(unit.as_ref(), inputs, raw_params)
    }

    fn lookup(&self, name: &str) -> Result<Arc<dyn ComputationUnit>> {
        self.registry
            .get(name)
            .ok_or_else(|| TaError::NotFound(name.to_string()))
    }

    fn run(
        &self,
        unit: &dyn ComputationUnit,
        inputs: &Inputs,
        raw_params: &Map<String, Value>,
    ) -> Result<Computation> {
        let input_points = check_inputs(unit, inputs)?;
        let params = resolve_params(unit, raw_params)?;

        tracing::debug!(
            tool = unit.name(),
            input_points,
            "Invoking tool"
        );

        let computation = match catch_unwind(AssertUnwindSafe(|| unit.compute(inputs, &params))) {
            Ok(result) => result?,
            Err(payload) => {
                let detail = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(tool = unit.name(), "Tool panicked: {}", detail);
                return Err(TaError::Internal(format!(
                    "unexpected failure while computing {}",
                    unit.name()
                )));
            }
        };

        let output_points = computation.output_len();
        let mut computation = computation;
        computation.metadata.extend(params.to_metadata());
        computation = computation
            .with_meta("input_points", input_points)
            .with_meta("output_points", output_points)
            .with_meta("convention", unit.convention().to_string());
        Ok(computation)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("tools", &self.registry.len())
            .finish()
    }
}

/// Pull the unit's series roles out of a flat argument object.
///
/// Fails with `MissingInput` when a declared role is absent and with
/// `InvalidInput` when a value is not an array of numbers. Everything that
/// is not a declared role is returned as a raw parameter.
pub fn split_arguments(
    unit: &dyn ComputationUnit,
    arguments: &Map<String, Value>,
) -> Result<(Inputs, Map<String, Value>)> {
    let mut inputs = Inputs::new();
    for &role in unit.inputs() {
        let value = arguments
            .get(role.as_str())
            .ok_or_else(|| TaError::MissingInput(role.to_string()))?;
        inputs.insert(role, Series::from_json(role, value)?);
    }

    let params = arguments
        .iter()
        .filter(|(key, _)| !unit.inputs().iter().any(|r| r.as_str() == key.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Ok((inputs, params))
}

/// Every declared role present, non-empty and of one common length
fn check_inputs(unit: &dyn ComputationUnit, inputs: &Inputs) -> Result<usize> {
    let mut expected: Option<(Role, usize)> = None;
    for &role in unit.inputs() {
        let series = inputs.require(role)?;
        if series.is_empty() {
            return Err(TaError::EmptyInput(role.to_string()));
        }
        match expected {
            None => expected = Some((role, series.len())),
            Some((first, len)) if len != series.len() => {
                return Err(TaError::InvalidInput(format!(
                    "input series must have equal length: {} has {}, {} has {}",
                    first,
                    len,
                    role,
                    series.len()
                )))
            }
            Some(_) => {}
        }
    }
    Ok(expected.map(|(_, len)| len).unwrap_or(0))
}

/// Merge raw overrides over the unit's declared defaults
fn resolve_params(unit: &dyn ComputationUnit, raw: &Map<String, Value>) -> Result<Params> {
    let mut params = Params::new();
    for spec in unit.params() {
        params.insert(spec.name, spec.resolve(raw.get(spec.name))?);
    }

    for key in raw.keys() {
        let declared = unit.params().iter().any(|spec| spec.name == key.as_str());
        let is_role = key.parse::<Role>().is_ok();
        if !declared && !is_role {
            tracing::debug!(tool = unit.name(), "Ignoring unknown parameter {}", key);
        }
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::tools::unit::{Indicator, KernelOutput};
    use crate::types::{OutputConvention, ParamSpec};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Arc::new(ToolRegistry::with_builtin_tools()))
    }

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn close(values: &[f64]) -> Inputs {
        Inputs::new().with(Role::Close, values.to_vec())
    }

    #[test]
    fn test_sma_round_trip() {
        let envelope = dispatcher().invoke(
            "sma",
            &close(&[1.0, 2.0, 3.0, 4.0, 5.0]),
            &params(json!({"timeperiod": 3})),
        );
        match envelope {
            Envelope::Success { values, metadata } => {
                assert_eq!(values["sma"].as_slice(), &[2.0, 3.0, 4.0]);
                assert_eq!(metadata["output_points"], 3);
                assert_eq!(metadata["input_points"], 5);
                assert_eq!(metadata["timeperiod"], 3);
                assert_eq!(metadata["convention"], "trimmed");
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_sma_insufficient_data_message() {
        let envelope = dispatcher().invoke(
            "sma",
            &close(&[1.0, 2.0, 3.0]),
            &params(json!({"timeperiod": 10})),
        );
        match envelope {
            Envelope::Failure { kind, message } => {
                assert_eq!(kind, FailureKind::Computation);
                assert!(message.contains("10"), "{}", message);
                assert!(message.contains('3'), "{}", message);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_unit_is_not_found() {
        let envelope = dispatcher().invoke("unknown_unit", &close(&[1.0, 2.0, 3.0]), &Map::new());
        assert_eq!(envelope.failure_kind(), Some(FailureKind::NotFound));
    }

    #[test]
    fn test_defaults_fill_missing_params() {
        let data: Vec<f64> = (1..=30).map(f64::from).collect();
        let envelope = dispatcher().invoke("rsi", &close(&data), &Map::new());
        match envelope {
            Envelope::Success { values, metadata } => {
                assert_eq!(metadata["timeperiod"], 14);
                assert_eq!(values["rsi"].len(), 16);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_padded_unit_keeps_input_length() {
        let data: Vec<f64> = (1..=10).map(f64::from).collect();
        let envelope = dispatcher().invoke("wma", &close(&data), &params(json!({"timeperiod": 4})));
        match envelope {
            Envelope::Success { values, metadata } => {
                assert_eq!(values["wma"].len(), 10);
                assert_eq!(values["wma"].iter().filter(|v| !v.is_nan()).count(), 7);
                assert_eq!(metadata["lookback"], 3);
                assert_eq!(metadata["convention"], "padded");
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_param_is_validation() {
        let envelope = dispatcher().invoke(
            "sma",
            &close(&[1.0, 2.0, 3.0]),
            &params(json!({"timeperiod": 0})),
        );
        assert_eq!(envelope.failure_kind(), Some(FailureKind::Validation));

        let envelope = dispatcher().invoke(
            "sma",
            &close(&[1.0, 2.0, 3.0]),
            &params(json!({"timeperiod": "three"})),
        );
        assert_eq!(envelope.failure_kind(), Some(FailureKind::Validation));
    }

    #[test]
    fn test_huge_period_is_validation_not_internal() {
        for name in ["tema", "t3", "dema", "bbands", "ma", "sma"] {
            let envelope = dispatcher().invoke(
                name,
                &close(&[1.0, 2.0, 3.0]),
                &params(json!({"timeperiod": 7_000_000_000_000_000_000i64})),
            );
            match envelope {
                Envelope::Failure { kind, message } => {
                    assert_eq!(kind, FailureKind::Validation, "{}: {}", name, message);
                    assert!(message.contains("timeperiod"), "{}: {}", name, message);
                }
                other => panic!("{}: expected failure, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_padded_output_feeds_back_as_input() {
        let first = dispatcher()
            .invoke_json("wma", &json!({"close": [1, 2, 3, 4, 5, 6], "timeperiod": 2}))
            .to_json();
        let padded = first["values"]["wma"].clone();
        assert!(padded[0].is_null());

        let envelope = dispatcher().invoke_json("wma", &json!({"close": padded, "timeperiod": 2}));
        match envelope {
            Envelope::Success { values, metadata } => {
                assert_eq!(metadata["input_points"], 6);
                let wma = &values["wma"];
                assert_eq!(wma.len(), 6);
                assert_eq!(wma.iter().filter(|v| !v.is_nan()).count(), 4);
                // wma(2) of 5/3 and 8/3
                assert!((wma[2] - 7.0 / 3.0).abs() < 1e-12);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_null_samples_are_not_a_validation_failure() {
        let envelope =
            dispatcher().invoke_json("sma", &json!({"close": [1, null, 3], "timeperiod": 2}));
        assert!(envelope.is_success(), "{:?}", envelope);
    }

    #[test]
    fn test_required_param_without_default() {
        let envelope = dispatcher().invoke("mavp", &close(&[1.0; 40]), &Map::new());
        match envelope {
            Envelope::Failure { kind, message } => {
                assert_eq!(kind, FailureKind::Validation);
                assert!(message.contains("periods"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_and_mismatched_inputs() {
        let d = dispatcher();
        let envelope = d.invoke("sma", &close(&[]), &Map::new());
        assert_eq!(envelope.failure_kind(), Some(FailureKind::Validation));

        let inputs = Inputs::new()
            .with(Role::High, vec![2.0, 3.0, 4.0])
            .with(Role::Low, vec![1.0, 2.0]);
        let envelope = d.invoke("midprice", &inputs, &params(json!({"timeperiod": 2})));
        assert_eq!(envelope.failure_kind(), Some(FailureKind::Validation));
    }

    #[test]
    fn test_invoke_json_splits_series_and_params() {
        let envelope = dispatcher().invoke_json(
            "midprice",
            &json!({"high": [2, 4, 6, 8], "low": [1, 3, 5, 7], "timeperiod": 2, "extra": true}),
        );
        match envelope {
            Envelope::Success { values, .. } => {
                let mid = &values["midprice"];
                assert!(mid[0].is_nan());
                assert_eq!(&mid[1..], &[2.5, 4.5, 6.5]);
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_invoke_json_rejects_prefixed_role_names() {
        let envelope =
            dispatcher().invoke_json("sma", &json!({"close_prices": [1, 2, 3], "timeperiod": 2}));
        match envelope {
            Envelope::Failure { kind, message } => {
                assert_eq!(kind, FailureKind::Validation);
                assert!(message.contains("close"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    static CALLS: AtomicUsize = AtomicUsize::new(0);

    fn counting(inputs: &Inputs, _params: &Params) -> Result<KernelOutput> {
        CALLS.fetch_add(1, Ordering::SeqCst);
        Ok(KernelOutput::single(0, inputs.require(Role::High)?.to_vec()))
    }

    #[test]
    fn test_missing_input_never_reaches_unit() {
        let mut registry = ToolRegistry::new();
        let unit = Indicator::new("counting", "", OutputConvention::Padded, counting)
            .input(Role::High)
            .input(Role::Low)
            .output("counting");
        registry.register("counting", Arc::new(unit)).unwrap();
        let d = Dispatcher::new(Arc::new(registry));

        let inputs = Inputs::new().with(Role::High, vec![1.0, 2.0]);
        let envelope = d.invoke("counting", &inputs, &Map::new());
        assert_eq!(envelope.failure_kind(), Some(FailureKind::Validation));
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);

        let inputs = inputs.with(Role::Low, vec![0.5, 1.5]);
        assert!(d.invoke("counting", &inputs, &Map::new()).is_success());
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    fn exploding(_inputs: &Inputs, _params: &Params) -> Result<KernelOutput> {
        panic!("kernel blew up")
    }

    #[test]
    fn test_panic_becomes_internal_failure() {
        let mut registry = ToolRegistry::new();
        let unit = Indicator::new("exploding", "", OutputConvention::Padded, exploding)
            .input(Role::Close)
            .param(ParamSpec::integer("timeperiod", 1, ""))
            .output("exploding");
        registry.register("exploding", Arc::new(unit)).unwrap();
        let d = Dispatcher::new(Arc::new(registry));

        match d.invoke("exploding", &close(&[1.0]), &Map::new()) {
            Envelope::Failure { kind, message } => {
                assert_eq!(kind, FailureKind::Internal);
                assert!(!message.contains("blew up"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_repeated_invocations_are_bit_identical() {
        let data: Vec<f64> = (0..120).map(|i| 50.0 + (i as f64 * 0.3).sin() * 7.0).collect();
        let d = dispatcher();
        for name in d.registry().list() {
            let inputs = Inputs::new()
                .with(Role::Close, data.clone())
                .with(Role::High, data.iter().map(|v| v + 1.0).collect::<Vec<_>>())
                .with(Role::Low, data.iter().map(|v| v - 1.0).collect::<Vec<_>>());
            let raw = params(json!({"periods": 5, "timeperiod": 5}));
            let first = d.invoke(&name, &inputs, &raw);
            let second = d.invoke(&name, &inputs, &raw);
            assert!(first.is_success(), "{} failed: {:?}", name, first);
            assert_eq!(
                serde_json::to_string(&first).unwrap(),
                serde_json::to_string(&second).unwrap(),
                "{} is not deterministic",
                name
            );
        }
    }

    #[test]
    fn test_concurrent_invocations_do_not_interfere() {
        let d = dispatcher();
        std::thread::scope(|scope| {
            let handles: Vec<_> = (1..=8)
                .map(|k| {
                    let d = &d;
                    scope.spawn(move || {
                        let data: Vec<f64> = (0..50).map(|i| (i * k) as f64).collect();
                        let envelope =
                            d.invoke("sma", &close(&data), &params(json!({"timeperiod": 2})));
                        (k, envelope)
                    })
                })
                .collect();

            for handle in handles {
                let (k, envelope) = handle.join().unwrap();
                match envelope {
                    Envelope::Success { values, .. } => {
                        let sma = &values["sma"];
                        assert_eq!(sma.len(), 49);
                        assert_eq!(sma[0], k as f64 / 2.0);
                    }
                    other => panic!("expected success, got {:?}", other),
                }
            }
        });
    }
}
