//! Core types for ta-mcp

use std::collections::BTreeMap;
use std::ops::Deref;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{FailureKind, Result, TaError};

/// Named output series of a computation, ordered by name
pub type Outputs = BTreeMap<String, Series>;

/// Free-form metadata attached to a successful computation
pub type Metadata = serde_json::Map<String, Value>;

/// OHLCV channel a series plays in a computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl Role {
    pub const ALL: [Role; 5] = [Role::Open, Role::High, Role::Low, Role::Close, Role::Volume];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Open => "open",
            Role::High => "high",
            Role::Low => "low",
            Role::Close => "close",
            Role::Volume => "volume",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "open" => Ok(Role::Open),
            "high" => Ok(Role::High),
            "low" => Ok(Role::Low),
            "close" => Ok(Role::Close),
            "volume" => Ok(Role::Volume),
            _ => Err(format!("Unknown series role: {}", s)),
        }
    }
}

/// An ordered sequence of samples for one channel.
///
/// Unavailable samples are NaN in memory and `null` on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Series(Vec<f64>);

impl Series {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Parse a JSON array of numbers for the given role; `null` reads as NaN
    pub fn from_json(role: Role, value: &Value) -> Result<Self> {
        let items = value.as_array().ok_or_else(|| {
            TaError::InvalidInput(format!("series '{}' must be an array of numbers", role))
        })?;
        let values = items
            .iter()
            .enumerate()
            .map(|(i, v)| match v {
                Value::Null => Ok(f64::NAN),
                _ => v.as_f64().ok_or_else(|| {
                    TaError::InvalidInput(format!(
                        "series '{}' has a non-numeric value at index {}",
                        role, i
                    ))
                }),
            })
            .collect::<Result<Vec<f64>>>()?;
        Ok(Self(values))
    }
}

impl Deref for Series {
    type Target = [f64];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<f64>> for Series {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

impl<'de> Deserialize<'de> for Series {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(Self(raw.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()))
    }
}

/// Series supplied to one invocation, keyed by role
#[derive(Debug, Clone, Default)]
pub struct Inputs(BTreeMap<Role, Series>);

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, role: Role, series: impl Into<Series>) -> Self {
        self.insert(role, series);
        self
    }

    pub fn insert(&mut self, role: Role, series: impl Into<Series>) {
        self.0.insert(role, series.into());
    }

    /// Fetch a series the unit cannot work without
    pub fn require(&self, role: Role) -> Result<&[f64]> {
        self.0
            .get(&role)
            .map(|s| s.as_slice())
            .ok_or_else(|| TaError::MissingInput(role.to_string()))
    }
}

/// Type of a declared parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Integer,
    Number,
}

/// A resolved parameter value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Integer(i64),
    Number(f64),
    Null,
}

impl ParamValue {
    pub fn to_json(self) -> Value {
        match self {
            ParamValue::Integer(i) => Value::from(i),
            ParamValue::Number(n) => Value::from(n),
            ParamValue::Null => Value::Null,
        }
    }
}

/// Declaration of one tunable parameter of a computation unit.
///
/// `default: None` means the caller must supply the value;
/// `Some(ParamValue::Null)` means the parameter may be left unset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub default: Option<ParamValue>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub description: &'static str,
}

impl ParamSpec {
    pub const fn integer(name: &'static str, default: i64, description: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Integer,
            default: Some(ParamValue::Integer(default)),
            minimum: None,
            maximum: None,
            description,
        }
    }

    pub const fn number(name: &'static str, default: f64, description: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Number,
            default: Some(ParamValue::Number(default)),
            minimum: None,
            maximum: None,
            description,
        }
    }

    /// A number that may be left unset (resolves to null)
    pub const fn optional_number(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Number,
            default: Some(ParamValue::Null),
            minimum: None,
            maximum: None,
            description,
        }
    }

    /// A number with no default; omitting it is a validation failure
    pub const fn required_number(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Number,
            default: None,
            minimum: None,
            maximum: None,
            description,
        }
    }

    pub const fn min(self, minimum: f64) -> Self {
        Self {
            minimum: Some(minimum),
            ..self
        }
    }

    pub const fn max(self, maximum: f64) -> Self {
        Self {
            maximum: Some(maximum),
            ..self
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    /// Resolve the caller's raw value (or its absence) against this declaration
    pub fn resolve(&self, raw: Option<&Value>) -> Result<ParamValue> {
        let value = match raw {
            None => {
                return self
                    .default
                    .ok_or_else(|| TaError::MissingParameter(self.name.to_string()))
            }
            Some(Value::Null) => {
                return match self.default {
                    Some(ParamValue::Null) => Ok(ParamValue::Null),
                    Some(_) => Err(TaError::invalid_parameter(self.name, "must not be null")),
                    None => Err(TaError::MissingParameter(self.name.to_string())),
                }
            }
            Some(v) => v,
        };

        let resolved = match self.kind {
            ParamKind::Integer => {
                let n = value.as_i64().or_else(|| {
                    value
                        .as_f64()
                        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                        .map(|f| f as i64)
                });
                match n {
                    Some(n) => ParamValue::Integer(n),
                    None => {
                        return Err(TaError::invalid_parameter(
                            self.name,
                            format!("expected an integer, got {}", value),
                        ))
                    }
                }
            }
            ParamKind::Number => match value.as_f64() {
                Some(f) if f.is_finite() => ParamValue::Number(f),
                _ => {
                    return Err(TaError::invalid_parameter(
                        self.name,
                        format!("expected a number, got {}", value),
                    ))
                }
            },
        };

        self.check_bounds(resolved)?;
        Ok(resolved)
    }

    fn check_bounds(&self, value: ParamValue) -> Result<()> {
        let v = match value {
            ParamValue::Integer(i) => i as f64,
            ParamValue::Number(n) => n,
            ParamValue::Null => return Ok(()),
        };
        if let Some(min) = self.minimum {
            if v < min {
                return Err(TaError::invalid_parameter(
                    self.name,
                    format!("must be >= {}, got {}", min, v),
                ));
            }
        }
        if let Some(max) = self.maximum {
            if v > max {
                return Err(TaError::invalid_parameter(
                    self.name,
                    format!("must be <= {}, got {}", max, v),
                ));
            }
        }
        Ok(())
    }

    /// JSON Schema fragment for tool discovery
    pub fn json_schema(&self) -> Value {
        let mut schema = serde_json::Map::new();
        let ty = match (self.kind, self.default) {
            (ParamKind::Integer, _) => Value::from("integer"),
            (ParamKind::Number, Some(ParamValue::Null)) => serde_json::json!(["number", "null"]),
            (ParamKind::Number, _) => Value::from("number"),
        };
        schema.insert("type".into(), ty);
        schema.insert("description".into(), Value::from(self.description));
        if let Some(default) = self.default {
            schema.insert("default".into(), default.to_json());
        }
        if let Some(min) = self.minimum {
            schema.insert("minimum".into(), Value::from(min));
        }
        if let Some(max) = self.maximum {
            schema.insert("maximum".into(), Value::from(max));
        }
        Value::Object(schema)
    }
}

/// Parameters after defaults have been merged in
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.0.get(name).copied()
    }

    pub fn integer(&self, name: &str) -> Result<i64> {
        match self.get(name) {
            Some(ParamValue::Integer(i)) => Ok(i),
            Some(_) => Err(TaError::invalid_parameter(name, "expected an integer")),
            None => Err(TaError::MissingParameter(name.to_string())),
        }
    }

    /// A window length: a positive integer
    pub fn period(&self, name: &str) -> Result<usize> {
        let value = self.integer(name)?;
        if value < 1 {
            return Err(TaError::invalid_parameter(
                name,
                format!("must be a positive integer, got {}", value),
            ));
        }
        usize::try_from(value)
            .map_err(|_| TaError::invalid_parameter(name, format!("out of range: {}", value)))
    }

    pub fn number(&self, name: &str) -> Result<f64> {
        match self.get(name) {
            Some(ParamValue::Number(n)) => Ok(n),
            Some(ParamValue::Integer(i)) => Ok(i as f64),
            Some(ParamValue::Null) => Err(TaError::MissingParameter(name.to_string())),
            None => Err(TaError::MissingParameter(name.to_string())),
        }
    }

    pub fn optional_number(&self, name: &str) -> Result<Option<f64>> {
        match self.get(name) {
            Some(ParamValue::Null) | None => Ok(None),
            Some(_) => self.number(name).map(Some),
        }
    }

    /// Render the resolved values for the result metadata
    pub fn to_metadata(&self) -> Metadata {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }
}

/// How a windowed unit aligns its output with its input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputConvention {
    /// Output starts at the first full window: `n - lookback` values
    Trimmed,
    /// Output has `n` values; the first `lookback` are unavailable
    Padded,
}

impl std::fmt::Display for OutputConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputConvention::Trimmed => write!(f, "trimmed"),
            OutputConvention::Padded => write!(f, "padded"),
        }
    }
}

/// What a computation unit hands back on success
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Computation {
    pub values: Outputs,
    pub metadata: Metadata,
}

impl Computation {
    pub fn single(name: &str, values: Vec<f64>) -> Self {
        let mut outputs = Outputs::new();
        outputs.insert(name.to_string(), Series::new(values));
        Self {
            values: outputs,
            metadata: Metadata::new(),
        }
    }

    pub fn with_output(mut self, name: &str, values: Vec<f64>) -> Self {
        self.values.insert(name.to_string(), Series::new(values));
        self
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Length shared by every output series
    pub fn output_len(&self) -> usize {
        self.values.values().map(|s| s.len()).max().unwrap_or(0)
    }
}

/// Uniform result of an invocation, shared by every transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "EnvelopeWire", try_from = "EnvelopeWire")]
pub enum Envelope {
    Success { values: Outputs, metadata: Metadata },
    Failure { kind: FailureKind, message: String },
}

impl Envelope {
    pub fn failure(err: &TaError) -> Self {
        Envelope::Failure {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Envelope::Failure { kind, .. } => Some(*kind),
            Envelope::Success { .. } => None,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({"success": false, "error": e.to_string(), "error_kind": "internal"})
        })
    }
}

impl From<Result<Computation>> for Envelope {
    fn from(result: Result<Computation>) -> Self {
        match result {
            Ok(c) => Envelope::Success {
                values: c.values,
                metadata: c.metadata,
            },
            Err(e) => Envelope::failure(&e),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EnvelopeWire {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    values: Option<Outputs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<Metadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_kind: Option<FailureKind>,
}

impl From<Envelope> for EnvelopeWire {
    fn from(envelope: Envelope) -> Self {
        match envelope {
            Envelope::Success { values, metadata } => EnvelopeWire {
                success: true,
                values: Some(values),
                metadata: Some(metadata),
                error: None,
                error_kind: None,
            },
            Envelope::Failure { kind, message } => EnvelopeWire {
                success: false,
                values: None,
                metadata: None,
                error: Some(message),
                error_kind: Some(kind),
            },
        }
    }
}

impl TryFrom<EnvelopeWire> for Envelope {
    type Error = String;

    fn try_from(wire: EnvelopeWire) -> std::result::Result<Self, Self::Error> {
        if wire.success {
            if wire.error.is_some() {
                return Err("successful envelope must not carry an error".to_string());
            }
            Ok(Envelope::Success {
                values: wire.values.unwrap_or_default(),
                metadata: wire.metadata.unwrap_or_default(),
            })
        } else {
            if wire.values.is_some() {
                return Err("failed envelope must not carry values".to_string());
            }
            Ok(Envelope::Failure {
                kind: wire.error_kind.unwrap_or(FailureKind::Internal),
                message: wire.error.unwrap_or_else(|| "calculation error".to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_round_trip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("close_prices".parse::<Role>().is_err());
    }

    #[test]
    fn test_series_from_json_rejects_non_numbers() {
        let err = Series::from_json(Role::Close, &json!([1.0, "x"])).unwrap_err();
        assert!(err.to_string().contains("index 1"));
        assert!(Series::from_json(Role::Close, &json!("1,2,3")).is_err());
    }

    #[test]
    fn test_series_from_json_reads_null_as_nan() {
        let series = Series::from_json(Role::High, &json!([null, 2, 3.5])).unwrap();
        assert_eq!(series.len(), 3);
        assert!(series[0].is_nan());
        assert_eq!(series.iter().filter(|v| !v.is_nan()).count(), 2);
    }

    #[test]
    fn test_nan_serializes_as_null_and_back() {
        let series = Series::new(vec![f64::NAN, 1.5]);
        let json = serde_json::to_string(&series).unwrap();
        assert_eq!(json, "[null,1.5]");
        let back: Series = serde_json::from_str(&json).unwrap();
        assert!(back[0].is_nan());
        assert_eq!(back[1], 1.5);
    }

    #[test]
    fn test_resolve_integer_accepts_integral_float() {
        let spec = ParamSpec::integer("timeperiod", 20, "").min(1.0);
        assert_eq!(spec.resolve(Some(&json!(3.0))).unwrap(), ParamValue::Integer(3));
        assert_eq!(spec.resolve(None).unwrap(), ParamValue::Integer(20));
        assert!(spec.resolve(Some(&json!(2.5))).is_err());
        assert!(spec.resolve(Some(&json!("3"))).is_err());
        assert!(spec.resolve(Some(&json!(0))).is_err());
    }

    #[test]
    fn test_resolve_null_and_required() {
        let optional = ParamSpec::optional_number("startvalue", "");
        assert_eq!(optional.resolve(None).unwrap(), ParamValue::Null);
        assert_eq!(optional.resolve(Some(&Value::Null)).unwrap(), ParamValue::Null);

        let required = ParamSpec::required_number("periods", "");
        assert!(matches!(
            required.resolve(None),
            Err(TaError::MissingParameter(_))
        ));

        let with_default = ParamSpec::number("vfactor", 0.7, "");
        assert!(with_default.resolve(Some(&Value::Null)).is_err());
    }

    #[test]
    fn test_envelope_wire_shape() {
        let ok = Envelope::Success {
            values: Computation::single("sma", vec![2.0]).values,
            metadata: Metadata::new(),
        };
        let json = ok.to_json();
        assert_eq!(json["success"], json!(true));
        assert_eq!(json["values"]["sma"], json!([2.0]));
        assert!(json.get("error").is_none());

        let failed = Envelope::failure(&TaError::NotFound("nope".into()));
        let json = failed.to_json();
        assert_eq!(json["success"], json!(false));
        assert_eq!(json["error_kind"], json!("not_found"));
        assert!(json.get("values").is_none());

        let back: Envelope = serde_json::from_value(json).unwrap();
        assert_eq!(back, failed);
    }

    #[test]
    fn test_envelope_rejects_mixed_branches() {
        let mixed = json!({"success": false, "values": {"a": [1.0]}, "error": "x"});
        assert!(serde_json::from_value::<Envelope>(mixed).is_err());
    }
}
