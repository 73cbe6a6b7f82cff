//! Computation unit contract and the declarative indicator descriptor

use crate::error::{Result, TaError};
use crate::types::{Computation, Inputs, OutputConvention, ParamSpec, Params, Role};

/// A named, stateless transformation from input series and parameters to
/// output series.
///
/// Implementations are shared read-only across concurrent requests, so
/// `compute` must not rely on interior mutability.
pub trait ComputationUnit: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Series roles that must be supplied
    fn inputs(&self) -> &[Role];

    /// Declared parameters with their defaults and bounds
    fn params(&self) -> &[ParamSpec];

    /// Names of the output series, in declaration order
    fn outputs(&self) -> &[&'static str];

    fn convention(&self) -> OutputConvention;

    /// Run the computation. `params` has already been merged with defaults.
    fn compute(&self, inputs: &Inputs, params: &Params) -> Result<Computation>;
}

/// Full-length kernel output before the unit applies its convention
#[derive(Debug, Clone)]
pub struct KernelOutput {
    pub lookback: usize,
    pub series: Vec<Vec<f64>>,
}

impl KernelOutput {
    pub fn single(lookback: usize, values: Vec<f64>) -> Self {
        Self {
            lookback,
            series: vec![values],
        }
    }

    pub fn multi(lookback: usize, series: Vec<Vec<f64>>) -> Self {
        Self { lookback, series }
    }
}

pub type KernelFn = fn(&Inputs, &Params) -> Result<KernelOutput>;

/// Declarative computation unit: metadata plus a kernel function.
///
/// Every built-in indicator is one of these, so the dispatcher never needs
/// per-indicator code.
pub struct Indicator {
    name: &'static str,
    description: &'static str,
    convention: OutputConvention,
    inputs: Vec<Role>,
    params: Vec<ParamSpec>,
    outputs: Vec<&'static str>,
    kernel: KernelFn,
}

impl Indicator {
    pub fn new(
        name: &'static str,
        description: &'static str,
        convention: OutputConvention,
        kernel: KernelFn,
    ) -> Self {
        Self {
            name,
            description,
            convention,
            inputs: Vec::new(),
            params: Vec::new(),
            outputs: Vec::new(),
            kernel,
        }
    }

    pub fn input(mut self, role: Role) -> Self {
        self.inputs.push(role);
        self
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn output(mut self, name: &'static str) -> Self {
        self.outputs.push(name);
        self
    }
}

impl std::fmt::Debug for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indicator")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("convention", &self.convention)
            .finish()
    }
}

impl ComputationUnit for Indicator {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn inputs(&self) -> &[Role] {
        &self.inputs
    }

    fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    fn outputs(&self) -> &[&'static str] {
        &self.outputs
    }

    fn convention(&self) -> OutputConvention {
        self.convention
    }

    fn compute(&self, inputs: &Inputs, params: &Params) -> Result<Computation> {
        let KernelOutput { lookback, series } = (self.kernel)(inputs, params)?;
        if series.len() != self.outputs.len() {
            return Err(TaError::Internal(format!(
                "{} produced {} series, declared {}",
                self.name,
                series.len(),
                self.outputs.len()
            )));
        }

        let mut computation = Computation::default().with_meta("lookback", lookback);
        for (name, values) in self.outputs.iter().zip(series) {
            let values = match self.convention {
                OutputConvention::Padded => values,
                OutputConvention::Trimmed => values.get(lookback..).unwrap_or_default().to_vec(),
            };
            computation = computation.with_output(name, values);
        }
        Ok(computation)
    }
}
