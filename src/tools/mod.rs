//! Tool registry and dispatch.
//!
//! A tool is a [`ComputationUnit`]: a named indicator with declared series
//! roles, parameters and outputs. Units live in a [`ToolRegistry`] built
//! once at startup; every transport goes through the [`Dispatcher`], which
//! validates inputs, fills defaults and turns every outcome into an
//! [`Envelope`](crate::types::Envelope).

pub mod catalogue;
pub mod dispatcher;
pub mod registry;
pub mod unit;

pub use catalogue::builtin_indicators;
pub use dispatcher::{split_arguments, Dispatcher};
pub use registry::ToolRegistry;
pub use unit::{ComputationUnit, Indicator, KernelFn, KernelOutput};
