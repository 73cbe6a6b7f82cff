//! ta-mcp - Technical-analysis indicators as tools
//!
//! A registry of indicator computations served over MCP (JSON-RPC) and a
//! REST API, with one dispatcher shared by every transport.

pub mod api;
pub mod error;
pub mod indicators;
pub mod mcp;
pub mod tools;
pub mod types;

pub use error::{FailureKind, Result, TaError};
pub use tools::{ComputationUnit, Dispatcher, ToolRegistry};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
