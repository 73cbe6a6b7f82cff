//! Error types for ta-mcp

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for ta-mcp operations
pub type Result<T> = std::result::Result<T, TaError>;

/// Main error type for ta-mcp
#[derive(Error, Debug)]
pub enum TaError {
    #[error("tool not found: {0}")]
    NotFound(String),

    #[error("tool already registered: {0}")]
    Duplicate(String),

    #[error("missing required input series '{0}'")]
    MissingInput(String),

    #[error("input series '{0}' is empty")]
    EmptyInput(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("missing required parameter '{0}'")]
    MissingParameter(String),

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("not enough data points: need at least {required}, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a failed invocation.
///
/// Transports use this to pick their own status conventions (HTTP 404 for
/// `NotFound`, in-band `success=false` for everything on the RPC side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    Validation,
    Computation,
    Internal,
}

impl TaError {
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        TaError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Classify the error for the invocation envelope
    pub fn kind(&self) -> FailureKind {
        match self {
            TaError::NotFound(_) => FailureKind::NotFound,
            TaError::MissingInput(_)
            | TaError::EmptyInput(_)
            | TaError::InvalidInput(_)
            | TaError::MissingParameter(_)
            | TaError::InvalidParameter { .. }
            | TaError::Serialization(_) => FailureKind::Validation,
            TaError::InsufficientData { .. } => FailureKind::Computation,
            TaError::Duplicate(_) | TaError::Io(_) | TaError::Config(_) | TaError::Internal(_) => {
                FailureKind::Internal
            }
        }
    }

    /// Get error code for MCP protocol
    pub fn code(&self) -> i64 {
        match self.kind() {
            FailureKind::NotFound => -32001,
            FailureKind::Validation => -32602,
            _ => -32000,
        }
    }
}
