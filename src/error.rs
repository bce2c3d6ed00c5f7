//! Error types shared across the crate.
//!
//! Each concern carries its own `thiserror` enum. None of these errors cross
//! the per-event entry points ([`accept`](crate::flag::GenericTriggerEventFlag::accept),
//! [`prescale_weight`](crate::prescale::PrescaleWeightProvider::prescale_weight)):
//! failures in the steady-state path are logged and resolved locally to the
//! configured error-reply polarity.

use thiserror::Error;

/// Faults of a single logical expression, detected at compile or evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    /// The expression body is empty after stripping an optional leading `~`.
    #[error("empty logical expression")]
    Empty,
    /// The expression body did not parse as AND/OR/NOT over operand names.
    #[error("malformed logical expression {source_text:?}: {detail}")]
    Malformed {
        source_text: String,
        detail: String,
    },
}

/// Faults of the run-scoped HLT configuration cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HltConfigError {
    #[error("no HLT menu for process {0:?} in this run")]
    UnknownProcess(String),
    #[error("input tag specifies no process name")]
    MissingProcessName,
}

/// Faults reported by the L1 trigger backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum L1Error {
    #[error("L1 trigger {0:?} not present in the current menu")]
    UnknownTrigger(String),
    #[error("L1 lookup failed with error code {0}")]
    ErrorCode(i32),
    #[error("no L1 backend available")]
    Unavailable,
}

/// Faults raised while reading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid input tag {0:?}")]
    InvalidInputTag(String),
}

pub type ExpressionResult<T> = std::result::Result<T, ExpressionError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
