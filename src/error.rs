//! Error kinds shared across the bridge (spec §7).
//!
//! Per-command errors never escape a worker boundary: every site that
//! produces a `BridgeError` logs it and drops it. Only `StartupFailed`
//! (propagated from `Application::start`) and an explicit shutdown
//! terminate the process.

use crate::networking::Origin;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Unreachable in practice: `DataUnit`'s enum tag *is* its origin, so a
    /// variant mismatch can't arise from pattern matching on it. Retained
    /// for API completeness (see SPEC_FULL.md §4.11).
    #[error("wrong unit type for origin {0:?}")]
    WrongUnitType(Origin),

    #[error("origin not implemented: {0:?}")]
    NotImplemented(Origin),

    #[error("precondition violated: {0}")]
    PreconditionViolated(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("{0} failed to start: {1}")]
    StartupFailed(&'static str, String),

    #[error("{0} is already running")]
    AlreadyRunning(&'static str),

    #[error("invalid configuration: {0}")]
    Config(String),
}
