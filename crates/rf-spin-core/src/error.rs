//! Error types for the spin engine

use thiserror::Error;

/// Engine error type
///
/// Ordinary gameplay outcomes (no win, no trigger, wincap reached) are never
/// errors. Each variant here aborts the episode it occurred in.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpinError {
    /// Malformed tables, missing reel sets, bad row counts
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Engine logic defect detected at runtime
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// A forced outcome cannot be produced from the supplied reels
    #[error("Sampling degenerate: {0}")]
    SamplingDegenerate(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SpinError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build an invariant violation, logging it on the way out
    pub fn invariant(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        log::error!("invariant violation: {msg}");
        Self::InvariantViolation(msg)
    }

    pub fn degenerate(msg: impl Into<String>) -> Self {
        Self::SamplingDegenerate(msg.into())
    }

    /// True if the orchestrator may resample and retry
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::SamplingDegenerate(_))
    }
}

impl From<serde_json::Error> for SpinError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yml::Error> for SpinError {
    fn from(err: serde_yml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias
pub type EngineResult<T> = Result<T, SpinError>;
