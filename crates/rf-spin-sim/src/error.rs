//! Error types for batch simulation

use rf_spin_core::SpinError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// Non-recoverable episode failure; aborts the batch
    #[error("Engine error: {0}")]
    Engine(#[from] SpinError),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SimError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub type SimResult<T> = Result<T, SimError>;
