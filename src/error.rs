// Error taxonomy for the orchestration engine

use crate::models::JobState;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the engine, either synchronously from the submission
/// path or captured into a job's terminal error record by the executor.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("concurrency limit reached: {active} of {limit} job slots in use")]
    Overloaded { active: usize, limit: usize },

    #[error("job not found: {0}")]
    NotFound(String),

    #[error("invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition { from: JobState, to: JobState },

    #[error("unknown model kind: {0}")]
    UnknownModelKind(String),

    #[error("dataset error: {0}")]
    Data(String),

    #[error("training error: {0}")]
    Training(String),

    #[error("job exceeded its {0}s time budget")]
    Timeout(u64),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
