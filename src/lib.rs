//! trainforge: an asynchronous training-job orchestration engine.
//!
//! Callers submit a [`TrainingRequest`] and get a job id back immediately;
//! a fixed pipeline (load data, build model, fit, evaluate, persist,
//! publish) runs on its own execution unit and records every observable
//! step in the job registry, which any number of observers may poll.
//!
//! Job records live in memory for the process lifetime only; restart loses
//! them. The [`registry::JobRegistry`] trait is the seam for swapping in a
//! durable store.

pub mod adapters;
pub mod artifacts;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod scheduler;
pub mod tracking;
mod utils;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use models::{
    DatasetOptions, FailureKind, Job, JobFailure, JobProgress, JobState, JobWarning,
    PipelineStage, TrainingOutcome, TrainingRequest,
};
pub use registry::{InMemoryJobRegistry, JobRegistry, JobUpdate, RegistryStats};
pub use scheduler::TrainingScheduler;
