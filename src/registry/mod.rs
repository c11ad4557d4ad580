// Job registry: the single authoritative store of job records.
//
// The storage interface is a trait so a durable backend can replace the
// in-memory store without touching the scheduler or executor. The shipped
// implementation keeps records for the process lifetime only; everything
// is lost on restart.

pub mod memory;

use crate::error::Result;
use crate::models::{
    Job, JobFailure, JobState, JobWarning, PipelineStage, TrainingOutcome, TrainingRequest,
};
use serde::{Deserialize, Serialize};

pub use memory::InMemoryJobRegistry;

/// Atomic mutations applied to a job record. Every variant is validated
/// against the state machine before any field changes, so readers never
/// observe a half-applied update.
#[derive(Debug, Clone)]
pub enum JobUpdate {
    /// Pending -> Running; stamps `started_at`.
    Started,
    /// Forward motion within a running job. Stage regressions are ignored.
    Progress {
        stage: PipelineStage,
        message: Option<String>,
    },
    /// Non-fatal problem attached to a live job.
    Warning(JobWarning),
    /// Running -> Completed; stores the result and stamps `finished_at`.
    Completed(TrainingOutcome),
    /// Pending/Running -> Failed; stores the error and stamps `finished_at`.
    Failed(JobFailure),
    /// Pending/Running -> Cancelled; stamps `finished_at`.
    Cancelled,
}

/// Aggregate per-state counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

pub trait JobRegistry: Send + Sync {
    /// Allocates a fresh id and stores a new PENDING record.
    fn create(&self, request: TrainingRequest) -> Job;

    /// Consistent snapshot of one job.
    fn get(&self, id: &str) -> Result<Job>;

    /// Applies one mutation atomically; returns the updated snapshot.
    fn apply(&self, id: &str, update: JobUpdate) -> Result<Job>;

    /// Point-in-time snapshot, newest first, optionally filtered by state.
    fn list(&self, filter: Option<JobState>) -> Vec<Job>;

    fn stats(&self) -> RegistryStats;
}
