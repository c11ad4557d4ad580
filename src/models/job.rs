// Job data models
use crate::models::TrainingRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type JobId = String;

/// Upper bound on the per-job log trail so long-lived processes
/// cannot grow a job record without limit.
pub const MAX_LOG_ENTRIES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }

    /// Forward-only state machine. Terminal states have no outgoing edges;
    /// a pending job may fail or be cancelled without ever running.
    pub fn can_transition_to(self, next: JobState) -> bool {
        match self {
            JobState::Pending => matches!(
                next,
                JobState::Running | JobState::Failed | JobState::Cancelled
            ),
            JobState::Running => matches!(
                next,
                JobState::Completed | JobState::Failed | JobState::Cancelled
            ),
            JobState::Completed | JobState::Failed | JobState::Cancelled => false,
        }
    }
}

/// Fixed stage sequence of the training pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    LoadData,
    BuildModel,
    Fit,
    Evaluate,
    Persist,
    Publish,
}

impl PipelineStage {
    pub fn label(self) -> &'static str {
        match self {
            PipelineStage::LoadData => "load_data",
            PipelineStage::BuildModel => "build_model",
            PipelineStage::Fit => "fit",
            PipelineStage::Evaluate => "evaluate",
            PipelineStage::Persist => "persist",
            PipelineStage::Publish => "publish",
        }
    }

    /// Progress waypoint reported when the stage begins.
    pub fn percent(self) -> u8 {
        match self {
            PipelineStage::LoadData => 10,
            PipelineStage::BuildModel => 30,
            PipelineStage::Fit => 40,
            PipelineStage::Evaluate => 80,
            PipelineStage::Persist => 90,
            PipelineStage::Publish => 95,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnknownModelKind,
    DataError,
    TrainingError,
    Timeout,
}

/// Structured terminal error for a failed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobFailure {
    pub kind: FailureKind,
    pub stage: Option<PipelineStage>,
    pub message: String,
}

/// Non-fatal publish problem attached to an otherwise completed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobWarning {
    pub stage: PipelineStage,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobLogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobProgress {
    pub stage: PipelineStage,
    pub percent: u8,
    pub message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a completed training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingOutcome {
    pub model_id: String,
    pub model_kind: String,
    pub artifact_path: String,
    pub metrics: HashMap<String, f64>,
    pub hub_reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub request: TrainingRequest,
    pub state: JobState,
    pub progress: Option<JobProgress>,
    pub result: Option<TrainingOutcome>,
    pub error: Option<JobFailure>,
    pub warnings: Vec<JobWarning>,
    pub logs: Vec<JobLogEntry>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(id: JobId, request: TrainingRequest) -> Self {
        Self {
            id,
            request,
            state: JobState::Pending,
            progress: None,
            result: None,
            error: None,
            warnings: Vec::new(),
            logs: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    pub(crate) fn push_log(&mut self, message: impl Into<String>) {
        if self.logs.len() >= MAX_LOG_ENTRIES {
            self.logs.remove(0);
        }
        self.logs.push(JobLogEntry {
            timestamp: Utc::now(),
            message: message.into(),
        });
    }
}
