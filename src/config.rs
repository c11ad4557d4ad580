// Engine configuration
use crate::utils::get_artifacts_dir;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Live jobs (pending + running) admitted at once. Submissions beyond
    /// this are rejected with `Overloaded`, not queued.
    pub max_concurrent_jobs: usize,
    /// Optional wall-clock budget per job, checked at stage boundaries.
    pub job_timeout_secs: Option<u64>,
    /// Directory for locally persisted model artifacts.
    pub artifacts_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
            job_timeout_secs: None,
            artifacts_dir: get_artifacts_dir(),
        }
    }
}
