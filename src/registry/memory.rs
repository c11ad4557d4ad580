// In-memory job store

use super::{JobRegistry, JobUpdate, RegistryStats};
use crate::error::{EngineError, Result};
use crate::models::{Job, JobProgress, JobState, TrainingRequest};
use chrono::Utc;
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Process-lifetime job store guarded by a single RwLock: status polls take
/// read locks, the scheduler and executors take the write lock per mutation.
#[derive(Default)]
pub struct InMemoryJobRegistry {
    jobs: RwLock<HashMap<String, Job>>,
}

impl InMemoryJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

fn transition(job: &mut Job, next: JobState) -> Result<()> {
    if !job.state.can_transition_to(next) {
        return Err(EngineError::InvalidTransition {
            from: job.state,
            to: next,
        });
    }
    job.state = next;
    if next.is_terminal() && job.finished_at.is_none() {
        job.finished_at = Some(Utc::now());
    }
    Ok(())
}

impl JobRegistry for InMemoryJobRegistry {
    fn create(&self, request: TrainingRequest) -> Job {
        let id = uuid::Uuid::new_v4().to_string();
        let job = Job::new(id.clone(), request);
        self.jobs.write().insert(id.clone(), job.clone());
        debug!("Created job {} ({})", id, job.request.model_kind);
        job
    }

    fn get(&self, id: &str) -> Result<Job> {
        self.jobs
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }

    fn apply(&self, id: &str, update: JobUpdate) -> Result<Job> {
        let mut jobs = self.jobs.write();
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;

        match update {
            JobUpdate::Started => {
                transition(job, JobState::Running)?;
                job.started_at = Some(Utc::now());
                job.push_log("Job started");
            }
            JobUpdate::Progress { stage, message } => {
                if job.state != JobState::Running {
                    return Err(EngineError::InvalidTransition {
                        from: job.state,
                        to: JobState::Running,
                    });
                }
                // Single-writer invariant makes regressions a bug; keep
                // progress monotonic regardless.
                let advancing = job.progress.as_ref().map_or(true, |p| stage >= p.stage);
                if advancing {
                    job.progress = Some(JobProgress {
                        stage,
                        percent: stage.percent(),
                        message: message.clone(),
                        updated_at: Utc::now(),
                    });
                }
                job.push_log(message.unwrap_or_else(|| format!("Stage: {}", stage.label())));
            }
            JobUpdate::Warning(warning) => {
                if job.state.is_terminal() {
                    return Err(EngineError::InvalidTransition {
                        from: job.state,
                        to: job.state,
                    });
                }
                job.push_log(format!(
                    "Warning at {}: {}",
                    warning.stage.label(),
                    warning.message
                ));
                job.warnings.push(warning);
            }
            JobUpdate::Completed(outcome) => {
                transition(job, JobState::Completed)?;
                if let Some(progress) = job.progress.as_mut() {
                    progress.percent = 100;
                    progress.updated_at = Utc::now();
                }
                job.result = Some(outcome);
                job.push_log("Job completed");
            }
            JobUpdate::Failed(failure) => {
                transition(job, JobState::Failed)?;
                job.push_log(format!("Job failed: {}", failure.message));
                job.error = Some(failure);
            }
            JobUpdate::Cancelled => {
                transition(job, JobState::Cancelled)?;
                job.push_log("Job cancelled");
            }
        }

        Ok(job.clone())
    }

    fn list(&self, filter: Option<JobState>) -> Vec<Job> {
        let jobs = self.jobs.read();
        let mut out: Vec<Job> = jobs
            .values()
            .filter(|job| filter.map_or(true, |state| job.state == state))
            .cloned()
            .collect();
        // Newest first; id as a deterministic tie-break.
        out.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        out
    }

    fn stats(&self) -> RegistryStats {
        let jobs = self.jobs.read();
        let mut stats = RegistryStats {
            total: jobs.len(),
            ..Default::default()
        };
        for job in jobs.values() {
            match job.state {
                JobState::Pending => stats.pending += 1,
                JobState::Running => stats.running += 1,
                JobState::Completed => stats.completed += 1,
                JobState::Failed => stats.failed += 1,
                JobState::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }
}
