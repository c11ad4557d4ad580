// Job scheduler: accepts training requests, creates registry entries, and
// dispatches one execution unit per accepted job. The submission path never
// waits on training; callers poll the registry through this facade.

use crate::adapters::{DatasetResolver, ModelCatalog};
use crate::artifacts::ArtifactStore;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::models::{FailureKind, Job, JobFailure, JobState, TrainingRequest};
use crate::pipeline::{self, Deadline, PipelineContext};
use crate::registry::{InMemoryJobRegistry, JobUpdate, RegistryStats};
use crate::tracking::{ArtifactHub, LogHub, LogTracker, MetricsTracker};
use log::{debug, error, info};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

struct JobHandle {
    cancel: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// Orchestrates the lifecycle of training jobs. Submissions beyond the
/// configured concurrency limit are rejected with `Overloaded` rather than
/// queued, so the caller always learns its fate immediately.
///
/// Must be used from within a tokio runtime; each accepted job runs the
/// pipeline on the blocking pool via its own spawned task.
pub struct TrainingScheduler {
    config: EngineConfig,
    ctx: PipelineContext,
    handles: Arc<Mutex<HashMap<String, JobHandle>>>,
}

impl TrainingScheduler {
    /// Scheduler with the built-in model kinds, dataset sources, and
    /// logging publish collaborators.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_adapters(
            config,
            ModelCatalog::builtin(),
            DatasetResolver::builtin(),
            Arc::new(LogTracker),
            Arc::new(LogHub),
        )
    }

    pub fn with_adapters(
        config: EngineConfig,
        models: ModelCatalog,
        datasets: DatasetResolver,
        tracker: Arc<dyn MetricsTracker>,
        hub: Arc<dyn ArtifactHub>,
    ) -> Self {
        let ctx = PipelineContext {
            registry: Arc::new(InMemoryJobRegistry::new()),
            models: Arc::new(models),
            datasets: Arc::new(datasets),
            artifacts: Arc::new(ArtifactStore::new(config.artifacts_dir.clone())),
            tracker,
            hub,
        };
        Self::from_context(config, ctx)
    }

    /// Full dependency injection, including a replacement registry backend.
    pub fn from_context(config: EngineConfig, ctx: PipelineContext) -> Self {
        Self {
            config,
            ctx,
            handles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Accepts a request, creates a PENDING job, and dispatches its
    /// executor. Returns the job id without waiting for any stage to run.
    pub fn submit(&self, request: TrainingRequest) -> Result<String> {
        validate_request(&request)?;

        // Admission and dispatch stay under one lock so concurrent
        // submissions cannot overshoot the limit.
        let mut handles = self.handles.lock();
        handles.retain(|_, handle| !handle.task.is_finished());
        if handles.len() >= self.config.max_concurrent_jobs {
            return Err(EngineError::Overloaded {
                active: handles.len(),
                limit: self.config.max_concurrent_jobs,
            });
        }

        let job = self.ctx.registry.create(request);
        let job_id = job.id.clone();
        info!(
            "Submitted job {} ({} on {})",
            job_id, job.request.model_kind, job.request.dataset
        );

        let cancel = Arc::new(AtomicBool::new(false));
        let deadline = self.config.job_timeout_secs.map(|secs| Deadline {
            at: Instant::now() + Duration::from_secs(secs),
            budget_secs: secs,
        });

        let ctx = self.ctx.clone();
        let ctx_outer = self.ctx.clone();
        let handles_outer = self.handles.clone();
        let cancel_worker = cancel.clone();
        let id_worker = job_id.clone();
        let id_outer = job_id.clone();
        let request_worker = job.request;

        let task = tokio::spawn(async move {
            let run = tokio::task::spawn_blocking(move || {
                pipeline::run_job(&ctx, &id_worker, &request_worker, &cancel_worker, deadline);
            });
            // run_job records its own outcome; only a panicked worker
            // reaches the error arm.
            if let Err(err) = run.await {
                error!("job {}: training worker aborted: {}", id_outer, err);
                let _ = ctx_outer.registry.apply(
                    &id_outer,
                    JobUpdate::Failed(JobFailure {
                        kind: FailureKind::TrainingError,
                        stage: None,
                        message: format!("training worker aborted: {}", err),
                    }),
                );
            }
            handles_outer.lock().remove(&id_outer);
        });

        handles.insert(job_id.clone(), JobHandle { cancel, task });
        Ok(job_id)
    }

    /// Requests cooperative cancellation. The executor honors the request
    /// at its next stage boundary. Cancelling a terminal job is a no-op.
    pub fn cancel(&self, job_id: &str) -> Result<()> {
        let job = self.ctx.registry.get(job_id)?;
        if job.state.is_terminal() {
            debug!("cancel of job {} ignored: already {:?}", job_id, job.state);
            return Ok(());
        }
        if let Some(handle) = self.handles.lock().get(job_id) {
            handle.cancel.store(true, Ordering::SeqCst);
            info!("Requested cancellation of job {}", job_id);
        }
        Ok(())
    }

    pub fn get_status(&self, job_id: &str) -> Result<Job> {
        self.ctx.registry.get(job_id)
    }

    pub fn list_jobs(&self, filter: Option<JobState>) -> Vec<Job> {
        self.ctx.registry.list(filter)
    }

    pub fn get_stats(&self) -> RegistryStats {
        self.ctx.registry.stats()
    }

    /// Registered model kinds, for request validation at the edge.
    pub fn model_kinds(&self) -> Vec<String> {
        self.ctx.models.kinds()
    }

    /// Awaits every in-flight job. After this returns, all accepted jobs
    /// are in a terminal state.
    pub async fn shutdown(&self) {
        let drained: Vec<(String, JobHandle)> = {
            let mut handles = self.handles.lock();
            handles.drain().collect()
        };
        for (job_id, handle) in drained {
            if let Err(err) = handle.task.await {
                error!("job {}: worker task lost during shutdown: {}", job_id, err);
            }
        }
    }
}

fn validate_request(request: &TrainingRequest) -> Result<()> {
    if request.model_kind.trim().is_empty() {
        return Err(EngineError::InvalidRequest(
            "model_kind must not be empty".to_string(),
        ));
    }
    if request.dataset.trim().is_empty() {
        return Err(EngineError::InvalidRequest(
            "dataset reference must not be empty".to_string(),
        ));
    }
    if let Some(split) = request.dataset_options.validation_split {
        if !(0.0..1.0).contains(&split) {
            return Err(EngineError::InvalidRequest(format!(
                "validation_split must be in [0, 1), got {}",
                split
            )));
        }
    }
    Ok(())
}
