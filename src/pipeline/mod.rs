// Pipeline executor: runs the fixed stage sequence for one job and wires
// every observable step back into the registry. Runs on the blocking pool;
// exactly one executor owns a job for its whole run.

use crate::adapters::{DatasetResolver, FittedModel, ModelCatalog, ResolvedData};
use crate::artifacts::ArtifactStore;
use crate::error::EngineError;
use crate::metrics::regression_metrics;
use crate::models::{
    FailureKind, JobFailure, JobWarning, PipelineStage, TrainingOutcome, TrainingRequest,
};
use crate::registry::{JobRegistry, JobUpdate};
use crate::tracking::{ArtifactHub, MetricsTracker};
use log::{error, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Collaborators the executor needs for one run. Cheap to clone; every
/// field is shared.
#[derive(Clone)]
pub struct PipelineContext {
    pub registry: Arc<dyn JobRegistry>,
    pub models: Arc<ModelCatalog>,
    pub datasets: Arc<DatasetResolver>,
    pub artifacts: Arc<ArtifactStore>,
    pub tracker: Arc<dyn MetricsTracker>,
    pub hub: Arc<dyn ArtifactHub>,
}

/// Wall-clock budget, checked cooperatively at stage boundaries.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    pub at: Instant,
    pub budget_secs: u64,
}

/// Why a run stopped short of completion.
enum Halt {
    Failed(JobFailure),
    Cancelled,
}

impl Halt {
    fn fail(stage: PipelineStage, err: EngineError) -> Self {
        Halt::Failed(JobFailure {
            kind: failure_kind(&err),
            stage: Some(stage),
            message: err.to_string(),
        })
    }
}

fn failure_kind(err: &EngineError) -> FailureKind {
    match err {
        EngineError::UnknownModelKind(_) => FailureKind::UnknownModelKind,
        EngineError::Data(_) => FailureKind::DataError,
        EngineError::Timeout(_) => FailureKind::Timeout,
        _ => FailureKind::TrainingError,
    }
}

/// Executes the whole pipeline for one job, capturing any failure into the
/// job record. Never propagates errors to the caller: by the time this
/// runs, the submitter is long gone.
pub(crate) fn run_job(
    ctx: &PipelineContext,
    job_id: &str,
    request: &TrainingRequest,
    cancel: &AtomicBool,
    deadline: Option<Deadline>,
) {
    // Cancellation may land before the job ever starts.
    if cancel.load(Ordering::SeqCst) {
        apply_cancelled(ctx, job_id);
        return;
    }

    if let Err(err) = ctx.registry.apply(job_id, JobUpdate::Started) {
        error!("job {}: could not enter running state: {}", job_id, err);
        return;
    }
    info!("Starting training for job {}", job_id);

    match execute(ctx, job_id, request, cancel, deadline.as_ref()) {
        Ok(outcome) => {
            if let Err(err) = ctx.registry.apply(job_id, JobUpdate::Completed(outcome)) {
                error!("job {}: could not record completion: {}", job_id, err);
                return;
            }
            info!("Training completed for job {}", job_id);
        }
        Err(Halt::Cancelled) => apply_cancelled(ctx, job_id),
        Err(Halt::Failed(failure)) => {
            error!(
                "job {}: {} at {:?}: {}",
                job_id,
                match failure.kind {
                    FailureKind::Timeout => "timed out",
                    _ => "failed",
                },
                failure.stage,
                failure.message
            );
            if let Err(err) = ctx.registry.apply(job_id, JobUpdate::Failed(failure)) {
                error!("job {}: could not record failure: {}", job_id, err);
            }
        }
    }
}

fn execute(
    ctx: &PipelineContext,
    job_id: &str,
    request: &TrainingRequest,
    cancel: &AtomicBool,
    deadline: Option<&Deadline>,
) -> Result<TrainingOutcome, Halt> {
    // Stage 1: acquire dataset
    checkpoint(cancel, deadline, PipelineStage::LoadData)?;
    progress(
        ctx,
        job_id,
        PipelineStage::LoadData,
        format!("Loading dataset: {}", request.dataset),
    );
    let data = ctx
        .datasets
        .resolve(&request.dataset, &request.dataset_options)
        .map_err(|e| Halt::fail(PipelineStage::LoadData, e))?;
    if data.train.is_empty() {
        return Err(Halt::fail(
            PipelineStage::LoadData,
            EngineError::Data("resolved dataset has no training rows".to_string()),
        ));
    }

    // Stage 2: instantiate model
    checkpoint(cancel, deadline, PipelineStage::BuildModel)?;
    progress(
        ctx,
        job_id,
        PipelineStage::BuildModel,
        format!("Initializing {} model", request.model_kind),
    );
    let trainer = ctx
        .models
        .resolve(&request.model_kind)
        .map_err(|e| Halt::fail(PipelineStage::BuildModel, e))?;

    // Stage 3: fit
    checkpoint(cancel, deadline, PipelineStage::Fit)?;
    progress(
        ctx,
        job_id,
        PipelineStage::Fit,
        "Training model...".to_string(),
    );
    let fitted = trainer
        .fit(&data.train, &request.hyperparameters)
        .map_err(|e| Halt::fail(PipelineStage::Fit, e))?;

    // Stage 4: evaluate
    checkpoint(cancel, deadline, PipelineStage::Evaluate)?;
    progress(
        ctx,
        job_id,
        PipelineStage::Evaluate,
        "Evaluating model...".to_string(),
    );
    let metrics =
        evaluate(fitted.as_ref(), &data).map_err(|e| Halt::fail(PipelineStage::Evaluate, e))?;

    // Stage 5: persist the artifact locally
    checkpoint(cancel, deadline, PipelineStage::Persist)?;
    progress(
        ctx,
        job_id,
        PipelineStage::Persist,
        "Saving model artifacts...".to_string(),
    );
    let payload = fitted
        .serialize()
        .map_err(|e| Halt::fail(PipelineStage::Persist, e))?;
    let stored = ctx
        .artifacts
        .save(job_id, &request.model_kind, payload)
        .map_err(|e| Halt::fail(PipelineStage::Persist, e))?;

    // Stage 6: publish, best-effort. Training already succeeded; problems
    // here become warnings on a COMPLETED job, never a failure.
    let mut hub_reference = None;
    if request.publish {
        checkpoint(cancel, deadline, PipelineStage::Publish)?;
        progress(
            ctx,
            job_id,
            PipelineStage::Publish,
            "Publishing metrics and artifact...".to_string(),
        );
        if let Err(err) = ctx.tracker.record_metrics(job_id, &metrics) {
            warn!("job {}: metrics tracking failed: {}", job_id, err);
            warning(ctx, job_id, format!("metrics tracking failed: {}", err));
        }
        match ctx.hub.upload_artifact(job_id, &stored) {
            Ok(reference) => hub_reference = Some(reference),
            Err(err) => {
                warn!("job {}: artifact upload failed: {}", job_id, err);
                warning(ctx, job_id, format!("artifact upload failed: {}", err));
            }
        }
    }

    Ok(TrainingOutcome {
        model_id: stored.artifact_id,
        model_kind: request.model_kind.clone(),
        artifact_path: stored.path,
        metrics,
        hub_reference,
    })
}

fn evaluate(
    model: &dyn FittedModel,
    data: &ResolvedData,
) -> Result<HashMap<String, f64>, EngineError> {
    let train_pred = model.predict(&data.train.features)?;
    let mut metrics = regression_metrics("train", &data.train.labels, &train_pred);
    if let Some(val) = &data.validation {
        let val_pred = model.predict(&val.features)?;
        metrics.extend(regression_metrics("val", &val.labels, &val_pred));
    }
    Ok(metrics)
}

fn checkpoint(
    cancel: &AtomicBool,
    deadline: Option<&Deadline>,
    next_stage: PipelineStage,
) -> Result<(), Halt> {
    if cancel.load(Ordering::SeqCst) {
        return Err(Halt::Cancelled);
    }
    if let Some(deadline) = deadline {
        if Instant::now() >= deadline.at {
            return Err(Halt::Failed(JobFailure {
                kind: FailureKind::Timeout,
                stage: Some(next_stage),
                message: format!("job exceeded its {}s time budget", deadline.budget_secs),
            }));
        }
    }
    Ok(())
}

fn progress(ctx: &PipelineContext, job_id: &str, stage: PipelineStage, message: String) {
    if let Err(err) = ctx.registry.apply(
        job_id,
        JobUpdate::Progress {
            stage,
            message: Some(message),
        },
    ) {
        error!("job {}: progress update rejected: {}", job_id, err);
    }
}

fn warning(ctx: &PipelineContext, job_id: &str, message: String) {
    if let Err(err) = ctx.registry.apply(
        job_id,
        JobUpdate::Warning(JobWarning {
            stage: PipelineStage::Publish,
            message,
        }),
    ) {
        error!("job {}: warning update rejected: {}", job_id, err);
    }
}

fn apply_cancelled(ctx: &PipelineContext, job_id: &str) {
    match ctx.registry.apply(job_id, JobUpdate::Cancelled) {
        Ok(_) => info!("job {} cancelled", job_id),
        Err(err) => error!("job {}: could not record cancellation: {}", job_id, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockDatasetSource, MockTrainer};
    use crate::adapters::{DatasetResolver, ModelCatalog};
    use crate::models::{JobState, TrainingRequest};
    use crate::registry::InMemoryJobRegistry;
    use crate::tracking::{FailingHub, FailingTracker, RecordingHub, RecordingTracker};
    use std::time::Duration;

    struct Fixture {
        ctx: PipelineContext,
        _dir: tempfile::TempDir,
    }

    fn fixture(
        models: ModelCatalog,
        datasets: DatasetResolver,
        tracker: Arc<dyn MetricsTracker>,
        hub: Arc<dyn ArtifactHub>,
    ) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        Fixture {
            ctx: PipelineContext {
                registry: Arc::new(InMemoryJobRegistry::new()),
                models: Arc::new(models),
                datasets: Arc::new(datasets),
                artifacts: Arc::new(ArtifactStore::new(dir.path())),
                tracker,
                hub,
            },
            _dir: dir,
        }
    }

    fn mock_fixture() -> (Fixture, Arc<MockTrainer>, Arc<MockDatasetSource>) {
        let trainer = Arc::new(MockTrainer::new("mock"));
        let source = Arc::new(MockDatasetSource::new("mock"));
        let mut models = ModelCatalog::new();
        models.register(trainer.clone());
        let mut datasets = DatasetResolver::new();
        datasets.register(source.clone());
        let f = fixture(
            models,
            datasets,
            Arc::new(RecordingTracker::default()),
            Arc::new(RecordingHub::default()),
        );
        (f, trainer, source)
    }

    fn run(f: &Fixture, request: TrainingRequest) -> crate::models::Job {
        let job = f.ctx.registry.create(request);
        let cancel = AtomicBool::new(false);
        run_job(&f.ctx, &job.id, &job.request, &cancel, None);
        f.ctx.registry.get(&job.id).unwrap()
    }

    #[test]
    fn test_successful_run_completes_with_metrics() {
        let (f, _, _) = mock_fixture();
        let job = run(&f, TrainingRequest::new("mock", "mock"));

        assert_eq!(job.state, JobState::Completed);
        let result = job.result.unwrap();
        assert!(result.metrics.contains_key("train_rmse"));
        assert!(result.metrics.contains_key("val_rmse"));
        assert!(std::path::Path::new(&result.artifact_path).exists());
        assert!(job.error.is_none());
        assert!(job.finished_at.is_some());
    }

    #[test]
    fn test_data_error_fails_before_fit() {
        let trainer = Arc::new(MockTrainer::new("mock"));
        let mut models = ModelCatalog::new();
        models.register(trainer.clone());
        let mut datasets = DatasetResolver::new();
        datasets.register(Arc::new(MockDatasetSource::failing("mock", "unreachable")));
        let f = fixture(
            models,
            datasets,
            Arc::new(RecordingTracker::default()),
            Arc::new(RecordingHub::default()),
        );

        let job = run(&f, TrainingRequest::new("mock", "mock"));

        assert_eq!(job.state, JobState::Failed);
        let failure = job.error.unwrap();
        assert_eq!(failure.kind, FailureKind::DataError);
        assert_eq!(failure.stage, Some(PipelineStage::LoadData));
        assert_eq!(trainer.fit_calls(), 0);
    }

    #[test]
    fn test_unknown_model_kind_fails_at_build_stage() {
        let (f, _, _) = mock_fixture();
        let job = run(&f, TrainingRequest::new("does_not_exist", "mock"));

        assert_eq!(job.state, JobState::Failed);
        let failure = job.error.unwrap();
        assert_eq!(failure.kind, FailureKind::UnknownModelKind);
        assert_eq!(failure.stage, Some(PipelineStage::BuildModel));
    }

    #[test]
    fn test_training_failure_captured() {
        let mut models = ModelCatalog::new();
        models.register(Arc::new(MockTrainer::failing("mock", "diverged")));
        let mut datasets = DatasetResolver::new();
        datasets.register(Arc::new(MockDatasetSource::new("mock")));
        let f = fixture(
            models,
            datasets,
            Arc::new(RecordingTracker::default()),
            Arc::new(RecordingHub::default()),
        );

        let job = run(&f, TrainingRequest::new("mock", "mock"));
        let failure = job.error.unwrap();
        assert_eq!(failure.kind, FailureKind::TrainingError);
        assert_eq!(failure.stage, Some(PipelineStage::Fit));
        assert!(failure.message.contains("diverged"));
    }

    #[test]
    fn test_publish_failure_still_completes() {
        let mut models = ModelCatalog::new();
        models.register(Arc::new(MockTrainer::new("mock")));
        let mut datasets = DatasetResolver::new();
        datasets.register(Arc::new(MockDatasetSource::new("mock")));
        let f = fixture(
            models,
            datasets,
            Arc::new(FailingTracker),
            Arc::new(FailingHub),
        );

        let mut request = TrainingRequest::new("mock", "mock");
        request.publish = true;
        let job = run(&f, request);

        assert_eq!(job.state, JobState::Completed);
        let result = job.result.unwrap();
        assert!(!result.metrics.is_empty());
        assert!(result.hub_reference.is_none());
        assert_eq!(job.warnings.len(), 2);
        assert!(job.warnings.iter().all(|w| w.stage == PipelineStage::Publish));
    }

    #[test]
    fn test_publish_success_records_hub_reference() {
        let tracker = Arc::new(RecordingTracker::default());
        let hub = Arc::new(RecordingHub::default());
        let mut models = ModelCatalog::new();
        models.register(Arc::new(MockTrainer::new("mock")));
        let mut datasets = DatasetResolver::new();
        datasets.register(Arc::new(MockDatasetSource::new("mock")));
        let f = fixture(models, datasets, tracker.clone(), hub.clone());

        let mut request = TrainingRequest::new("mock", "mock");
        request.publish = true;
        let job = run(&f, request);

        assert_eq!(job.state, JobState::Completed);
        let result = job.result.unwrap();
        assert!(result.hub_reference.unwrap().starts_with("hub://"));
        assert_eq!(tracker.records.lock().len(), 1);
        assert_eq!(hub.uploads.lock().len(), 1);
        assert!(job.warnings.is_empty());
    }

    #[test]
    fn test_no_publish_stage_without_flag() {
        let tracker = Arc::new(RecordingTracker::default());
        let hub = Arc::new(RecordingHub::default());
        let mut models = ModelCatalog::new();
        models.register(Arc::new(MockTrainer::new("mock")));
        let mut datasets = DatasetResolver::new();
        datasets.register(Arc::new(MockDatasetSource::new("mock")));
        let f = fixture(models, datasets, tracker.clone(), hub.clone());

        let job = run(&f, TrainingRequest::new("mock", "mock"));
        assert_eq!(job.state, JobState::Completed);
        assert!(tracker.records.lock().is_empty());
        assert!(hub.uploads.lock().is_empty());
        assert!(job.result.unwrap().hub_reference.is_none());
    }

    #[test]
    fn test_pre_start_cancellation() {
        let (f, trainer, _) = mock_fixture();
        let job = f.ctx.registry.create(TrainingRequest::new("mock", "mock"));
        let cancel = AtomicBool::new(true);
        run_job(&f.ctx, &job.id, &job.request, &cancel, None);

        let job = f.ctx.registry.get(&job.id).unwrap();
        assert_eq!(job.state, JobState::Cancelled);
        assert_eq!(trainer.fit_calls(), 0);
    }

    #[test]
    fn test_expired_deadline_times_out() {
        let (f, trainer, _) = mock_fixture();
        let job = f.ctx.registry.create(TrainingRequest::new("mock", "mock"));
        let cancel = AtomicBool::new(false);
        let deadline = Deadline {
            at: Instant::now() - Duration::from_millis(1),
            budget_secs: 0,
        };
        run_job(&f.ctx, &job.id, &job.request, &cancel, Some(deadline));

        let job = f.ctx.registry.get(&job.id).unwrap();
        assert_eq!(job.state, JobState::Failed);
        let failure = job.error.unwrap();
        assert_eq!(failure.kind, FailureKind::Timeout);
        assert_eq!(trainer.fit_calls(), 0);
    }

    #[test]
    fn test_empty_dataset_is_a_data_error() {
        let mut models = ModelCatalog::new();
        models.register(Arc::new(MockTrainer::new("mock")));
        let mut datasets = DatasetResolver::new();
        datasets.register(Arc::new(MockDatasetSource::new("mock").with_shape(0, 3)));
        let f = fixture(
            models,
            datasets,
            Arc::new(RecordingTracker::default()),
            Arc::new(RecordingHub::default()),
        );

        let job = run(&f, TrainingRequest::new("mock", "mock"));
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error.unwrap().kind, FailureKind::DataError);
    }

    #[test]
    fn test_progress_reaches_persist_on_success() {
        let (f, _, _) = mock_fixture();
        let job = run(&f, TrainingRequest::new("mock", "mock"));
        let progress = job.progress.unwrap();
        assert_eq!(progress.stage, PipelineStage::Persist);
        assert_eq!(progress.percent, 100);
    }
}
