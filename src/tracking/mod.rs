// Experiment-tracking and artifact-hub collaborators. Both are best-effort
// from the pipeline's point of view: a failure here never fails the job.

use crate::artifacts::StoredArtifact;
use crate::error::{EngineError, Result};
use log::info;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Records training metrics with an external tracking system.
pub trait MetricsTracker: Send + Sync {
    fn record_metrics(&self, job_id: &str, metrics: &HashMap<String, f64>) -> Result<()>;
}

/// Uploads a fitted artifact to an external hub; returns the hub reference.
pub trait ArtifactHub: Send + Sync {
    fn upload_artifact(&self, job_id: &str, artifact: &StoredArtifact) -> Result<String>;
}

/// Default tracker: logs the metrics and succeeds.
pub struct LogTracker;

impl MetricsTracker for LogTracker {
    fn record_metrics(&self, job_id: &str, metrics: &HashMap<String, f64>) -> Result<()> {
        let mut keys: Vec<&String> = metrics.keys().collect();
        keys.sort();
        info!("job {}: recorded {} metrics ({:?})", job_id, metrics.len(), keys);
        Ok(())
    }
}

/// Default hub: logs the upload and hands back a local reference.
pub struct LogHub;

impl ArtifactHub for LogHub {
    fn upload_artifact(&self, job_id: &str, artifact: &StoredArtifact) -> Result<String> {
        info!("job {}: published artifact {}", job_id, artifact.artifact_id);
        Ok(format!("local://{}", artifact.artifact_id))
    }
}

/// Test double that remembers every call.
#[derive(Default)]
pub struct RecordingTracker {
    pub records: Mutex<Vec<(String, HashMap<String, f64>)>>,
}

impl MetricsTracker for RecordingTracker {
    fn record_metrics(&self, job_id: &str, metrics: &HashMap<String, f64>) -> Result<()> {
        self.records
            .lock()
            .push((job_id.to_string(), metrics.clone()));
        Ok(())
    }
}

/// Test double that fails every call.
pub struct FailingTracker;

impl MetricsTracker for FailingTracker {
    fn record_metrics(&self, _job_id: &str, _metrics: &HashMap<String, f64>) -> Result<()> {
        Err(EngineError::Publish(
            "tracking backend unavailable".to_string(),
        ))
    }
}

/// Test double that remembers uploads.
#[derive(Default)]
pub struct RecordingHub {
    pub uploads: Mutex<Vec<(String, String)>>,
}

impl ArtifactHub for RecordingHub {
    fn upload_artifact(&self, job_id: &str, artifact: &StoredArtifact) -> Result<String> {
        self.uploads
            .lock()
            .push((job_id.to_string(), artifact.artifact_id.clone()));
        Ok(format!("hub://{}", artifact.artifact_id))
    }
}

/// Test double that fails every upload.
pub struct FailingHub;

impl ArtifactHub for FailingHub {
    fn upload_artifact(&self, _job_id: &str, _artifact: &StoredArtifact) -> Result<String> {
        Err(EngineError::Publish("hub rejected the upload".to_string()))
    }
}
