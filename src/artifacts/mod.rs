// Local model artifact persistence

use crate::error::Result;
use chrono::{DateTime, Utc};
use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// One persisted model, written as a single JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub artifact_id: String,
    pub job_id: String,
    pub model_kind: String,
    pub created_at: DateTime<Utc>,
    pub model: serde_json::Value,
}

/// Reference to a stored artifact, carried in the job result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredArtifact {
    pub artifact_id: String,
    pub path: String,
}

/// Writes model artifacts under a single directory. Writes are atomic
/// (temp file + rename) and serialized by an internal lock so two jobs
/// finishing at once cannot interleave directory setup.
pub struct ArtifactStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save(
        &self,
        job_id: &str,
        model_kind: &str,
        model: serde_json::Value,
    ) -> Result<StoredArtifact> {
        let _lock = self.write_lock.lock();

        fs::create_dir_all(&self.dir)?;

        let artifact_id = format!("{}-{}", model_kind, &job_id[..job_id.len().min(8)]);
        let record = ArtifactRecord {
            artifact_id: artifact_id.clone(),
            job_id: job_id.to_string(),
            model_kind: model_kind.to_string(),
            created_at: Utc::now(),
            model,
        };

        let path = self.dir.join(format!("{}.json", job_id));
        let temp_path = path.with_extension("tmp");

        let json_string = serde_json::to_string_pretty(&record)?;
        let mut temp_file = File::create(&temp_path)?;
        temp_file.write_all(json_string.as_bytes())?;
        temp_file.sync_all()?;
        fs::rename(&temp_path, &path)?;

        debug!("Saved artifact {} to {:?}", artifact_id, path);

        Ok(StoredArtifact {
            artifact_id,
            path: path.to_string_lossy().to_string(),
        })
    }

    pub fn load(&self, path: &Path) -> Result<ArtifactRecord> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        let stored = store
            .save(
                "0a1b2c3d-ffff-4e5f-8888-123456789abc",
                "linear_regression",
                json!({"weights": [1.0, 2.0], "intercept": 0.5}),
            )
            .unwrap();

        assert_eq!(stored.artifact_id, "linear_regression-0a1b2c3d");
        let record = store.load(Path::new(&stored.path)).unwrap();
        assert_eq!(record.model_kind, "linear_regression");
        assert_eq!(record.model["weights"][1], json!(2.0));
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.save("job-1", "mean_baseline", json!({"mean": 3.0})).unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = ArtifactStore::new(&nested);
        store.save("job-2", "mean_baseline", json!({"mean": 1.0})).unwrap();
        assert!(nested.join("job-2.json").exists());
    }
}
