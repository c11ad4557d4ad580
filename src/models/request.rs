// Training request data models
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Immutable description of what to train. Hyperparameters are passed
/// through to the model adapter untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingRequest {
    pub model_kind: String,
    pub dataset: String,
    #[serde(default)]
    pub hyperparameters: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub dataset_options: DatasetOptions,
    #[serde(default)]
    pub publish: bool,
}

impl TrainingRequest {
    pub fn new(model_kind: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            model_kind: model_kind.into(),
            dataset: dataset.into(),
            hyperparameters: HashMap::new(),
            dataset_options: DatasetOptions::default(),
            publish: false,
        }
    }
}

/// Per-request knobs for dataset resolution. Source-specific fields are
/// ignored by sources they do not apply to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetOptions {
    pub target_column: Option<String>,
    pub feature_columns: Option<Vec<String>>,
    /// Fraction of rows held out for validation, in [0, 1). Defaults to 0.2.
    pub validation_split: Option<f64>,
    pub n_samples: Option<usize>,
    pub n_features: Option<usize>,
    pub noise: Option<f64>,
    pub seed: Option<u64>,
}
