// Capability adapters: uniform interfaces over model algorithms and
// dataset sources, plus the catalogs that resolve kind names to them.

pub mod baseline;
pub mod dataset;
pub mod linear;
pub mod mock;

use crate::error::{EngineError, Result};
use crate::models::DatasetOptions;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::Arc;

pub use baseline::MeanBaselineTrainer;
pub use dataset::{CsvFileSource, SampleSource};
pub use linear::LinearRegressionTrainer;

pub const DEFAULT_VALIDATION_SPLIT: f64 = 0.2;
pub const DEFAULT_SEED: u64 = 42;

/// Row-major feature matrix with one label per row.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<f64>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.features.first().map_or(0, |row| row.len())
    }
}

/// Output of dataset resolution: a training set and an optional held-out
/// validation set.
#[derive(Debug, Clone)]
pub struct ResolvedData {
    pub train: Dataset,
    pub validation: Option<Dataset>,
}

/// A trained model: predictions plus a JSON-serializable artifact payload.
pub trait FittedModel: Send + Sync {
    fn kind(&self) -> &'static str;
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>>;
    fn serialize(&self) -> Result<serde_json::Value>;
}

/// A trainable algorithm family, registered under a kind name.
pub trait ModelTrainer: Send + Sync {
    fn kind(&self) -> &'static str;
    fn fit(
        &self,
        train: &Dataset,
        hyperparameters: &HashMap<String, serde_json::Value>,
    ) -> Result<Box<dyn FittedModel>>;
}

/// A dataset source, matched against the request's dataset reference.
pub trait DatasetSource: Send + Sync {
    fn name(&self) -> &'static str;
    fn can_resolve(&self, reference: &str) -> bool;
    fn resolve(&self, reference: &str, options: &DatasetOptions) -> Result<ResolvedData>;
}

/// Explicit kind-name -> trainer mapping, built once at initialization and
/// handed to the scheduler as a dependency.
#[derive(Default)]
pub struct ModelCatalog {
    trainers: HashMap<String, Arc<dyn ModelTrainer>>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the built-in model kinds registered.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register(Arc::new(LinearRegressionTrainer));
        catalog.register(Arc::new(MeanBaselineTrainer));
        catalog
    }

    pub fn register(&mut self, trainer: Arc<dyn ModelTrainer>) {
        self.trainers.insert(trainer.kind().to_string(), trainer);
    }

    pub fn resolve(&self, kind: &str) -> Result<Arc<dyn ModelTrainer>> {
        self.trainers
            .get(kind)
            .cloned()
            .ok_or_else(|| EngineError::UnknownModelKind(kind.to_string()))
    }

    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.trainers.keys().cloned().collect();
        kinds.sort();
        kinds
    }
}

/// Ordered list of dataset sources; the first source that recognizes the
/// reference form wins.
#[derive(Default)]
pub struct DatasetResolver {
    sources: Vec<Arc<dyn DatasetSource>>,
}

impl DatasetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver with the built-in source forms registered.
    pub fn builtin() -> Self {
        let mut resolver = Self::new();
        resolver.register(Arc::new(SampleSource));
        resolver.register(Arc::new(CsvFileSource));
        resolver
    }

    pub fn register(&mut self, source: Arc<dyn DatasetSource>) {
        self.sources.push(source);
    }

    pub fn resolve(&self, reference: &str, options: &DatasetOptions) -> Result<ResolvedData> {
        let source = self
            .sources
            .iter()
            .find(|s| s.can_resolve(reference))
            .ok_or_else(|| {
                EngineError::Data(format!("unresolvable dataset reference '{}'", reference))
            })?;
        source.resolve(reference, options)
    }
}

/// Shuffles rows with a seeded RNG and holds out `validation_split` of them.
/// Returns no validation set when the split would be empty.
pub fn split_dataset(
    features: Vec<Vec<f64>>,
    labels: Vec<f64>,
    options: &DatasetOptions,
) -> Result<ResolvedData> {
    if labels.is_empty() {
        return Err(EngineError::Data("dataset has no rows".to_string()));
    }

    let split = options
        .validation_split
        .unwrap_or(DEFAULT_VALIDATION_SPLIT);
    if !(0.0..1.0).contains(&split) {
        return Err(EngineError::Data(format!(
            "validation_split must be in [0, 1), got {}",
            split
        )));
    }

    let mut indices: Vec<usize> = (0..labels.len()).collect();
    let mut rng = StdRng::seed_from_u64(options.seed.unwrap_or(DEFAULT_SEED));
    indices.shuffle(&mut rng);

    let val_len = (labels.len() as f64 * split).round() as usize;
    let (val_idx, train_idx) = indices.split_at(val_len);

    if train_idx.is_empty() {
        return Err(EngineError::Data(
            "validation split leaves no training rows".to_string(),
        ));
    }

    let take = |idx: &[usize]| Dataset {
        features: idx.iter().map(|&i| features[i].clone()).collect(),
        labels: idx.iter().map(|&i| labels[i]).collect(),
    };

    let validation = if val_idx.is_empty() {
        None
    } else {
        Some(take(val_idx))
    };

    Ok(ResolvedData {
        train: take(train_idx),
        validation,
    })
}

// Hyperparameter accessors shared by the built-in trainers. A present key
// with the wrong JSON type is a training error, not a silent default.

pub(crate) fn param_bool(
    params: &HashMap<String, serde_json::Value>,
    key: &str,
    default: bool,
) -> Result<bool> {
    match params.get(key) {
        None => Ok(default),
        Some(value) => value.as_bool().ok_or_else(|| {
            EngineError::Training(format!("hyperparameter '{}' must be a boolean", key))
        }),
    }
}

pub(crate) fn param_f64(
    params: &HashMap<String, serde_json::Value>,
    key: &str,
    default: f64,
) -> Result<f64> {
    match params.get(key) {
        None => Ok(default),
        Some(value) => value.as_f64().ok_or_else(|| {
            EngineError::Training(format!("hyperparameter '{}' must be a number", key))
        }),
    }
}
