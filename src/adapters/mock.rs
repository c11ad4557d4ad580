// In-memory test doubles for the capability adapters. Used by the crate's
// own tests; exported so downstream integration tests can script pipeline
// behavior without real data or models.

use super::{split_dataset, Dataset, DatasetSource, FittedModel, ModelTrainer, ResolvedData};
use crate::error::{EngineError, Result};
use crate::models::DatasetOptions;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Scriptable trainer: records fit calls, can sleep to simulate long
/// training, can fail on demand.
pub struct MockTrainer {
    kind: &'static str,
    delay: Option<Duration>,
    fail_with: Option<String>,
    fit_calls: AtomicUsize,
}

impl MockTrainer {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            delay: None,
            fail_with: None,
            fit_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(kind: &'static str, message: impl Into<String>) -> Self {
        let mut trainer = Self::new(kind);
        trainer.fail_with = Some(message.into());
        trainer
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fit_calls(&self) -> usize {
        self.fit_calls.load(Ordering::SeqCst)
    }
}

impl ModelTrainer for MockTrainer {
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn fit(
        &self,
        train: &Dataset,
        _hyperparameters: &HashMap<String, serde_json::Value>,
    ) -> Result<Box<dyn FittedModel>> {
        self.fit_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if let Some(message) = &self.fail_with {
            return Err(EngineError::Training(message.clone()));
        }
        let value = train.labels.iter().sum::<f64>() / train.labels.len().max(1) as f64;
        Ok(Box::new(MockModel { value }))
    }
}

pub struct MockModel {
    pub value: f64,
}

impl FittedModel for MockModel {
    fn kind(&self) -> &'static str {
        "mock"
    }

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>> {
        Ok(vec![self.value; features.len()])
    }

    fn serialize(&self) -> Result<serde_json::Value> {
        Ok(json!({ "value": self.value }))
    }
}

/// Scriptable dataset source for a fixed reference name. Generates rows
/// where the label is the feature sum, so a linear fit is exact.
pub struct MockDatasetSource {
    reference: &'static str,
    rows: usize,
    n_features: usize,
    delay: Option<Duration>,
    fail_with: Option<String>,
    resolve_calls: AtomicUsize,
}

impl MockDatasetSource {
    pub fn new(reference: &'static str) -> Self {
        Self {
            reference,
            rows: 100,
            n_features: 3,
            delay: None,
            fail_with: None,
            resolve_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(reference: &'static str, message: impl Into<String>) -> Self {
        let mut source = Self::new(reference);
        source.fail_with = Some(message.into());
        source
    }

    pub fn with_shape(mut self, rows: usize, n_features: usize) -> Self {
        self.rows = rows;
        self.n_features = n_features;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }
}

impl DatasetSource for MockDatasetSource {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn can_resolve(&self, reference: &str) -> bool {
        reference == self.reference
    }

    fn resolve(&self, _reference: &str, options: &DatasetOptions) -> Result<ResolvedData> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if let Some(message) = &self.fail_with {
            return Err(EngineError::Data(message.clone()));
        }

        let features: Vec<Vec<f64>> = (0..self.rows)
            .map(|i| {
                (0..self.n_features)
                    .map(|j| (i * self.n_features + j) as f64 * 0.01)
                    .collect()
            })
            .collect();
        let labels: Vec<f64> = features.iter().map(|row| row.iter().sum()).collect();
        split_dataset(features, labels, options)
    }
}
