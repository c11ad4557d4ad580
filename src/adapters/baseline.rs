// Mean-predicting baseline model

use super::{Dataset, FittedModel, ModelTrainer};
use crate::error::{EngineError, Result};
use serde_json::json;
use std::collections::HashMap;

/// Predicts the training-label mean for every input. Useful as a sanity
/// floor when comparing real model kinds. Takes no hyperparameters.
pub struct MeanBaselineTrainer;

impl ModelTrainer for MeanBaselineTrainer {
    fn kind(&self) -> &'static str {
        "mean_baseline"
    }

    fn fit(
        &self,
        train: &Dataset,
        _hyperparameters: &HashMap<String, serde_json::Value>,
    ) -> Result<Box<dyn FittedModel>> {
        if train.is_empty() {
            return Err(EngineError::Training(
                "cannot fit baseline on an empty dataset".to_string(),
            ));
        }
        let mean = train.labels.iter().sum::<f64>() / train.labels.len() as f64;
        Ok(Box::new(MeanModel { mean }))
    }
}

pub struct MeanModel {
    pub mean: f64,
}

impl FittedModel for MeanModel {
    fn kind(&self) -> &'static str {
        "mean_baseline"
    }

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>> {
        Ok(vec![self.mean; features.len()])
    }

    fn serialize(&self) -> Result<serde_json::Value> {
        Ok(json!({ "mean": self.mean }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicts_label_mean() {
        let train = Dataset {
            features: vec![vec![1.0], vec![2.0], vec![3.0]],
            labels: vec![10.0, 20.0, 30.0],
        };
        let model = MeanBaselineTrainer.fit(&train, &HashMap::new()).unwrap();
        let preds = model.predict(&[vec![99.0], vec![-4.0]]).unwrap();
        assert_eq!(preds, vec![20.0, 20.0]);
    }

    #[test]
    fn test_empty_dataset_rejected() {
        let train = Dataset {
            features: vec![],
            labels: vec![],
        };
        assert!(matches!(
            MeanBaselineTrainer.fit(&train, &HashMap::new()),
            Err(EngineError::Training(_))
        ));
    }
}
