// Linear regression via ridge-regularized normal equations

use super::{param_bool, param_f64, Dataset, FittedModel, ModelTrainer};
use crate::error::{EngineError, Result};
use serde_json::json;
use std::collections::HashMap;

const SINGULAR_EPS: f64 = 1e-12;

/// Ordinary least squares with an optional L2 penalty. Hyperparameters:
/// `fit_intercept` (bool, default true) and `l2_penalty` (number, default 0).
pub struct LinearRegressionTrainer;

impl ModelTrainer for LinearRegressionTrainer {
    fn kind(&self) -> &'static str {
        "linear_regression"
    }

    fn fit(
        &self,
        train: &Dataset,
        hyperparameters: &HashMap<String, serde_json::Value>,
    ) -> Result<Box<dyn FittedModel>> {
        let fit_intercept = param_bool(hyperparameters, "fit_intercept", true)?;
        let l2_penalty = param_f64(hyperparameters, "l2_penalty", 0.0)?;
        if l2_penalty < 0.0 {
            return Err(EngineError::Training(format!(
                "hyperparameter 'l2_penalty' must be non-negative, got {}",
                l2_penalty
            )));
        }

        let n_features = train.n_features();
        for row in &train.features {
            if row.len() != n_features {
                return Err(EngineError::Training(
                    "inconsistent feature width across rows".to_string(),
                ));
            }
        }

        // Columns of the design matrix: features, plus a trailing ones
        // column when fitting an intercept. The intercept column is not
        // penalized.
        let dim = n_features + usize::from(fit_intercept);
        if dim == 0 {
            return Err(EngineError::Training(
                "no features to fit and fit_intercept is false".to_string(),
            ));
        }

        let design = |row: &[f64], j: usize| -> f64 {
            if j < n_features {
                row[j]
            } else {
                1.0
            }
        };

        // Normal equations: (X'X + lambda*I) w = X'y
        let mut gram = vec![vec![0.0f64; dim]; dim];
        let mut rhs = vec![0.0f64; dim];
        for (row, &y) in train.features.iter().zip(&train.labels) {
            for i in 0..dim {
                let xi = design(row, i);
                rhs[i] += xi * y;
                for j in i..dim {
                    gram[i][j] += xi * design(row, j);
                }
            }
        }
        for i in 0..dim {
            for j in 0..i {
                gram[i][j] = gram[j][i];
            }
        }
        for (i, row) in gram.iter_mut().enumerate().take(n_features) {
            row[i] += l2_penalty;
        }

        let solution = solve(gram, rhs)?;

        let (weights, intercept) = if fit_intercept {
            (solution[..n_features].to_vec(), solution[n_features])
        } else {
            (solution, 0.0)
        };

        Ok(Box::new(LinearModel { weights, intercept }))
    }
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot_row][col].abs() < SINGULAR_EPS {
            return Err(EngineError::Training(
                "design matrix is singular; add l2_penalty or drop collinear features"
                    .to_string(),
            ));
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0f64; n];
    for row in (0..n).rev() {
        let mut acc = b[row];
        for col in (row + 1)..n {
            acc -= a[row][col] * x[col];
        }
        x[row] = acc / a[row][row];
    }
    Ok(x)
}

pub struct LinearModel {
    pub weights: Vec<f64>,
    pub intercept: f64,
}

impl FittedModel for LinearModel {
    fn kind(&self) -> &'static str {
        "linear_regression"
    }

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>> {
        features
            .iter()
            .map(|row| {
                if row.len() != self.weights.len() {
                    return Err(EngineError::Training(format!(
                        "expected {} features, got {}",
                        self.weights.len(),
                        row.len()
                    )));
                }
                Ok(row
                    .iter()
                    .zip(&self.weights)
                    .map(|(x, w)| x * w)
                    .sum::<f64>()
                    + self.intercept)
            })
            .collect()
    }

    fn serialize(&self) -> Result<serde_json::Value> {
        Ok(json!({
            "weights": self.weights,
            "intercept": self.intercept,
        }))
    }
}
