// Regression metric helpers
//
// All functions assume `y_true` and `y_pred` have equal, non-zero length;
// callers validate shapes before evaluating.

use std::collections::HashMap;

pub fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let n = y_true.len() as f64;
    y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p) * (t - p))
        .sum::<f64>()
        / n
}

pub fn root_mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    mean_squared_error(y_true, y_pred).sqrt()
}

pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let n = y_true.len() as f64;
    y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / n
}

/// Coefficient of determination. Returns 0.0 for a constant target, where
/// the usual definition divides by zero.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean) * (t - mean)).sum();
    if ss_tot == 0.0 {
        return 0.0;
    }
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p) * (t - p))
        .sum();
    1.0 - ss_res / ss_tot
}

/// Standard regression metric set, keys prefixed with e.g. "train" or "val".
pub fn regression_metrics(prefix: &str, y_true: &[f64], y_pred: &[f64]) -> HashMap<String, f64> {
    let mut out = HashMap::new();
    out.insert(
        format!("{}_mse", prefix),
        mean_squared_error(y_true, y_pred),
    );
    out.insert(
        format!("{}_rmse", prefix),
        root_mean_squared_error(y_true, y_pred),
    );
    out.insert(
        format!("{}_mae", prefix),
        mean_absolute_error(y_true, y_pred),
    );
    out.insert(format!("{}_r2", prefix), r2_score(y_true, y_pred));
    out
}
