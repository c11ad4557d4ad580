// Built-in dataset sources: named synthetic sample and local CSV files

use super::{split_dataset, DatasetSource, ResolvedData, DEFAULT_SEED};
use crate::error::{EngineError, Result};
use crate::models::DatasetOptions;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::Path;

const SAMPLE_REFERENCE: &str = "sample";
const DEFAULT_SAMPLE_ROWS: usize = 1000;
const DEFAULT_SAMPLE_FEATURES: usize = 10;
const DEFAULT_SAMPLE_NOISE: f64 = 0.1;
const DEFAULT_TARGET_COLUMN: &str = "target";

/// Deterministic synthetic regression data for the `"sample"` reference:
/// a hidden linear relation with uniform noise, reproducible per seed.
pub struct SampleSource;

impl DatasetSource for SampleSource {
    fn name(&self) -> &'static str {
        "sample"
    }

    fn can_resolve(&self, reference: &str) -> bool {
        reference == SAMPLE_REFERENCE
    }

    fn resolve(&self, _reference: &str, options: &DatasetOptions) -> Result<ResolvedData> {
        let n_samples = options.n_samples.unwrap_or(DEFAULT_SAMPLE_ROWS);
        let n_features = options.n_features.unwrap_or(DEFAULT_SAMPLE_FEATURES);
        let noise = options.noise.unwrap_or(DEFAULT_SAMPLE_NOISE);

        if n_samples == 0 {
            return Err(EngineError::Data("n_samples must be positive".to_string()));
        }
        if n_features == 0 {
            return Err(EngineError::Data("n_features must be positive".to_string()));
        }
        if noise < 0.0 {
            return Err(EngineError::Data("noise must be non-negative".to_string()));
        }

        let mut rng = StdRng::seed_from_u64(options.seed.unwrap_or(DEFAULT_SEED));
        let weights: Vec<f64> = (0..n_features).map(|_| rng.gen_range(-5.0..5.0)).collect();
        let bias: f64 = rng.gen_range(-2.0..2.0);

        let mut features = Vec::with_capacity(n_samples);
        let mut labels = Vec::with_capacity(n_samples);
        for _ in 0..n_samples {
            let row: Vec<f64> = (0..n_features).map(|_| rng.gen_range(-1.0..1.0)).collect();
            let y = row.iter().zip(&weights).map(|(x, w)| x * w).sum::<f64>()
                + bias
                + if noise > 0.0 {
                    rng.gen_range(-noise..noise)
                } else {
                    0.0
                };
            features.push(row);
            labels.push(y);
        }

        split_dataset(features, labels, options)
    }
}

/// Local CSV files: header row, numeric cells, one target column.
pub struct CsvFileSource;

impl DatasetSource for CsvFileSource {
    fn name(&self) -> &'static str {
        "csv_file"
    }

    fn can_resolve(&self, reference: &str) -> bool {
        reference.ends_with(".csv")
    }

    fn resolve(&self, reference: &str, options: &DatasetOptions) -> Result<ResolvedData> {
        let contents = fs::read_to_string(Path::new(reference)).map_err(|e| {
            EngineError::Data(format!("cannot read dataset file '{}': {}", reference, e))
        })?;

        let mut lines = contents.lines().filter(|line| !line.trim().is_empty());
        let header: Vec<String> = lines
            .next()
            .ok_or_else(|| EngineError::Data(format!("dataset file '{}' is empty", reference)))?
            .split(',')
            .map(|col| col.trim().to_string())
            .collect();

        let target_column = options
            .target_column
            .as_deref()
            .unwrap_or(DEFAULT_TARGET_COLUMN);
        let target_idx = header
            .iter()
            .position(|col| col == target_column)
            .ok_or_else(|| {
                EngineError::Data(format!(
                    "target column '{}' not found in header [{}]",
                    target_column,
                    header.join(", ")
                ))
            })?;

        let feature_idx: Vec<usize> = match &options.feature_columns {
            Some(wanted) => wanted
                .iter()
                .map(|name| {
                    header.iter().position(|col| col == name).ok_or_else(|| {
                        EngineError::Data(format!("feature column '{}' not found", name))
                    })
                })
                .collect::<Result<Vec<usize>>>()?,
            None => (0..header.len()).filter(|&i| i != target_idx).collect(),
        };

        let mut features = Vec::new();
        let mut labels = Vec::new();
        for (line_no, line) in lines.enumerate() {
            let cells: Vec<&str> = line.split(',').map(str::trim).collect();
            if cells.len() != header.len() {
                return Err(EngineError::Data(format!(
                    "row {} has {} cells, expected {}",
                    line_no + 2,
                    cells.len(),
                    header.len()
                )));
            }

            let parse = |idx: usize| -> Result<f64> {
                cells[idx].parse::<f64>().map_err(|_| {
                    EngineError::Data(format!(
                        "non-numeric value '{}' in column '{}' at row {}",
                        cells[idx],
                        header[idx],
                        line_no + 2
                    ))
                })
            };

            labels.push(parse(target_idx)?);
            features.push(
                feature_idx
                    .iter()
                    .map(|&i| parse(i))
                    .collect::<Result<Vec<f64>>>()?,
            );
        }

        if labels.is_empty() {
            return Err(EngineError::Data(format!(
                "dataset file '{}' has a header but no rows",
                reference
            )));
        }

        split_dataset(features, labels, options)
    }
}
