//! Cross-validated training of the binding-viability classifier

use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::metrics::{classification_metrics, Metrics};
use super::table::FeatureTable;
use super::MlError;

/// Options controlling cross-validation and the boosted-tree fit
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Number of stratified folds
    pub n_splits: usize,

    /// Shuffle seed; `None` draws from entropy as the default workflow does
    pub seed: Option<u64>,

    /// Number of boosting iterations
    pub iterations: usize,

    /// Maximum tree depth
    pub max_depth: u32,

    /// Learning rate
    pub shrinkage: f32,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            n_splits: 5,
            seed: None,
            iterations: 100,
            max_depth: 6,
            shrinkage: 0.1,
        }
    }
}

/// What a training run produced, persisted as `<prefix>_metrics.json`
#[derive(Debug, Clone, Serialize)]
pub struct TrainReport {
    /// Feature columns the model expects, in training order
    pub columns: Vec<String>,

    /// Pooled held-out metrics across all folds
    pub metrics: Metrics,

    pub rows: usize,
    pub n_splits: usize,
}

/// Train a classifier over a CSV feature table with stratified k-fold
/// cross-validation, then refit on the full table and persist the model
/// (`<prefix>_model.json`), its column manifest (`<prefix>_columns.csv`)
/// and the metrics report (`<prefix>_metrics.json`).
pub fn train<P: AsRef<Path>>(
    features: P,
    output_prefix: &str,
    options: &TrainOptions,
) -> Result<TrainReport, MlError> {
    let mut table = FeatureTable::from_path(features)?;
    info!(
        "Loaded {} rows x {} columns from {}",
        table.len(),
        table.headers().len(),
        table.path().display()
    );

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    table.shuffle(&mut rng);

    // The label column must exist even before numeric filtering
    table.require_column(super::LABEL_COLUMN)?;

    let columns = table.numeric_feature_columns();
    let labels = table.labels()?;
    let matrix = table.feature_matrix(&columns)?;

    if options.n_splits < 2 || options.n_splits > table.len() {
        return Err(MlError::InvalidFoldCount {
            splits: options.n_splits,
            rows: table.len(),
        });
    }

    let folds = stratified_folds(&labels, options.n_splits);

    // Pool held-out probabilities across folds, in row order
    let mut probabilities = vec![0.0f64; labels.len()];
    for (k, fold) in folds.iter().enumerate() {
        let mut train_data: DataVec = Vec::new();
        for row in 0..labels.len() {
            if !fold.contains(&row) {
                train_data.push(Data::new_training_data(
                    matrix[row].clone(),
                    1.0,
                    signed_label(labels[row]),
                    None,
                ));
            }
        }

        let mut model = GBDT::new(&gbdt_config(columns.len(), options));
        model.fit(&mut train_data);

        let test_data: DataVec = fold
            .iter()
            .map(|&row| Data::new_test_data(matrix[row].clone(), None))
            .collect();
        let predicted = model.predict(&test_data);

        for (&row, &p) in fold.iter().zip(predicted.iter()) {
            probabilities[row] = p as f64;
        }
        info!("Fold {}/{}: {} held-out rows", k + 1, folds.len(), fold.len());
    }

    let metrics = classification_metrics(&labels, &probabilities)?;
    info!("Accuracy: {:.2}", metrics.accuracy);
    info!("Precision: {:.2}", metrics.precision);
    info!("Recall: {:.2}", metrics.recall);
    info!("MCC: {:.2}", metrics.mcc);
    info!("ROC AUC: {:.2}", metrics.roc_auc);

    // Refit on the full table before persisting
    let mut full_data: DataVec = (0..labels.len())
        .map(|row| {
            Data::new_training_data(matrix[row].clone(), 1.0, signed_label(labels[row]), None)
        })
        .collect();
    let mut model = GBDT::new(&gbdt_config(columns.len(), options));
    model.fit(&mut full_data);

    let model_path = format!("{}_model.json", output_prefix);
    model
        .save_model(&model_path)
        .map_err(|e| MlError::Model(format!("Failed to save {}: {}", model_path, e)))?;

    let columns_path = format!("{}_columns.csv", output_prefix);
    let mut manifest = File::create(&columns_path)?;
    manifest.write_all(columns.join(",").as_bytes())?;

    let report = TrainReport {
        columns,
        metrics,
        rows: labels.len(),
        n_splits: options.n_splits,
    };

    let metrics_path = format!("{}_metrics.json", output_prefix);
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&metrics_path, json)?;

    info!(
        "Persisted model to {} with {} feature columns",
        model_path,
        report.columns.len()
    );

    Ok(report)
}

/// Boosted-tree labels are signed: -1 for the negative class, 1 for positive
fn signed_label(label: u8) -> f32 {
    if label == 1 {
        1.0
    } else {
        -1.0
    }
}

fn gbdt_config(feature_size: usize, options: &TrainOptions) -> Config {
    let mut cfg = Config::new();
    cfg.set_feature_size(feature_size);
    cfg.set_max_depth(options.max_depth);
    cfg.set_iterations(options.iterations);
    cfg.set_shrinkage(options.shrinkage);
    cfg.set_loss("LogLikelyhood");
    cfg.set_data_sample_ratio(1.0);
    cfg.set_feature_sample_ratio(1.0);
    cfg.set_debug(false);
    cfg
}

/// Assign rows to folds, keeping the class balance of each fold close to the
/// overall balance: within each class, rows are dealt round-robin.
pub fn stratified_folds(labels: &[u8], n_splits: usize) -> Vec<Vec<usize>> {
    let mut folds = vec![Vec::new(); n_splits];

    for class in [0u8, 1u8] {
        for (i, row) in labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == class)
            .map(|(row, _)| row)
            .enumerate()
        {
            folds[i % n_splits].push(row);
        }
    }

    folds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stratified_folds_partition_all_rows() {
        let labels = [1, 0, 1, 0, 1, 0, 1, 0, 1, 0];
        let folds = stratified_folds(&labels, 5);

        assert_eq!(folds.len(), 5);
        let mut seen: Vec<usize> = folds.iter().flatten().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());

        // Each fold gets one row of each class
        for fold in &folds {
            assert_eq!(fold.len(), 2);
            let ones = fold.iter().filter(|&&r| labels[r] == 1).count();
            assert_eq!(ones, 1);
        }
    }

    #[test]
    fn test_stratified_folds_are_deterministic() {
        let labels = [1, 1, 0, 0, 1, 0, 1];
        assert_eq!(stratified_folds(&labels, 3), stratified_folds(&labels, 3));
    }

    #[test]
    fn test_signed_label() {
        assert_eq!(signed_label(0), -1.0);
        assert_eq!(signed_label(1), 1.0);
    }
}
