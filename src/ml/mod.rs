//! Cross-validated training and scoring over tabular features

pub mod metrics;
pub mod predict;
pub mod table;
pub mod train;

use std::path::PathBuf;
use thiserror::Error;

/// Reserved column holding the supervised binary label
pub const LABEL_COLUMN: &str = "Class";

/// Errors from the training and prediction pipelines
#[derive(Error, Debug)]
pub enum MlError {
    #[error("Feature {column} is not present in the {} file", .file.display())]
    MissingColumn { column: String, file: PathBuf },

    #[error("Column {column} contains a non-numeric value: {value:?}")]
    NonNumeric { column: String, value: String },

    #[error("Label value {0:?} is not 0 or 1")]
    InvalidLabel(String),

    #[error("Labels must contain both classes")]
    SingleClass,

    #[error("Fold count {splits} is invalid for {rows} rows")]
    InvalidFoldCount { splits: usize, rows: usize },

    #[error("Column manifest {} is empty", .0.display())]
    EmptyColumns(PathBuf),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Model error: {0}")]
    Model(String),
}
