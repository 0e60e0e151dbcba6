//! Scoring new feature tables with a persisted classifier

use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use log::info;
use std::path::{Path, PathBuf};

use super::metrics::THRESHOLD;
use super::table::FeatureTable;
use super::MlError;

/// Name of the appended hard-prediction column
pub const PREDICTED_CLASS_COLUMN: &str = "Predicted_Class";

/// Name of the appended positive-class probability column
pub const SCORE_COLUMN: &str = "VScreenML_Score";

/// The bundled model presets. Each maps to a model/columns pair at a fixed
/// relative path under the models directory; the mapping is a closed table,
/// not string branching at call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    DudeOpeneye,
    DudeOpenbabel,
}

impl Preset {
    pub const ALL: [Preset; 2] = [Preset::DudeOpeneye, Preset::DudeOpenbabel];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::DudeOpeneye => "DUDE_openeye",
            Preset::DudeOpenbabel => "DUDE_openbabel",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.name() == name)
    }

    /// Model and column-manifest paths relative to the models directory
    pub fn paths(&self, models_dir: &Path) -> (PathBuf, PathBuf) {
        let stem = match self {
            Preset::DudeOpeneye => "model_dude_openeye",
            Preset::DudeOpenbabel => "model_dude_openbabel",
        };
        (
            models_dir.join(format!("{}_model.json", stem)),
            models_dir.join(format!("{}_columns.csv", stem)),
        )
    }
}

/// Where the classifier and its column manifest come from
#[derive(Debug, Clone)]
pub enum ModelSource {
    /// One of the bundled presets
    Preset(Preset),

    /// Explicit model and column-manifest files
    Files { model: PathBuf, columns: PathBuf },
}

impl ModelSource {
    pub fn resolve(&self, models_dir: &Path) -> (PathBuf, PathBuf) {
        match self {
            ModelSource::Preset(preset) => preset.paths(models_dir),
            ModelSource::Files { model, columns } => (model.clone(), columns.clone()),
        }
    }
}

/// Summary of one prediction run
#[derive(Debug, Clone)]
pub struct PredictSummary {
    pub rows: usize,
    pub predicted_positive: usize,
}

/// Read the ordered column manifest persisted next to a model
pub fn load_columns(path: &Path) -> Result<Vec<String>, MlError> {
    let raw = std::fs::read_to_string(path)?;
    let columns: Vec<String> = raw
        .trim()
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    if columns.is_empty() {
        return Err(MlError::EmptyColumns(path.to_path_buf()));
    }
    Ok(columns)
}

/// Score a feature CSV with a persisted model and write the input table
/// augmented with `Predicted_Class` and `VScreenML_Score` columns.
///
/// Every column the model expects must be present in the input; a missing
/// column aborts before any output is written, naming the column and file.
pub fn predict<P: AsRef<Path>, Q: AsRef<Path>>(
    features: P,
    output: Q,
    source: &ModelSource,
    models_dir: &Path,
) -> Result<PredictSummary, MlError> {
    let (model_path, columns_path) = source.resolve(models_dir);

    let columns = load_columns(&columns_path)?;
    let model = GBDT::load_model(
        model_path
            .to_str()
            .ok_or_else(|| MlError::Model(format!("Invalid path: {:?}", model_path)))?,
    )
    .map_err(|e| MlError::Model(format!("Failed to load {}: {}", model_path.display(), e)))?;

    let table = FeatureTable::from_path(features)?;

    // Validation happens here: selection fails fast on the first column the
    // input table lacks, before the output file is touched
    let matrix = table.feature_matrix(&columns)?;

    let test_data: DataVec = matrix
        .into_iter()
        .map(|row| Data::new_test_data(row, None))
        .collect();
    let probabilities = model.predict(&test_data);

    let mut predicted_class = Vec::with_capacity(probabilities.len());
    let mut scores = Vec::with_capacity(probabilities.len());
    let mut predicted_positive = 0;
    for &p in &probabilities {
        let positive = (p as f64) > THRESHOLD;
        if positive {
            predicted_positive += 1;
        }
        predicted_class.push(if positive { "1" } else { "0" }.to_string());
        scores.push(format!("{}", p));
    }

    table.write_augmented(
        &output,
        &[
            (PREDICTED_CLASS_COLUMN, predicted_class),
            (SCORE_COLUMN, scores),
        ],
    )?;

    info!(
        "Scored {} rows ({} predicted positive) -> {}",
        table.len(),
        predicted_positive,
        output.as_ref().display()
    );

    Ok(PredictSummary {
        rows: table.len(),
        predicted_positive,
    })
}
