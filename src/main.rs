//! Main executable for vscreenml

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use vscreenml::ml::predict::{predict, ModelSource, Preset};
use vscreenml::ml::train::{train, TrainOptions};
use vscreenml::pose::ResidueId;
use vscreenml::prep::{Engine, EngineOptions};

/// Command-line arguments for the application
#[derive(Parser, Debug)]
#[clap(
    name = "vscreenml",
    version = vscreenml::VERSION,
    author = "Author <author@example.com>",
    about = "Structure preparation and gradient-boosted scoring for virtual screening"
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train a binding-viability classifier with cross-validation
    Train {
        /// CSV feature table with a Class label column
        #[clap(long, value_parser)]
        features: PathBuf,

        /// Prefix for the model, column manifest and metrics outputs
        #[clap(long, value_parser)]
        output_prefix: String,

        /// Number of stratified cross-validation folds
        #[clap(long, default_value_t = 5)]
        nsplits: usize,

        /// Shuffle seed for reproducible folds (unseeded by default)
        #[clap(long)]
        seed: Option<u64>,
    },

    /// Score a feature table with a trained model
    Predict {
        /// CSV feature table to score
        #[clap(long, value_parser)]
        features: PathBuf,

        /// Output CSV with appended prediction columns
        #[clap(long, value_parser)]
        output: PathBuf,

        /// Model file path, or a preset name (DUDE_openeye, DUDE_openbabel)
        #[clap(long)]
        model: String,

        /// Column manifest path (required unless a preset is used)
        #[clap(long, value_parser)]
        columns: Option<PathBuf>,

        /// Directory holding the bundled preset models
        #[clap(long, value_parser, default_value = "models")]
        models_dir: PathBuf,
    },

    /// Prepare a complex: neighbors, decomposition and unbound reference
    Prepare {
        /// PDB file of the bound complex
        #[clap(long, value_parser)]
        input: PathBuf,

        /// Ligand residue as "chain number", e.g. "X 1"
        #[clap(long, default_value = "X 1")]
        ligand: String,

        /// Neighbor search radius in Angstroms
        #[clap(long, default_value_t = 15.0)]
        radius: f64,

        /// Minimize the complex before decomposition
        #[clap(long)]
        minimize: bool,

        /// Residues allowed to flex during minimization ("chain number");
        /// empty means full flexibility
        #[clap(long)]
        flex: Vec<String>,

        /// Prefix for the ligand/receptor/unbound PDB outputs
        #[clap(long, value_parser)]
        output_prefix: String,
    },
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    // Parse command-line arguments
    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            features,
            output_prefix,
            nsplits,
            seed,
        } => {
            let options = TrainOptions {
                n_splits: nsplits,
                seed,
                ..TrainOptions::default()
            };

            let report = train(&features, &output_prefix, &options).with_context(|| {
                format!("Failed to train on {}", features.display())
            })?;

            println!("Accuracy: {:.2}", report.metrics.accuracy);
            println!("Precision: {:.2}", report.metrics.precision);
            println!("Recall: {:.2}", report.metrics.recall);
            println!("MCC: {:.2}", report.metrics.mcc);
            println!("ROC AUC: {:.2}", report.metrics.roc_auc);

            info!("Training completed successfully");
        }

        Commands::Predict {
            features,
            output,
            model,
            columns,
            models_dir,
        } => {
            let source = match Preset::from_name(&model) {
                Some(preset) => ModelSource::Preset(preset),
                None => {
                    let columns = match columns {
                        Some(path) => path,
                        None => bail!(
                            "--columns is required when --model is not one of the presets"
                        ),
                    };
                    ModelSource::Files {
                        model: PathBuf::from(&model),
                        columns,
                    }
                }
            };

            let summary = predict(&features, &output, &source, &models_dir)
                .with_context(|| format!("Failed to score {}", features.display()))?;

            println!(
                "Scored {} rows, {} predicted positive",
                summary.rows, summary.predicted_positive
            );
        }

        Commands::Prepare {
            input,
            ligand,
            radius,
            minimize,
            flex,
            output_prefix,
        } => {
            let ligand_id: ResidueId = ligand
                .parse()
                .with_context(|| format!("Invalid ligand identifier: {}", ligand))?;

            let engine = Engine::init(EngineOptions::default());

            info!("Loading complex: {}", input.display());
            let mut pose = engine
                .load_pdb_file(&input)
                .with_context(|| format!("Failed to load {}", input.display()))?;

            if minimize {
                let flexible: Vec<ResidueId> = flex
                    .iter()
                    .map(|s| s.parse::<ResidueId>())
                    .collect::<std::result::Result<_, _>>()
                    .context("Invalid flexible residue identifier")?;
                pose = engine
                    .minimize(&pose, &flexible)
                    .context("Minimization failed")?;
            }

            let neighbors = engine.neighbors_within(&pose, radius, &ligand_id);
            println!(
                "{} residues within {:.1} A of {}",
                neighbors.len(),
                radius,
                ligand_id
            );
            for id in &neighbors {
                println!("  {}", id);
            }

            let bound_energy = pose.energy.unwrap_or_default();
            let unbound = engine.unbound_reference(&pose, Some(&ligand_id))?;
            let unbound_energy = unbound.energy.unwrap_or_default();
            println!(
                "Bound energy: {:.4}  Unbound energy: {:.4}  Delta: {:.4}",
                bound_energy,
                unbound_energy,
                bound_energy - unbound_energy
            );

            let (ligand_pose, receptor_pose) = engine.decompose(&pose, &ligand_id)?;

            let ligand_path = format!("{}_ligand.pdb", output_prefix);
            let receptor_path = format!("{}_receptor.pdb", output_prefix);
            let unbound_path = format!("{}_unbound.pdb", output_prefix);

            vscreenml::io::write_pdb(&ligand_pose, &ligand_path)
                .with_context(|| format!("Failed to write {}", ligand_path))?;
            vscreenml::io::write_pdb(&receptor_pose, &receptor_path)
                .with_context(|| format!("Failed to write {}", receptor_path))?;
            vscreenml::io::write_pdb(&unbound, &unbound_path)
                .with_context(|| format!("Failed to write {}", unbound_path))?;

            info!("Preparation completed successfully");
        }
    }

    Ok(())
}
