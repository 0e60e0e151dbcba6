//! VScreenML: structure preparation and scoring for virtual screening
//!
//! This library prepares protein-ligand complexes for feature extraction
//! (neighbor search, complex decomposition, unbound reference generation,
//! local minimization) and trains/applies a gradient-boosted classifier
//! over the resulting tabular features.

pub mod atom;
pub mod io;
pub mod minimize;
pub mod ml;
pub mod pose;
pub mod prep;
pub mod scoring;

// Re-export commonly used types and functions
pub use pose::{Pose, ResidueId};
pub use prep::{Engine, EngineOptions};
pub use scoring::ScoreFunction;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
