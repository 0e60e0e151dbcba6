//! Structure preparation workflows for virtual screening
//!
//! All operations hang off an [`Engine`], the explicit handle created by
//! [`Engine::init`]. Nothing in this crate relies on ambient global state:
//! the score function and minimizer travel with the engine, and every
//! operation takes the pose it works on and returns a new one.

pub mod decompose;
pub mod neighbors;
pub mod unbound;

use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

use crate::io::{self, IoError};
use crate::minimize::{Minimizer, MinimizerParams, MinimizeError, MoveMap};
use crate::pose::{Pose, PoseError, ResidueId};
use crate::scoring::{ScoreFunction, ScoreParams};

use log::{debug, info};

/// Errors from structure preparation workflows
#[derive(Error, Debug)]
pub enum PrepError {
    #[error("Residue {0} not found in pose")]
    UnknownResidue(ResidueId),

    #[error("Residue {0} belongs to the root body and is not governed by a jump")]
    NoJumpForResidue(ResidueId),

    #[error("Pose has no rigid-body jumps to separate")]
    NoJumps,

    #[error("Pose error: {0}")]
    Pose(#[from] PoseError),

    #[error("Minimization error: {0}")]
    Minimize(#[from] MinimizeError),

    #[error("IO error: {0}")]
    Io(#[from] IoError),
}

/// Options for creating an [`Engine`]
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub score_params: ScoreParams,
    pub minimizer_params: MinimizerParams,

    /// Translation step used by the unbound-reference generator
    pub unbound_step: f64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            score_params: ScoreParams::default(),
            minimizer_params: MinimizerParams::default(),
            unbound_step: unbound::UNBOUND_STEP,
        }
    }
}

/// Handle over the score function and minimizer used by every workflow
pub struct Engine {
    score_fn: ScoreFunction,
    minimizer: Minimizer,
    unbound_step: f64,
}

impl Engine {
    /// Initialize the engine; all structure operations require the handle
    pub fn init(options: EngineOptions) -> Self {
        debug!("Initializing structure engine");
        Self {
            score_fn: ScoreFunction::with_params(options.score_params),
            minimizer: Minimizer::with_params(options.minimizer_params),
            unbound_step: options.unbound_step,
        }
    }

    pub fn score_function(&self) -> &ScoreFunction {
        &self.score_fn
    }

    /// Parse PDB text into a scored pose
    pub fn load_pdb_string(&self, pdb: &str) -> Result<Pose, PrepError> {
        let mut pose = io::parse_pdb_string(pdb)?;
        self.score_fn.score(&mut pose);
        Ok(pose)
    }

    /// Parse a PDB file into a scored pose
    pub fn load_pdb_file<P: AsRef<Path>>(&self, path: P) -> Result<Pose, PrepError> {
        let mut pose = io::parse_pdb_file(path)?;
        self.score_fn.score(&mut pose);
        Ok(pose)
    }

    /// Serialize a pose to PDB text
    pub fn export_pdb_string(&self, pose: &Pose) -> String {
        io::pdb_string(pose)
    }

    /// Score a pose and cache the result on it
    pub fn score(&self, pose: &mut Pose) -> f64 {
        self.score_fn.score(pose)
    }

    /// Residues with any atom within `radius` of any ligand atom.
    ///
    /// Delegates to [`neighbors::residues_near_ligand`]; see there for the
    /// complexity caveat. An unknown ligand identifier yields an empty set.
    pub fn neighbors_within(
        &self,
        pose: &Pose,
        radius: f64,
        ligand: &ResidueId,
    ) -> BTreeSet<ResidueId> {
        neighbors::residues_near_ligand(pose, radius, ligand)
    }

    /// Split a bound complex into `(ligand, receptor)` poses, both rescored
    pub fn decompose(
        &self,
        pose: &Pose,
        ligand: &ResidueId,
    ) -> Result<(Pose, Pose), PrepError> {
        let index = pose
            .find_residue(ligand)
            .ok_or(PrepError::UnknownResidue(*ligand))?;

        let (mut ligand_pose, mut receptor_pose) = decompose::decompose_at(pose, index)?;

        // Topology changed; refresh the cached potentials
        self.score_fn.score(&mut ligand_pose);
        self.score_fn.score(&mut receptor_pose);

        Ok((ligand_pose, receptor_pose))
    }

    /// Produce the unbound reference state of a complex.
    ///
    /// When `residue` is given, the jump governing that residue's body is
    /// separated; a residue on the root body is an error. Without it the
    /// last jump in the fold tree is used, which by the usual preparation
    /// convention is the ligand.
    pub fn unbound_reference(
        &self,
        pose: &Pose,
        residue: Option<&ResidueId>,
    ) -> Result<Pose, PrepError> {
        let jump_id = match residue {
            Some(id) => {
                let index = pose
                    .find_residue(id)
                    .ok_or(PrepError::UnknownResidue(*id))?;
                pose.fold_tree
                    .jump_for_residue(index)
                    .ok_or(PrepError::NoJumpForResidue(*id))?
            }
            None => {
                let n = pose.fold_tree.num_jumps();
                if n == 0 {
                    return Err(PrepError::NoJumps);
                }
                n - 1
            }
        };

        let mut unbound = unbound::separate_jump(pose, jump_id, self.unbound_step)?;
        self.score_fn.score(&mut unbound);

        Ok(unbound)
    }

    /// Return an energy-minimized copy of a pose.
    ///
    /// With an empty `flexible` list every residue's backbone and
    /// side-chain degrees of freedom move; otherwise movement is restricted
    /// to exactly the listed residues. Rigid-body jumps stay flexible in
    /// both modes. Every identifier must resolve against the pose's PDB
    /// numbering; the first unresolved one aborts the call.
    pub fn minimize(
        &self,
        pose: &Pose,
        flexible: &[ResidueId],
    ) -> Result<Pose, PrepError> {
        let mut movemap = MoveMap::new();
        movemap.set_jump(true);

        if flexible.is_empty() {
            movemap.set_all_residues(true);
        } else {
            movemap.set_all_residues(false);
            for id in flexible {
                let index = pose
                    .find_residue(id)
                    .ok_or(PrepError::UnknownResidue(*id))?;
                movemap.set_residue(index, true);
            }
        }

        info!(
            "Minimizing pose '{}' ({} residues, {} flexible)",
            pose.name,
            pose.size(),
            if flexible.is_empty() {
                pose.size()
            } else {
                flexible.len()
            }
        );

        let mut minimized = self.minimizer.minimize(pose, &self.score_fn, &movemap)?;
        let energy = self.score_fn.score(&mut minimized);
        debug!("Minimized energy: {:.4}", energy);

        Ok(minimized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPLEX_PDB: &str = "\
ATOM      1  CA  GLY A   1       0.000   0.000   0.000  1.00  0.00           C
ATOM      2  CA  ALA A   2       3.500   0.000   0.000  1.00  0.00           C
HETATM    3  C1  LIG X   1       1.800   2.200   0.000  1.00  0.00           C
END
";

    fn engine() -> Engine {
        Engine::init(EngineOptions::default())
    }

    #[test]
    fn test_load_scores_the_pose() {
        let pose = engine().load_pdb_string(COMPLEX_PDB).expect("Should load");
        assert!(pose.energy.is_some());
    }

    #[test]
    fn test_decompose_resolves_and_rescores() {
        let eng = engine();
        let pose = eng.load_pdb_string(COMPLEX_PDB).expect("Should load");

        let ligand_id = ResidueId::new('X', 1);
        let (ligand, receptor) = eng.decompose(&pose, &ligand_id).expect("Should split");

        assert_eq!(ligand.total_atoms(), 1);
        assert_eq!(receptor.total_atoms(), 2);
        assert!(ligand.energy.is_some());
        assert!(receptor.energy.is_some());

        let missing = ResidueId::new('Q', 9);
        assert!(matches!(
            eng.decompose(&pose, &missing),
            Err(PrepError::UnknownResidue(_))
        ));
    }

    #[test]
    fn test_unbound_reference_defaults_to_last_jump() {
        let eng = engine();
        let pose = eng.load_pdb_string(COMPLEX_PDB).expect("Should load");

        let unbound = eng.unbound_reference(&pose, None).expect("Should separate");
        let moved = (unbound.residues[2].atoms[0].coordinates
            - pose.residues[2].atoms[0].coordinates)
            .norm();
        assert!(moved > 1e5);
        assert!(unbound.energy.is_some());
    }

    #[test]
    fn test_unbound_reference_by_residue() {
        let eng = engine();
        let pose = eng.load_pdb_string(COMPLEX_PDB).expect("Should load");

        let via_residue = eng
            .unbound_reference(&pose, Some(&ResidueId::new('X', 1)))
            .expect("Should resolve the jump through the fold tree");
        assert!(via_residue.residues[2].atoms[0].coordinates.norm() > 1e5);

        // A residue on the root body has no jump
        assert!(matches!(
            eng.unbound_reference(&pose, Some(&ResidueId::new('A', 1))),
            Err(PrepError::NoJumpForResidue(_))
        ));
    }

    #[test]
    fn test_minimize_rejects_unknown_residue() {
        let eng = engine();
        let pose = eng.load_pdb_string(COMPLEX_PDB).expect("Should load");

        let bogus = vec![ResidueId::new('A', 1), ResidueId::new('Z', 5)];
        assert!(matches!(
            eng.minimize(&pose, &bogus),
            Err(PrepError::UnknownResidue(id)) if id == ResidueId::new('Z', 5)
        ));
    }
}
