//! Pose representation: residues, chains and the rigid-body fold tree
//!
//! A [`Pose`] is the in-memory form of a protein-ligand complex. Residues are
//! stored in file order and grouped into contiguous chain bodies; every chain
//! after the first is attached to the first body through a rigid-body jump.
//! All destructive edits operate on a clone and invalidate the cached energy.

use crate::atom::Atom;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when manipulating poses
#[derive(Error, Debug)]
pub enum PoseError {
    #[error("Residue {0} not found in pose")]
    UnknownResidue(ResidueId),

    #[error("Residue index {0} out of range (pose has {1} residues)")]
    IndexOutOfRange(usize, usize),

    #[error("Jump {0} not found (pose has {1} jumps)")]
    UnknownJump(usize, usize),

    #[error("Pose has no residues")]
    EmptyPose,

    #[error("Invalid residue identifier: {0}")]
    InvalidResidueId(String),
}

/// Identifies a residue by PDB chain and sequence number, e.g. "X 1"
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ResidueId {
    /// Chain identifier
    pub chain: char,

    /// Residue sequence number within the chain
    pub number: i32,
}

impl ResidueId {
    pub fn new(chain: char, number: i32) -> Self {
        Self { chain, number }
    }
}

impl fmt::Display for ResidueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.chain, self.number)
    }
}

impl FromStr for ResidueId {
    type Err = PoseError;

    /// Parse a "chain number" pair, e.g. "A 42"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let chain = parts
            .next()
            .and_then(|c| c.chars().next())
            .ok_or_else(|| PoseError::InvalidResidueId(s.to_string()))?;
        let number = parts
            .next()
            .and_then(|n| n.parse::<i32>().ok())
            .ok_or_else(|| PoseError::InvalidResidueId(s.to_string()))?;

        if parts.next().is_some() {
            return Err(PoseError::InvalidResidueId(s.to_string()));
        }

        Ok(ResidueId { chain, number })
    }
}

/// A residue: a named group of atoms with a chain/number identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Residue {
    /// Residue name (e.g., "ALA", "LIG")
    pub name: String,

    /// PDB chain and sequence number
    pub id: ResidueId,

    /// Atoms belonging to this residue
    pub atoms: Vec<Atom>,
}

impl Residue {
    pub fn new(name: &str, id: ResidueId) -> Self {
        Self {
            name: name.to_string(),
            id,
            atoms: Vec::new(),
        }
    }

    /// Geometric center of the residue's atoms
    pub fn centroid(&self) -> Option<Vector3<f64>> {
        if self.atoms.is_empty() {
            return None;
        }
        let sum = self
            .atoms
            .iter()
            .fold(Vector3::zeros(), |acc, a| acc + a.coordinates);
        Some(sum / self.atoms.len() as f64)
    }
}

/// A rigid-body jump attaching a contiguous residue range to the root body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jump {
    /// Residue index range (0-based, half-open) moved by this jump
    pub residues: Range<usize>,
}

/// Connectivity tree describing rigid-body relationships between chain bodies
///
/// The first chain in the pose is the root; every later chain hangs off the
/// root through one jump. Jumps are ordered by chain appearance, so in the
/// usual complex-preparation convention the last jump governs the ligand.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FoldTree {
    jumps: Vec<Jump>,
}

impl FoldTree {
    /// Rebuild the tree from the chain boundaries of a residue list
    pub fn from_residues(residues: &[Residue]) -> Self {
        let mut jumps = Vec::new();
        let mut start = 0;

        for i in 1..=residues.len() {
            let boundary =
                i == residues.len() || residues[i].id.chain != residues[start].id.chain;
            if boundary {
                // The root body (first chain) carries no jump
                if start > 0 {
                    jumps.push(Jump { residues: start..i });
                }
                start = i;
            }
        }

        Self { jumps }
    }

    /// Number of rigid-body jumps
    pub fn num_jumps(&self) -> usize {
        self.jumps.len()
    }

    pub fn jump(&self, jump_id: usize) -> Option<&Jump> {
        self.jumps.get(jump_id)
    }

    /// Resolve the jump governing a residue's body, if it is not the root
    pub fn jump_for_residue(&self, residue_index: usize) -> Option<usize> {
        self.jumps
            .iter()
            .position(|j| j.residues.contains(&residue_index))
    }
}

/// In-memory representation of a molecular complex
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pose {
    /// Name of the complex (usually the source file stem)
    pub name: String,

    /// Residues in file order
    pub residues: Vec<Residue>,

    /// Rigid-body connectivity between chain bodies
    pub fold_tree: FoldTree,

    /// Cached total energy; cleared by any edit
    pub energy: Option<f64>,
}

impl Pose {
    /// Create an empty pose
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            residues: Vec::new(),
            fold_tree: FoldTree::default(),
            energy: None,
        }
    }

    /// Number of residues
    pub fn size(&self) -> usize {
        self.residues.len()
    }

    /// Total number of atoms across all residues
    pub fn total_atoms(&self) -> usize {
        self.residues.iter().map(|r| r.atoms.len()).sum()
    }

    /// Iterate over all atoms together with the owning residue index
    pub fn iter_atoms(&self) -> impl Iterator<Item = (usize, &Atom)> {
        self.residues
            .iter()
            .enumerate()
            .flat_map(|(i, r)| r.atoms.iter().map(move |a| (i, a)))
    }

    /// Resolve a PDB chain/number pair to the internal residue index
    pub fn find_residue(&self, id: &ResidueId) -> Option<usize> {
        self.residues.iter().position(|r| r.id == *id)
    }

    /// Recompute the fold tree after a topology edit
    pub fn rebuild_fold_tree(&mut self) {
        self.fold_tree = FoldTree::from_residues(&self.residues);
    }

    /// Geometric center of all atoms
    pub fn center(&self) -> Result<Vector3<f64>, PoseError> {
        let n = self.total_atoms();
        if n == 0 {
            return Err(PoseError::EmptyPose);
        }
        let sum = self
            .iter_atoms()
            .fold(Vector3::zeros(), |acc, (_, a)| acc + a.coordinates);
        Ok(sum / n as f64)
    }

    /// Geometric center of a residue index range
    pub fn center_of_range(&self, range: &Range<usize>) -> Result<Vector3<f64>, PoseError> {
        let atoms: Vec<&Atom> = self.residues[range.clone()]
            .iter()
            .flat_map(|r| r.atoms.iter())
            .collect();
        if atoms.is_empty() {
            return Err(PoseError::EmptyPose);
        }
        let sum = atoms
            .iter()
            .fold(Vector3::zeros(), |acc, a| acc + a.coordinates);
        Ok(sum / atoms.len() as f64)
    }

    /// Return a new pose containing only the residues in the given ranges
    ///
    /// Ranges must be ascending and non-overlapping. The fold tree is rebuilt
    /// and the cached energy discarded, since deleting residues invalidates
    /// any previously computed potential.
    pub fn retain_ranges(&self, ranges: &[Range<usize>]) -> Result<Pose, PoseError> {
        for range in ranges {
            if range.end > self.residues.len() {
                return Err(PoseError::IndexOutOfRange(range.end, self.residues.len()));
            }
        }

        let mut kept = Pose::new(&self.name);
        for range in ranges {
            kept.residues
                .extend(self.residues[range.clone()].iter().cloned());
        }
        kept.rebuild_fold_tree();
        kept.energy = None;

        Ok(kept)
    }

    /// Return a new pose with one residue removed
    ///
    /// Internally a set-complement over contiguous ranges, so head, tail and
    /// interior positions are all handled by the same path.
    pub fn without_residue(&self, index: usize) -> Result<Pose, PoseError> {
        if index >= self.residues.len() {
            return Err(PoseError::IndexOutOfRange(index, self.residues.len()));
        }

        let mut ranges = Vec::new();
        if index > 0 {
            ranges.push(0..index);
        }
        if index + 1 < self.residues.len() {
            ranges.push(index + 1..self.residues.len());
        }

        self.retain_ranges(&ranges)
    }

    /// Return a new pose containing only the given residue
    pub fn only_residue(&self, index: usize) -> Result<Pose, PoseError> {
        if index >= self.residues.len() {
            return Err(PoseError::IndexOutOfRange(index, self.residues.len()));
        }
        self.retain_ranges(&[index..index + 1])
    }

    /// Rigidly translate the body downstream of a jump
    ///
    /// Internal geometry of the body is preserved; the cached energy is
    /// discarded since relative coordinates changed.
    pub fn translate_jump(
        &mut self,
        jump_id: usize,
        translation: Vector3<f64>,
    ) -> Result<(), PoseError> {
        let range = self
            .fold_tree
            .jump(jump_id)
            .ok_or(PoseError::UnknownJump(jump_id, self.fold_tree.num_jumps()))?
            .residues
            .clone();

        for residue in &mut self.residues[range] {
            for atom in &mut residue.atoms {
                atom.coordinates += translation;
            }
        }
        self.energy = None;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Element;

    fn atom_at(x: f64, serial: u32) -> Atom {
        Atom::new(
            Element::Carbon,
            Vector3::new(x, 0.0, 0.0),
            "CA".to_string(),
            serial,
            0.0,
            false,
        )
    }

    /// Three residues on chain A, one ligand residue on chain X
    fn test_pose() -> Pose {
        let mut pose = Pose::new("test");
        for (i, number) in [1, 2, 3].iter().enumerate() {
            let mut res = Residue::new("ALA", ResidueId::new('A', *number));
            res.atoms.push(atom_at(i as f64, i as u32 + 1));
            pose.residues.push(res);
        }
        let mut lig = Residue::new("LIG", ResidueId::new('X', 1));
        lig.atoms.push(atom_at(10.0, 4));
        pose.residues.push(lig);
        pose.rebuild_fold_tree();
        pose
    }

    #[test]
    fn test_residue_id_parsing() {
        let id: ResidueId = "A 42".parse().expect("Should parse");
        assert_eq!(id, ResidueId::new('A', 42));

        assert!("A".parse::<ResidueId>().is_err());
        assert!("A forty".parse::<ResidueId>().is_err());
        assert!("A 1 2".parse::<ResidueId>().is_err());
    }

    #[test]
    fn test_residue_id_display_roundtrip() {
        let id = ResidueId::new('X', 1);
        let parsed: ResidueId = id.to_string().parse().expect("Should parse");
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_fold_tree_from_chains() {
        let pose = test_pose();
        assert_eq!(pose.fold_tree.num_jumps(), 1);
        assert_eq!(pose.fold_tree.jump(0).expect("jump").residues, 3..4);

        // Chain A residues belong to the root body, chain X to jump 0
        assert_eq!(pose.fold_tree.jump_for_residue(0), None);
        assert_eq!(pose.fold_tree.jump_for_residue(3), Some(0));
    }

    #[test]
    fn test_find_residue() {
        let pose = test_pose();
        assert_eq!(pose.find_residue(&ResidueId::new('X', 1)), Some(3));
        assert_eq!(pose.find_residue(&ResidueId::new('A', 2)), Some(1));
        assert_eq!(pose.find_residue(&ResidueId::new('B', 1)), None);
    }

    #[test]
    fn test_without_residue_head_tail_interior() {
        let pose = test_pose();

        // Head
        let no_head = pose.without_residue(0).expect("Should remove head");
        assert_eq!(no_head.size(), 3);
        assert_eq!(no_head.residues[0].id, ResidueId::new('A', 2));

        // Tail
        let no_tail = pose.without_residue(3).expect("Should remove tail");
        assert_eq!(no_tail.size(), 3);
        assert_eq!(no_tail.fold_tree.num_jumps(), 0);

        // Interior
        let no_mid = pose.without_residue(1).expect("Should remove interior");
        assert_eq!(no_mid.size(), 3);
        assert_eq!(no_mid.residues[0].id, ResidueId::new('A', 1));
        assert_eq!(no_mid.residues[1].id, ResidueId::new('A', 3));

        // Out of range
        assert!(pose.without_residue(4).is_err());
    }

    #[test]
    fn test_only_residue() {
        let pose = test_pose();
        let ligand = pose.only_residue(3).expect("Should isolate ligand");
        assert_eq!(ligand.size(), 1);
        assert_eq!(ligand.residues[0].id, ResidueId::new('X', 1));
        assert_eq!(ligand.fold_tree.num_jumps(), 0);
    }

    #[test]
    fn test_edit_invalidates_energy() {
        let mut pose = test_pose();
        pose.energy = Some(-1.0);

        let derived = pose.without_residue(0).expect("Should remove");
        assert!(derived.energy.is_none());

        pose.translate_jump(0, Vector3::new(1.0, 0.0, 0.0))
            .expect("Should translate");
        assert!(pose.energy.is_none());
    }

    #[test]
    fn test_translate_jump_moves_only_downstream_body() {
        let mut pose = test_pose();
        let before_root = pose.residues[0].atoms[0].coordinates;
        let before_lig = pose.residues[3].atoms[0].coordinates;

        pose.translate_jump(0, Vector3::new(0.0, 5.0, 0.0))
            .expect("Should translate");

        assert_eq!(pose.residues[0].atoms[0].coordinates, before_root);
        assert_eq!(
            pose.residues[3].atoms[0].coordinates,
            before_lig + Vector3::new(0.0, 5.0, 0.0)
        );

        assert!(pose.translate_jump(5, Vector3::zeros()).is_err());
    }
}
