//! Neighbor-residue search around a bound ligand

use crate::pose::{Pose, ResidueId};
use std::collections::BTreeSet;

/// Collect the identifiers of residues with at least one atom within
/// `radius` Angstroms of any atom of the ligand residue.
///
/// This is a naive all-pairs distance scan, O(atoms^2) in the worst case.
/// It is meant for single-complex, interactive use during feature
/// extraction; it is not designed for batch throughput over large
/// structures. If the ligand identifier matches no residue the result is
/// the empty set.
pub fn residues_near_ligand(
    pose: &Pose,
    radius: f64,
    ligand: &ResidueId,
) -> BTreeSet<ResidueId> {
    let mut neighbors = BTreeSet::new();

    let ligand_index = match pose.find_residue(ligand) {
        Some(index) => index,
        None => return neighbors,
    };

    for ligand_atom in &pose.residues[ligand_index].atoms {
        for (res_index, atom) in pose.iter_atoms() {
            let distance = (atom.coordinates - ligand_atom.coordinates).norm();
            if distance <= radius {
                neighbors.insert(pose.residues[res_index].id);
            }
        }
    }

    neighbors
}
