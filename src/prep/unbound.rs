//! Generating the unbound reference state of a complex

use crate::pose::{Pose, PoseError};
use nalgebra::Vector3;

/// Default translation step, large enough to kill every interaction
pub const UNBOUND_STEP: f64 = 1_000_000.0;

/// Translate the body downstream of `jump_id` far away from the rest of the
/// complex, preserving the internal geometry of both bodies.
///
/// The translation axis points from the centroid of the remaining atoms to
/// the centroid of the moving body, so the body separates along the
/// direction it already sits in. When the two centroids coincide the x axis
/// is used.
pub fn separate_jump(pose: &Pose, jump_id: usize, step_size: f64) -> Result<Pose, PoseError> {
    let mut unbound = pose.clone();

    let range = unbound
        .fold_tree
        .jump(jump_id)
        .ok_or(PoseError::UnknownJump(jump_id, unbound.fold_tree.num_jumps()))?
        .residues
        .clone();

    let body_center = unbound.center_of_range(&range)?;

    // Centroid of everything outside the moving body
    let mut rest_sum = Vector3::zeros();
    let mut rest_count = 0usize;
    for (res_index, atom) in unbound.iter_atoms() {
        if !range.contains(&res_index) {
            rest_sum += atom.coordinates;
            rest_count += 1;
        }
    }
    if rest_count == 0 {
        return Err(PoseError::EmptyPose);
    }
    let rest_center = rest_sum / rest_count as f64;

    let direction = body_center - rest_center;
    let axis = if direction.norm() > 1e-9 {
        direction.normalize()
    } else {
        Vector3::x()
    };

    unbound.translate_jump(jump_id, step_size * axis)?;

    Ok(unbound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::parse_pdb_string;
    use crate::scoring::ScoreFunction;

    const COMPLEX_PDB: &str = "\
ATOM      1  CA  GLY A   1       0.000   0.000   0.000  1.00  0.00           C
ATOM      2  CA  ALA A   2       3.500   0.000   0.000  1.00  0.00           C
HETATM    3  C1  LIG X   1       1.800   2.000   0.000  1.00  0.00           C
HETATM    4  C2  LIG X   1       2.900   2.700   0.000  1.00  0.00           C
END
";

    #[test]
    fn test_separation_removes_interaction_energy() {
        let pose = parse_pdb_string(COMPLEX_PDB).expect("Should parse");
        let sfxn = ScoreFunction::new();

        let unbound = separate_jump(&pose, 0, UNBOUND_STEP).expect("Should separate");

        // No cross-body terms survive a 1e6 Angstrom separation: the unbound
        // energy equals the sum of the isolated parts
        let ligand = pose.only_residue(2).expect("Should isolate ligand");
        let receptor = pose.without_residue(2).expect("Should isolate receptor");
        let parts_energy = sfxn.total_energy(&ligand) + sfxn.total_energy(&receptor);
        let unbound_energy = sfxn.total_energy(&unbound);
        assert!((unbound_energy - parts_energy).abs() < 1e-9);

        // The bound state still carries interface energy
        assert!((sfxn.total_energy(&pose) - parts_energy).abs() > 1e-9);
    }

    #[test]
    fn test_internal_geometry_is_preserved() {
        let pose = parse_pdb_string(COMPLEX_PDB).expect("Should parse");
        let unbound = separate_jump(&pose, 0, UNBOUND_STEP).expect("Should separate");

        // Receptor body untouched
        assert_eq!(
            unbound.residues[0].atoms[0].coordinates,
            pose.residues[0].atoms[0].coordinates
        );

        // Ligand body rigidly translated: pairwise distances unchanged
        let d_before = pose.residues[2].atoms[0].distance(&pose.residues[2].atoms[1]);
        let d_after =
            unbound.residues[2].atoms[0].distance(&unbound.residues[2].atoms[1]);
        assert!((d_before - d_after).abs() < 1e-9);

        // And it really moved far away
        let displacement = (unbound.residues[2].atoms[0].coordinates
            - pose.residues[2].atoms[0].coordinates)
            .norm();
        assert!(displacement > 0.9 * UNBOUND_STEP);
    }

    #[test]
    fn test_unknown_jump_is_an_error() {
        let pose = parse_pdb_string(COMPLEX_PDB).expect("Should parse");
        assert!(separate_jump(&pose, 3, UNBOUND_STEP).is_err());
    }
}
