//! Splitting a bound complex into isolated ligand and receptor structures

use crate::pose::{Pose, PoseError};

/// Partition a bound complex at one residue index.
///
/// Returns `(ligand, receptor)`: the ligand pose holds exactly the atoms of
/// the target residue, the receptor pose everything else. Head, tail and
/// interior positions all go through the same range-complement removal, so
/// there is no positional case split at this level. Both outputs come back
/// with their cached energy cleared; callers rescore.
pub fn decompose_at(pose: &Pose, residue_index: usize) -> Result<(Pose, Pose), PoseError> {
    let ligand = pose.only_residue(residue_index)?;
    let receptor = pose.without_residue(residue_index)?;
    Ok((ligand, receptor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::parse_pdb_string;

    const COMPLEX_PDB: &str = "\
ATOM      1  CA  GLY A   1       0.000   0.000   0.000  1.00  0.00           C
ATOM      2  CA  ALA A   2       4.000   0.000   0.000  1.00  0.00           C
HETATM    3  C1  LIG X   1       2.000   2.000   0.000  1.00  0.00           C
HETATM    4  O1  LIG X   1       2.500   2.800   0.000  1.00  0.00           O
ATOM      5  CA  SER B   1       8.000   0.000   0.000  1.00  0.00           C
END
";

    #[test]
    fn test_partition_is_exact() {
        let pose = parse_pdb_string(COMPLEX_PDB).expect("Should parse");
        let ligand_index = pose
            .find_residue(&"X 1".parse().expect("id"))
            .expect("Ligand present");

        let (ligand, receptor) = decompose_at(&pose, ligand_index).expect("Should split");

        // Set partition: no overlap, union equals the original atom set
        assert_eq!(ligand.total_atoms(), 2);
        assert_eq!(receptor.total_atoms(), pose.total_atoms() - 2);

        let ligand_serials: Vec<u32> =
            ligand.iter_atoms().map(|(_, a)| a.serial).collect();
        assert_eq!(ligand_serials, vec![3, 4]);

        for (_, atom) in receptor.iter_atoms() {
            assert!(!ligand_serials.contains(&atom.serial));
        }
    }

    // Interior position: the ligand sits between chains A and B, so removal
    // spans a head range and a tail range
    #[test]
    fn test_interior_ligand() {
        let pose = parse_pdb_string(COMPLEX_PDB).expect("Should parse");
        let (ligand, receptor) = decompose_at(&pose, 2).expect("Should split");
        assert_eq!(ligand.size(), 1);
        assert_eq!(receptor.size(), 3);
        // Receptor preserves residue order across the gap
        assert_eq!(receptor.residues[2].id.chain, 'B');
    }

    #[test]
    fn test_head_and_tail_ligand() {
        let pose = parse_pdb_string(COMPLEX_PDB).expect("Should parse");

        let (head, rest) = decompose_at(&pose, 0).expect("Should split head");
        assert_eq!(head.size(), 1);
        assert_eq!(rest.size(), 3);

        let last = pose.size() - 1;
        let (tail, rest) = decompose_at(&pose, last).expect("Should split tail");
        assert_eq!(tail.size(), 1);
        assert_eq!(rest.size(), 3);
    }

    #[test]
    fn test_energies_are_invalidated() {
        let mut pose = parse_pdb_string(COMPLEX_PDB).expect("Should parse");
        pose.energy = Some(-3.0);

        let (ligand, receptor) = decompose_at(&pose, 2).expect("Should split");
        assert!(ligand.energy.is_none());
        assert!(receptor.energy.is_none());
    }
}
