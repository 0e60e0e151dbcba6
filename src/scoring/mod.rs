//! Pairwise energy function used as the fitness signal for pose edits
//!
//! A compact stand-in for a full molecular mechanics score: Gaussian
//! attraction around contact distance, quadratic clash repulsion, Coulomb
//! electrostatics and a distance-based hydrogen bond term. The absolute
//! values are not calibrated against any published force field; they only
//! need to respond smoothly to geometry changes so that minimization and
//! bound/unbound energy deltas behave sensibly.

use crate::atom::{Atom, Element};
use crate::pose::Pose;

/// Interaction cutoff in Angstroms; pairs beyond this contribute nothing
pub const INTERACTION_CUTOFF: f64 = 8.0;

/// Weights and shape parameters of the score function
#[derive(Debug, Clone)]
pub struct ScoreParams {
    pub weight_gauss: f64,
    pub weight_repulsion: f64,
    pub weight_hydrophobic: f64,
    pub weight_hydrogen: f64,

    // Gaussian well shape
    pub gaussian_width: f64,

    // Hydrogen bond parameters
    pub hydrogen_bond_dist_cutoff: f64,
}

impl Default for ScoreParams {
    fn default() -> Self {
        Self {
            weight_gauss: -0.0356,
            weight_repulsion: 0.840,
            weight_hydrophobic: -0.0351,
            weight_hydrogen: -0.587,

            gaussian_width: 0.5,

            hydrogen_bond_dist_cutoff: 4.0,
        }
    }
}

/// The energy function applied to poses
#[derive(Debug, Clone, Default)]
pub struct ScoreFunction {
    pub params: ScoreParams,
}

impl ScoreFunction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: ScoreParams) -> Self {
        Self { params }
    }

    /// Interaction energy between two atoms at a known distance
    pub fn atom_pair_energy(&self, atom1: &Atom, atom2: &Atom, distance: f64) -> f64 {
        // Early return outside the cutoff or for degenerate overlaps
        if distance > INTERACTION_CUTOFF || distance < 0.01 {
            return 0.0;
        }

        self.vdw_energy(atom1, atom2, distance)
            + self.hbond_energy(atom1, atom2, distance)
            + self.hydrophobic_energy(atom1, atom2, distance)
            + self.electrostatic_energy(atom1, atom2, distance)
    }

    fn vdw_energy(&self, atom1: &Atom, atom2: &Atom, distance: f64) -> f64 {
        // Optimal distance is the sum of vdW radii
        let optimal_dist = atom1.element.radius() + atom2.element.radius();

        // Gaussian attractive term
        let gauss = self.params.weight_gauss
            * (-(distance - optimal_dist).powi(2)
                / (2.0 * self.params.gaussian_width.powi(2)))
            .exp();

        // Repulsive term (only when atoms are too close)
        let repulsion = if distance < optimal_dist {
            self.params.weight_repulsion * (optimal_dist - distance).powi(2)
        } else {
            0.0
        };

        gauss + repulsion
    }

    fn electrostatic_energy(&self, atom1: &Atom, atom2: &Atom, distance: f64) -> f64 {
        // Coulomb with distance-dependent dielectric
        332.0 * atom1.charge * atom2.charge / (distance * distance)
    }

    fn hbond_energy(&self, atom1: &Atom, atom2: &Atom, distance: f64) -> f64 {
        // Both partners must be polar heavy atoms
        if !atom1.is_polar() || !atom2.is_polar() {
            return 0.0;
        }

        if distance > self.params.hydrogen_bond_dist_cutoff {
            return 0.0;
        }

        // Full strength at typical H-bond distance, linear falloff to cutoff
        let optimal_dist = 1.9;
        let strength = if distance <= optimal_dist {
            1.0
        } else {
            1.0 - (distance - optimal_dist)
                / (self.params.hydrogen_bond_dist_cutoff - optimal_dist)
        };

        self.params.weight_hydrogen * strength
    }

    fn hydrophobic_energy(&self, atom1: &Atom, atom2: &Atom, distance: f64) -> f64 {
        let both_carbon =
            atom1.element == Element::Carbon && atom2.element == Element::Carbon;
        if !both_carbon {
            return 0.0;
        }

        let r_max = 4.5;
        let r_min = 0.5;
        if distance > r_max || distance < r_min {
            return 0.0;
        }

        // Linear interpolation between cutoffs
        let factor = (r_max - distance) / (r_max - r_min);
        self.params.weight_hydrophobic * factor
    }

    /// Total potential over all atom pairs in distinct residues
    ///
    /// Same-residue pairs are excluded as a proxy for bonded interactions.
    pub fn total_energy(&self, pose: &Pose) -> f64 {
        let atoms: Vec<(usize, &Atom)> = pose.iter_atoms().collect();
        let mut energy = 0.0;

        for i in 0..atoms.len() {
            for j in (i + 1)..atoms.len() {
                let (res_i, atom_i) = atoms[i];
                let (res_j, atom_j) = atoms[j];
                if res_i == res_j {
                    continue;
                }

                let distance = atom_i.distance(atom_j);
                if distance < INTERACTION_CUTOFF {
                    energy += self.atom_pair_energy(atom_i, atom_j, distance);
                }
            }
        }

        energy
    }

    /// Score a pose and cache the result on it
    pub fn score(&self, pose: &mut Pose) -> f64 {
        let energy = self.total_energy(pose);
        pose.energy = Some(energy);
        energy
    }

    /// Cross-interaction energy between two independent poses
    ///
    /// Used for bound/unbound comparisons: atoms within one pose never pair.
    pub fn interaction_energy(&self, a: &Pose, b: &Pose) -> f64 {
        let mut energy = 0.0;
        for (_, atom_a) in a.iter_atoms() {
            for (_, atom_b) in b.iter_atoms() {
                let distance = atom_a.distance(atom_b);
                if distance < INTERACTION_CUTOFF {
                    energy += self.atom_pair_energy(atom_a, atom_b, distance);
                }
            }
        }
        energy
    }
}
