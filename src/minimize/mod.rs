//! Local energy minimization over selected degrees of freedom
//!
//! L-BFGS with Armijo backtracking line search and finite-difference
//! gradients, operating on the degrees of freedom selected by a [`MoveMap`]:
//! rigid-body jump translations/rotations and Cartesian coordinates of atoms
//! in flexible residues.

use nalgebra::{DVector, Unit, UnitQuaternion, Vector3};
use std::collections::HashMap;
use thiserror::Error;

use crate::pose::{Pose, PoseError};
use crate::scoring::ScoreFunction;

/// Errors that can occur during minimization
#[derive(Error, Debug)]
pub enum MinimizeError {
    #[error("No movable degrees of freedom selected")]
    NoDegreesOfFreedom,

    #[error("Pose error: {0}")]
    Pose(#[from] PoseError),
}

/// Selects which degrees of freedom may move during minimization
///
/// Mirrors the usual kinematics convention: jump (rigid-body) freedom is a
/// single switch, residue flexibility is a default plus per-residue
/// overrides.
#[derive(Debug, Clone, Default)]
pub struct MoveMap {
    jumps: bool,
    default_flexible: bool,
    overrides: HashMap<usize, bool>,
}

impl MoveMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow or forbid all rigid-body jump movement
    pub fn set_jump(&mut self, flexible: bool) {
        self.jumps = flexible;
    }

    /// Set the default flexibility for every residue
    pub fn set_all_residues(&mut self, flexible: bool) {
        self.default_flexible = flexible;
        self.overrides.clear();
    }

    /// Override flexibility for one residue (by internal index)
    pub fn set_residue(&mut self, residue_index: usize, flexible: bool) {
        self.overrides.insert(residue_index, flexible);
    }

    pub fn jumps_flexible(&self) -> bool {
        self.jumps
    }

    pub fn residue_flexible(&self, residue_index: usize) -> bool {
        *self
            .overrides
            .get(&residue_index)
            .unwrap_or(&self.default_flexible)
    }
}

/// Parameters for local minimization
#[derive(Debug, Clone)]
pub struct MinimizerParams {
    /// Step size for finite difference gradient computation
    pub gradient_step: f64,

    /// Initial step size for line search
    pub initial_step: f64,

    /// Convergence tolerance for energy change
    pub tolerance: f64,

    /// Convergence tolerance for gradient norm
    pub gradient_tolerance: f64,

    /// Maximum number of iterations
    pub max_iterations: usize,

    /// Armijo parameter for line search (c1)
    pub armijo_c1: f64,
}

impl Default for MinimizerParams {
    fn default() -> Self {
        Self {
            gradient_step: 0.01,
            initial_step: 0.1,
            tolerance: 1e-6,
            gradient_tolerance: 1e-4,
            max_iterations: 10_000,
            armijo_c1: 1e-4,
        }
    }
}

/// Degrees of freedom selected for one minimization run
struct DofLayout {
    /// Jumps whose 6 rigid-body DOFs are in the state vector
    jumps: Vec<usize>,

    /// (residue index, atom index) pairs whose coordinates are free
    atoms: Vec<(usize, usize)>,
}

impl DofLayout {
    fn from_movemap(pose: &Pose, movemap: &MoveMap) -> Self {
        let jumps = if movemap.jumps_flexible() {
            (0..pose.fold_tree.num_jumps()).collect()
        } else {
            Vec::new()
        };

        let mut atoms = Vec::new();
        for (res_idx, residue) in pose.residues.iter().enumerate() {
            if movemap.residue_flexible(res_idx) {
                for atom_idx in 0..residue.atoms.len() {
                    atoms.push((res_idx, atom_idx));
                }
            }
        }

        Self { jumps, atoms }
    }

    fn n_dof(&self) -> usize {
        6 * self.jumps.len() + 3 * self.atoms.len()
    }
}

/// Local minimizer using the L-BFGS method
pub struct Minimizer {
    pub params: MinimizerParams,
}

impl Default for Minimizer {
    fn default() -> Self {
        Self {
            params: MinimizerParams::default(),
        }
    }
}

impl Minimizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: MinimizerParams) -> Self {
        Self { params }
    }

    /// Minimize a pose under the score function, moving only what the
    /// movemap allows. Returns a new pose; the input is untouched.
    pub fn minimize(
        &self,
        pose: &Pose,
        score_fn: &ScoreFunction,
        movemap: &MoveMap,
    ) -> Result<Pose, MinimizeError> {
        let layout = DofLayout::from_movemap(pose, movemap);
        let n_dof = layout.n_dof();
        if n_dof == 0 {
            return Err(MinimizeError::NoDegreesOfFreedom);
        }

        // State is relative to the starting pose, so it begins at zero
        let mut x = DVector::zeros(n_dof);
        let mut energy = score_fn.total_energy(pose);

        // L-BFGS history
        let m = 10;
        let mut s_history: Vec<DVector<f64>> = Vec::with_capacity(m);
        let mut y_history: Vec<DVector<f64>> = Vec::with_capacity(m);
        let mut rho_history: Vec<f64> = Vec::with_capacity(m);

        let mut grad = self.compute_gradient(pose, score_fn, &layout, &x, energy)?;

        for _iter in 0..self.params.max_iterations {
            if grad.norm() < self.params.gradient_tolerance {
                break;
            }

            let direction = lbfgs_direction(&grad, &s_history, &y_history, &rho_history);

            let (step, new_energy) =
                self.line_search(pose, score_fn, &layout, &x, &direction, energy, &grad)?;

            if step < 1e-10 {
                // Line search failed, stop optimization
                break;
            }

            let new_x = &x + step * &direction;
            let new_grad =
                self.compute_gradient(pose, score_fn, &layout, &new_x, new_energy)?;

            // Update history when the curvature condition holds
            let s = &new_x - &x;
            let y = &new_grad - &grad;
            let sy = s.dot(&y);
            if sy > 1e-10 {
                if s_history.len() >= m {
                    s_history.remove(0);
                    y_history.remove(0);
                    rho_history.remove(0);
                }
                s_history.push(s);
                y_history.push(y);
                rho_history.push(1.0 / sy);
            }

            let converged = (new_energy - energy).abs() < self.params.tolerance;
            x = new_x;
            energy = new_energy;
            grad = new_grad;

            if converged {
                break;
            }
        }

        Ok(self.apply_state(pose, &layout, &x)?)
    }

    /// Build the pose that corresponds to a state vector
    fn apply_state(
        &self,
        base: &Pose,
        layout: &DofLayout,
        state: &DVector<f64>,
    ) -> Result<Pose, PoseError> {
        let mut pose = base.clone();

        // Rigid-body jump moves: translation plus axis-angle rotation about
        // the body centroid
        for (k, &jump_id) in layout.jumps.iter().enumerate() {
            let offset = 6 * k;
            let translation =
                Vector3::new(state[offset], state[offset + 1], state[offset + 2]);
            let rot_vec =
                Vector3::new(state[offset + 3], state[offset + 4], state[offset + 5]);

            let range = pose
                .fold_tree
                .jump(jump_id)
                .ok_or(PoseError::UnknownJump(jump_id, pose.fold_tree.num_jumps()))?
                .residues
                .clone();

            let rot_angle = rot_vec.norm();
            if rot_angle > 1e-12 {
                let center = pose.center_of_range(&range)?;
                let rotation =
                    UnitQuaternion::from_axis_angle(&Unit::new_normalize(rot_vec), rot_angle);
                for residue in &mut pose.residues[range.clone()] {
                    for atom in &mut residue.atoms {
                        let local = atom.coordinates - center;
                        atom.coordinates = rotation.transform_vector(&local) + center;
                    }
                }
            }

            for residue in &mut pose.residues[range] {
                for atom in &mut residue.atoms {
                    atom.coordinates += translation;
                }
            }
        }

        // Cartesian moves for atoms of flexible residues
        let atom_base = 6 * layout.jumps.len();
        for (k, &(res_idx, atom_idx)) in layout.atoms.iter().enumerate() {
            let offset = atom_base + 3 * k;
            let delta =
                Vector3::new(state[offset], state[offset + 1], state[offset + 2]);
            pose.residues[res_idx].atoms[atom_idx].coordinates += delta;
        }

        pose.energy = None;
        Ok(pose)
    }

    fn energy_of(
        &self,
        base: &Pose,
        score_fn: &ScoreFunction,
        layout: &DofLayout,
        state: &DVector<f64>,
    ) -> Result<f64, PoseError> {
        let pose = self.apply_state(base, layout, state)?;
        Ok(score_fn.total_energy(&pose))
    }

    /// Forward finite-difference gradient
    fn compute_gradient(
        &self,
        base: &Pose,
        score_fn: &ScoreFunction,
        layout: &DofLayout,
        state: &DVector<f64>,
        base_energy: f64,
    ) -> Result<DVector<f64>, MinimizeError> {
        let h = self.params.gradient_step;
        let mut grad = DVector::zeros(state.len());

        for i in 0..state.len() {
            let mut perturbed = state.clone();
            perturbed[i] += h;
            let energy_plus = self.energy_of(base, score_fn, layout, &perturbed)?;
            grad[i] = (energy_plus - base_energy) / h;
        }

        Ok(grad)
    }

    /// Backtracking line search with the Armijo condition
    fn line_search(
        &self,
        base: &Pose,
        score_fn: &ScoreFunction,
        layout: &DofLayout,
        x: &DVector<f64>,
        direction: &DVector<f64>,
        current_energy: f64,
        grad: &DVector<f64>,
    ) -> Result<(f64, f64), MinimizeError> {
        let mut step = self.params.initial_step;
        let c1 = self.params.armijo_c1;
        let shrink = 0.5;

        let directional_derivative = grad.dot(direction);
        if directional_derivative >= 0.0 {
            // Not a descent direction
            return Ok((0.0, current_energy));
        }

        for _ in 0..20 {
            let candidate = x + step * direction;
            let energy = self.energy_of(base, score_fn, layout, &candidate)?;

            if energy <= current_energy + c1 * step * directional_derivative {
                return Ok((step, energy));
            }
            step *= shrink;
        }

        Ok((0.0, current_energy))
    }
}

/// L-BFGS two-loop recursion to compute the search direction
fn lbfgs_direction(
    grad: &DVector<f64>,
    s_history: &[DVector<f64>],
    y_history: &[DVector<f64>],
    rho_history: &[f64],
) -> DVector<f64> {
    if s_history.is_empty() {
        // No history yet: steepest descent
        return -grad.clone();
    }

    let k = s_history.len();
    let mut q = grad.clone();
    let mut alpha = vec![0.0; k];

    for i in (0..k).rev() {
        alpha[i] = rho_history[i] * s_history[i].dot(&q);
        q = &q - alpha[i] * &y_history[i];
    }

    // Initial Hessian approximation (scaled identity)
    let gamma =
        s_history[k - 1].dot(&y_history[k - 1]) / y_history[k - 1].dot(&y_history[k - 1]);
    let mut r = gamma * q;

    for i in 0..k {
        let beta = rho_history[i] * y_history[i].dot(&r);
        r = &r + (alpha[i] - beta) * &s_history[i];
    }

    -r
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::parse_pdb_string;

    // Two carbon atoms on separate chains, slightly inside contact distance
    const CLASH_PDB: &str = "\
ATOM      1  CA  ALA A   1       0.000   0.000   0.000  1.00  0.00           C
HETATM    2  C1  LIG X   1       2.000   0.000   0.000  1.00  0.00           C
END
";

    #[test]
    fn test_minimize_requires_some_freedom() {
        let pose = parse_pdb_string(CLASH_PDB).expect("Should parse");
        let movemap = MoveMap::new();
        let result = Minimizer::new().minimize(&pose, &ScoreFunction::new(), &movemap);
        assert!(matches!(result, Err(MinimizeError::NoDegreesOfFreedom)));
    }

    #[test]
    fn test_minimize_lowers_energy() {
        let pose = parse_pdb_string(CLASH_PDB).expect("Should parse");
        let sfxn = ScoreFunction::new();
        let start_energy = sfxn.total_energy(&pose);

        let mut movemap = MoveMap::new();
        movemap.set_jump(true);

        let params = MinimizerParams {
            max_iterations: 200,
            ..MinimizerParams::default()
        };
        let minimized = Minimizer::with_params(params)
            .minimize(&pose, &sfxn, &movemap)
            .expect("Should minimize");

        let end_energy = sfxn.total_energy(&minimized);
        assert!(
            end_energy <= start_energy,
            "Minimization should not raise energy: {} -> {}",
            start_energy,
            end_energy
        );

        // Input pose untouched
        assert_eq!(pose.residues[1].atoms[0].coordinates.x, 2.0);
    }

    #[test]
    fn test_jump_only_minimization_keeps_root_fixed() {
        let pose = parse_pdb_string(CLASH_PDB).expect("Should parse");
        let sfxn = ScoreFunction::new();

        let mut movemap = MoveMap::new();
        movemap.set_jump(true);

        let params = MinimizerParams {
            max_iterations: 100,
            ..MinimizerParams::default()
        };
        let minimized = Minimizer::with_params(params)
            .minimize(&pose, &sfxn, &movemap)
            .expect("Should minimize");

        // Root body (chain A) has no free DOFs
        assert_eq!(
            minimized.residues[0].atoms[0].coordinates,
            pose.residues[0].atoms[0].coordinates
        );
    }

    #[test]
    fn test_movemap_overrides() {
        let mut movemap = MoveMap::new();
        assert!(!movemap.residue_flexible(0));

        movemap.set_all_residues(true);
        assert!(movemap.residue_flexible(7));

        movemap.set_residue(7, false);
        assert!(!movemap.residue_flexible(7));
        assert!(movemap.residue_flexible(3));
    }
}
