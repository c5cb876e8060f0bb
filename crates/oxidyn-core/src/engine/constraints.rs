use crate::engine::error::EngineError;
use crate::engine::system::DistanceConstraint;
use nalgebra::{Point3, Vector3};

/// Relative tolerance on squared constraint lengths.
const SHAKE_TOLERANCE: f64 = 1e-8;
const MAX_ITERATIONS: usize = 150;

/// Iterative SHAKE/RATTLE solver for rigid distance constraints.
///
/// SHAKE projects positions back onto the constraint manifold after an
/// unconstrained update, using the pre-update geometry as the reference
/// direction; RATTLE removes the velocity components along each constraint.
#[derive(Debug, Clone)]
pub struct ConstraintSolver {
    constraints: Vec<DistanceConstraint>,
    inverse_masses: Vec<f64>,
}

impl ConstraintSolver {
    pub fn new(constraints: Vec<DistanceConstraint>, masses: &[f64]) -> Self {
        Self {
            constraints,
            inverse_masses: masses.iter().map(|&m| 1.0 / m).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// SHAKE pass: moves `positions` so every constrained distance matches
    /// its target, distributing the correction by inverse mass. `reference`
    /// holds the positions from before the unconstrained update.
    ///
    /// # Errors
    ///
    /// Returns a convergence error if the iteration cap is exceeded.
    pub fn apply_positions(
        &self,
        positions: &mut [Point3<f64>],
        reference: &[Point3<f64>],
    ) -> Result<(), EngineError> {
        if self.constraints.is_empty() {
            return Ok(());
        }

        for _ in 0..MAX_ITERATIONS {
            let mut converged = true;
            for constraint in &self.constraints {
                let (i, j) = (constraint.i, constraint.j);
                let target_sq = constraint.distance * constraint.distance;
                let delta = positions[i] - positions[j];
                let deviation = delta.norm_squared() - target_sq;
                if deviation.abs() <= SHAKE_TOLERANCE * target_sq {
                    continue;
                }
                converged = false;

                let reference_delta = reference[i] - reference[j];
                let reduced = self.inverse_masses[i] + self.inverse_masses[j];
                let alignment = delta.dot(&reference_delta);
                // A vanishing projection means the step rotated the pair
                // nearly perpendicular to its reference direction; fall back
                // to the current direction to stay numerically safe.
                let (direction, projection) = if alignment.abs() > 1e-12 {
                    (reference_delta, alignment)
                } else {
                    (delta, delta.norm_squared())
                };
                let g = deviation / (2.0 * reduced * projection);
                positions[i] -= direction * (g * self.inverse_masses[i]);
                positions[j] += direction * (g * self.inverse_masses[j]);
            }
            if converged {
                return Ok(());
            }
        }
        Err(EngineError::ConstraintConvergence {
            iterations: MAX_ITERATIONS,
        })
    }

    /// RATTLE pass: removes the relative velocity component along each
    /// constraint so the constrained distances stay fixed through time.
    pub fn apply_velocities(&self, velocities: &mut [Vector3<f64>], positions: &[Point3<f64>]) {
        if self.constraints.is_empty() {
            return;
        }

        for _ in 0..MAX_ITERATIONS {
            let mut converged = true;
            for constraint in &self.constraints {
                let (i, j) = (constraint.i, constraint.j);
                let delta = positions[i] - positions[j];
                let dist_sq = delta.norm_squared();
                if dist_sq < 1e-12 {
                    continue;
                }
                let relative = velocities[i] - velocities[j];
                let along = relative.dot(&delta);
                let reduced = self.inverse_masses[i] + self.inverse_masses[j];
                let kappa = along / (dist_sq * reduced);
                if kappa.abs() <= SHAKE_TOLERANCE.sqrt() {
                    continue;
                }
                converged = false;
                velocities[i] -= delta * (kappa * self.inverse_masses[i]);
                velocities[j] += delta * (kappa * self.inverse_masses[j]);
            }
            if converged {
                return;
            }
        }
    }
}
