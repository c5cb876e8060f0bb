use crate::engine::config::MinimizationConfig;
use crate::engine::constraints::ConstraintSolver;
use crate::engine::error::EngineError;
use crate::engine::forces::ForceEvaluator;
use nalgebra::{Point3, Vector3};
use tracing::debug;

// FIRE parameters from the original algorithm description.
const ALPHA_START: f64 = 0.1;
const F_ALPHA: f64 = 0.99;
const F_INC: f64 = 1.1;
const F_DEC: f64 = 0.5;
const N_MIN: usize = 5;
const DT_START: f64 = 2e-3;
const DT_MAX: f64 = 1e-2;
/// Per-atom displacement cap in Angstroms; keeps clashed starting
/// structures from being launched across the cell.
const MAX_STEP: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimizationResult {
    pub initial_energy: f64,
    pub final_energy: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// FIRE (fast inertial relaxation engine) energy minimization.
///
/// Damped pseudo-dynamics on the potential surface: velocities follow the
/// forces, accelerate while the power stays positive, and reset on uphill
/// moves. Constrained systems are re-projected with SHAKE after every
/// position update.
///
/// # Errors
///
/// Returns a numerical-instability error if the potential becomes
/// non-finite, or propagates constraint failures.
pub fn minimize(
    evaluator: &mut ForceEvaluator,
    positions: &mut [Point3<f64>],
    constraints: &ConstraintSolver,
    config: &MinimizationConfig,
) -> Result<MinimizationResult, EngineError> {
    let (energy, mut forces) = evaluator.evaluate(positions);
    if !energy.is_finite() {
        return Err(EngineError::NumericalInstability { step: 0 });
    }
    let initial_energy = energy.total();
    let mut last_energy = initial_energy;

    let mut velocities: Vec<Vector3<f64>> = vec![Vector3::zeros(); positions.len()];
    let mut dt = DT_START;
    let mut alpha = ALPHA_START;
    let mut steps_since_uphill = 0;

    for iteration in 0..config.max_iterations {
        let max_force = forces.iter().map(|f| f.norm()).fold(0.0, f64::max);
        if max_force <= config.force_tolerance {
            debug!(
                "Minimization converged after {} iterations (max force {:.4}).",
                iteration, max_force
            );
            return Ok(MinimizationResult {
                initial_energy,
                final_energy: last_energy,
                iterations: iteration,
                converged: true,
            });
        }

        // FIRE velocity mixing.
        let power: f64 = forces
            .iter()
            .zip(velocities.iter())
            .map(|(f, v)| f.dot(v))
            .sum();
        if power > 0.0 {
            steps_since_uphill += 1;
            if steps_since_uphill > N_MIN {
                dt = (dt * F_INC).min(DT_MAX);
                alpha *= F_ALPHA;
            }
        } else {
            velocities.iter_mut().for_each(|v| *v = Vector3::zeros());
            dt *= F_DEC;
            alpha = ALPHA_START;
            steps_since_uphill = 0;
        }

        for (velocity, force) in velocities.iter_mut().zip(forces.iter()) {
            *velocity += force * dt;
        }
        let force_norm: f64 = forces.iter().map(|f| f.norm_squared()).sum::<f64>().sqrt();
        let velocity_norm: f64 = velocities
            .iter()
            .map(|v| v.norm_squared())
            .sum::<f64>()
            .sqrt();
        if force_norm > 1e-12 {
            for (velocity, force) in velocities.iter_mut().zip(forces.iter()) {
                *velocity =
                    *velocity * (1.0 - alpha) + force * (alpha * velocity_norm / force_norm);
            }
        }

        // Capped position update.
        let reference: Vec<Point3<f64>> = positions.to_vec();
        for (position, velocity) in positions.iter_mut().zip(velocities.iter()) {
            let mut displacement = velocity * dt;
            let length = displacement.norm();
            if length > MAX_STEP {
                displacement *= MAX_STEP / length;
            }
            *position += displacement;
        }
        if !constraints.is_empty() {
            constraints.apply_positions(positions, &reference)?;
        }

        let (energy, new_forces) = evaluator.evaluate(positions);
        if !energy.is_finite() {
            return Err(EngineError::NumericalInstability {
                step: iteration as u64,
            });
        }
        last_energy = energy.total();
        forces = new_forces;
    }

    debug!(
        "Minimization stopped at the iteration cap ({}).",
        config.max_iterations
    );
    Ok(MinimizationResult {
        initial_energy,
        final_energy: last_energy,
        iterations: config.max_iterations,
        converged: false,
    })
}
