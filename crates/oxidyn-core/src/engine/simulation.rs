use crate::core::forcefield::term::EnergyTerm;
use crate::core::models::system::MolecularSystem;
use crate::core::utils::units;
use crate::engine::config::MinimizationConfig;
use crate::engine::constraints::ConstraintSolver;
use crate::engine::error::EngineError;
use crate::engine::forces::ForceEvaluator;
use crate::engine::integrator::LangevinMiddleIntegrator;
use crate::engine::minimize::{self, MinimizationResult};
use crate::engine::reporter::{ReportContext, Reporter};
use crate::engine::system::SimulationSystem;
use nalgebra::{Point3, Vector3};

/// A running simulation: the mutable binding of a simulatable system, an
/// integrator, and the current particle state.
///
/// Mirrors the driver-facing surface of the reference setup: set positions,
/// minimize, attach reporters, step.
pub struct Simulation<'a> {
    system: &'a SimulationSystem,
    working_system: MolecularSystem,
    evaluator: ForceEvaluator<'a>,
    integrator: LangevinMiddleIntegrator,
    constraints: ConstraintSolver,
    positions: Vec<Point3<f64>>,
    velocities: Vec<Vector3<f64>>,
    reporters: Vec<Box<dyn Reporter>>,
    step_count: u64,
}

impl<'a> Simulation<'a> {
    /// Binds a molecular system, its simulatable form, and an integrator.
    ///
    /// Positions start from the build-time snapshot; velocities are drawn
    /// from the Maxwell-Boltzmann distribution and projected onto the
    /// constraint manifold.
    pub fn new(
        molecular_system: &MolecularSystem,
        system: &'a SimulationSystem,
        mut integrator: LangevinMiddleIntegrator,
    ) -> Self {
        let constraints = ConstraintSolver::new(system.constraints.clone(), &system.masses);
        let positions = system.initial_positions.clone();
        let mut velocities = integrator.initialize_velocities(&system.masses);
        constraints.apply_velocities(&mut velocities, &positions);

        Self {
            system,
            working_system: molecular_system.clone(),
            evaluator: ForceEvaluator::new(system),
            integrator,
            constraints,
            positions,
            velocities,
            reporters: Vec::new(),
            step_count: 0,
        }
    }

    /// Replaces the current positions.
    ///
    /// # Errors
    ///
    /// Returns an initialization error if the length does not match the
    /// number of atoms.
    pub fn set_positions(&mut self, positions: Vec<Point3<f64>>) -> Result<(), EngineError> {
        if positions.len() != self.system.num_atoms() {
            return Err(EngineError::Initialization(format!(
                "Expected {} positions, got {}",
                self.system.num_atoms(),
                positions.len()
            )));
        }
        self.positions = positions;
        Ok(())
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn add_reporter(&mut self, reporter: Box<dyn Reporter>) {
        self.reporters.push(reporter);
    }

    /// Runs energy minimization on the current positions.
    ///
    /// # Errors
    ///
    /// Propagates non-finite energies and constraint failures.
    pub fn minimize_energy(
        &mut self,
        config: &MinimizationConfig,
    ) -> Result<MinimizationResult, EngineError> {
        minimize::minimize(
            &mut self.evaluator,
            &mut self.positions,
            &self.constraints,
            config,
        )
    }

    /// Advances the simulation by `n` timesteps, firing reporters at their
    /// intervals.
    ///
    /// # Errors
    ///
    /// Returns a numerical-instability error if the potential becomes
    /// non-finite, and propagates constraint and reporter failures.
    pub fn step(&mut self, n: u64) -> Result<(), EngineError> {
        for _ in 0..n {
            let (energy, forces) = self.evaluator.evaluate(&self.positions);
            if !energy.is_finite() {
                return Err(EngineError::NumericalInstability {
                    step: self.step_count,
                });
            }
            self.integrator.step(
                &mut self.positions,
                &mut self.velocities,
                &forces,
                &self.system.masses,
                &self.constraints,
            )?;
            self.step_count += 1;
            self.fire_due_reporters()?;
        }
        Ok(())
    }

    /// Flushes all reporters; call once after the last step.
    ///
    /// # Errors
    ///
    /// Propagates reporter output failures.
    pub fn finalize_reporters(&mut self) -> Result<(), EngineError> {
        for reporter in &mut self.reporters {
            reporter.finalize()?;
        }
        Ok(())
    }

    /// Current potential energy decomposition.
    pub fn potential_energy(&mut self) -> EnergyTerm {
        self.evaluator.evaluate(&self.positions).0
    }

    /// Current kinetic energy in kcal/mol.
    pub fn kinetic_energy(&self) -> f64 {
        self.velocities
            .iter()
            .zip(&self.system.masses)
            .map(|(velocity, &mass)| units::kinetic_energy(mass, velocity.norm_squared()))
            .sum()
    }

    /// Instantaneous temperature in Kelvin.
    pub fn temperature(&self) -> f64 {
        units::temperature_from_kinetic(self.kinetic_energy(), self.system.degrees_of_freedom())
    }

    /// Writes the current positions back into the molecular system and
    /// returns it.
    pub fn system_snapshot(&mut self) -> &MolecularSystem {
        for (index, &atom_id) in self.system.atom_ids.iter().enumerate() {
            if let Some(atom) = self.working_system.atom_mut(atom_id) {
                atom.position = self.positions[index];
            }
        }
        &self.working_system
    }

    fn fire_due_reporters(&mut self) -> Result<(), EngineError> {
        let due: Vec<usize> = self
            .reporters
            .iter()
            .enumerate()
            .filter(|(_, reporter)| {
                let interval = reporter.interval();
                interval > 0 && self.step_count % interval == 0
            })
            .map(|(index, _)| index)
            .collect();
        if due.is_empty() {
            return Ok(());
        }

        let (potential, _) = self.evaluator.evaluate(&self.positions);
        let kinetic = self.kinetic_energy();
        let temperature =
            units::temperature_from_kinetic(kinetic, self.system.degrees_of_freedom());
        for (index, &atom_id) in self.system.atom_ids.iter().enumerate() {
            if let Some(atom) = self.working_system.atom_mut(atom_id) {
                atom.position = self.positions[index];
            }
        }

        let context = ReportContext {
            step: self.step_count,
            potential,
            kinetic,
            temperature,
            system: &self.working_system,
        };
        for index in due {
            self.reporters[index].report(&context)?;
        }
        Ok(())
    }
}
