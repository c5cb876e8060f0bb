use crate::core::utils::units::{ACCEL_CONVERSION, BOLTZMANN_KCAL_MOL_K};
use crate::engine::constraints::ConstraintSolver;
use crate::engine::error::EngineError;
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Langevin dynamics with the "middle" (BAOAB) splitting.
///
/// One step applies a full-timestep force kick, a half drift, the exact
/// Ornstein-Uhlenbeck friction/noise update, and a second half drift. The
/// thermostat placement in the middle of the drift is what tolerates the
/// 4 fs hydrogen-constrained timestep of the reference setup.
pub struct LangevinMiddleIntegrator {
    /// Target temperature in Kelvin.
    temperature: f64,
    /// Friction rate in 1/ps.
    friction: f64,
    /// Timestep in ps.
    timestep: f64,
    rng: StdRng,
}

impl LangevinMiddleIntegrator {
    /// Creates an integrator. A fixed `seed` makes trajectories
    /// bit-reproducible; `None` draws fresh entropy.
    pub fn new(temperature: f64, friction: f64, timestep: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            temperature,
            friction,
            timestep,
            rng,
        }
    }

    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Draws initial velocities from the Maxwell-Boltzmann distribution at
    /// the target temperature, in Å/ps.
    pub fn initialize_velocities(&mut self, masses: &[f64]) -> Vec<Vector3<f64>> {
        masses
            .iter()
            .map(|&mass| {
                let scale = (BOLTZMANN_KCAL_MOL_K * self.temperature * ACCEL_CONVERSION / mass)
                    .sqrt();
                Vector3::new(
                    scale * self.rng.sample::<f64, _>(StandardNormal),
                    scale * self.rng.sample::<f64, _>(StandardNormal),
                    scale * self.rng.sample::<f64, _>(StandardNormal),
                )
            })
            .collect()
    }

    /// Advances positions and velocities by one timestep.
    ///
    /// `forces` must hold the forces at the entry positions in kcal/mol/Å.
    /// Constrained systems get a SHAKE projection after the drift and RATTLE
    /// velocity passes around the stochastic update.
    ///
    /// # Errors
    ///
    /// Propagates constraint-convergence failures.
    pub fn step(
        &mut self,
        positions: &mut [Point3<f64>],
        velocities: &mut [Vector3<f64>],
        forces: &[Vector3<f64>],
        masses: &[f64],
        constraints: &ConstraintSolver,
    ) -> Result<(), EngineError> {
        let dt = self.timestep;
        let half_dt = 0.5 * dt;

        // B: full-step velocity kick.
        for ((velocity, force), &mass) in velocities.iter_mut().zip(forces).zip(masses) {
            *velocity += force * (dt * ACCEL_CONVERSION / mass);
        }
        constraints.apply_velocities(velocities, positions);

        let reference: Vec<Point3<f64>> = positions.to_vec();

        // A: first half drift.
        for (position, velocity) in positions.iter_mut().zip(velocities.iter()) {
            *position += velocity * half_dt;
        }

        // O: exact Ornstein-Uhlenbeck update.
        let decay = (-self.friction * dt).exp();
        let noise_scale = (1.0 - decay * decay).sqrt();
        for (velocity, &mass) in velocities.iter_mut().zip(masses) {
            let thermal =
                (BOLTZMANN_KCAL_MOL_K * self.temperature * ACCEL_CONVERSION / mass).sqrt();
            let xi = Vector3::new(
                self.rng.sample::<f64, _>(StandardNormal),
                self.rng.sample::<f64, _>(StandardNormal),
                self.rng.sample::<f64, _>(StandardNormal),
            );
            *velocity = *velocity * decay + xi * (thermal * noise_scale);
        }

        // A: second half drift.
        for (position, velocity) in positions.iter_mut().zip(velocities.iter()) {
            *position += velocity * half_dt;
        }

        if !constraints.is_empty() {
            constraints.apply_positions(positions, &reference)?;
            // Velocity correction consistent with the projected positions.
            constraints.apply_velocities(velocities, positions);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::utils::units;

    fn free_particle_setup() -> (Vec<Point3<f64>>, Vec<f64>) {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(0.0, 3.0, 0.0),
            Point3::new(3.0, 3.0, 0.0),
        ];
        let masses = vec![15.999, 12.011, 1.008, 14.007];
        (positions, masses)
    }

    fn total_kinetic(velocities: &[Vector3<f64>], masses: &[f64]) -> f64 {
        velocities
            .iter()
            .zip(masses)
            .map(|(v, &m)| units::kinetic_energy(m, v.norm_squared()))
            .sum()
    }

    #[test]
    fn seeded_integrators_produce_identical_trajectories() {
        let (positions, masses) = free_particle_setup();
        let solver = ConstraintSolver::new(Vec::new(), &masses);
        let forces = vec![Vector3::zeros(); masses.len()];

        let run = |seed: u64| {
            let mut integrator = LangevinMiddleIntegrator::new(300.0, 1.0, 0.002, Some(seed));
            let mut pos = positions.clone();
            let mut vel = integrator.initialize_velocities(&masses);
            for _ in 0..25 {
                integrator
                    .step(&mut pos, &mut vel, &forces, &masses, &solver)
                    .unwrap();
            }
            (pos, vel)
        };

        let (pos_a, vel_a) = run(7);
        let (pos_b, vel_b) = run(7);
        assert_eq!(pos_a, pos_b);
        assert_eq!(vel_a, vel_b);

        let (pos_c, _) = run(8);
        assert_ne!(pos_a, pos_c, "different seeds must diverge");
    }

    #[test]
    fn initial_velocities_sample_the_target_temperature() {
        let masses = vec![12.011; 600];
        let mut integrator = LangevinMiddleIntegrator::new(300.0, 1.0, 0.002, Some(11));
        let velocities = integrator.initialize_velocities(&masses);

        let kinetic = total_kinetic(&velocities, &masses);
        let temperature = units::temperature_from_kinetic(kinetic, 3 * masses.len());
        assert!(
            (temperature - 300.0).abs() < 35.0,
            "sampled temperature {} is far from 300 K",
            temperature
        );
    }

    #[test]
    fn thermostat_equilibrates_free_particles_to_target_temperature() {
        let masses = vec![12.011; 200];
        let positions: Vec<Point3<f64>> = (0..200)
            .map(|i| Point3::new(i as f64 * 2.0, 0.0, 0.0))
            .collect();
        let solver = ConstraintSolver::new(Vec::new(), &masses);
        let forces = vec![Vector3::zeros(); masses.len()];

        let mut integrator = LangevinMiddleIntegrator::new(300.0, 5.0, 0.002, Some(3));
        let mut pos = positions;
        // Start cold; the thermostat must heat the system.
        let mut vel = vec![Vector3::zeros(); masses.len()];

        let mut averaged = 0.0;
        let mut samples = 0;
        for step in 0..800 {
            integrator
                .step(&mut pos, &mut vel, &forces, &masses, &solver)
                .unwrap();
            if step >= 400 {
                let kinetic = total_kinetic(&vel, &masses);
                averaged += units::temperature_from_kinetic(kinetic, 3 * masses.len());
                samples += 1;
            }
        }
        let mean_temperature = averaged / samples as f64;
        assert!(
            (mean_temperature - 300.0).abs() < 30.0,
            "equilibrated at {} K instead of ~300 K",
            mean_temperature
        );
    }

    #[test]
    fn constrained_distance_survives_dynamics() {
        use crate::engine::system::DistanceConstraint;

        let positions = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let masses = vec![15.999, 1.008];
        let solver = ConstraintSolver::new(
            vec![DistanceConstraint {
                i: 0,
                j: 1,
                distance: 1.0,
            }],
            &masses,
        );
        let forces = vec![Vector3::zeros(); 2];

        let mut integrator = LangevinMiddleIntegrator::new(300.0, 1.0, 0.004, Some(19));
        let mut pos = positions;
        let mut vel = integrator.initialize_velocities(&masses);
        solver.apply_velocities(&mut vel, &pos);

        for _ in 0..100 {
            integrator
                .step(&mut pos, &mut vel, &forces, &masses, &solver)
                .unwrap();
            let dist = (pos[0] - pos[1]).norm();
            assert!(
                (dist - 1.0).abs() < 1e-5,
                "constraint drifted to {}",
                dist
            );
        }
    }
}
