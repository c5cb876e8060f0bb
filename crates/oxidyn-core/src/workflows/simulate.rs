use crate::core::forcefield::parameterization::Parameterizer;
use crate::core::forcefield::params::Forcefield;
use crate::core::models::system::MolecularSystem;
use crate::engine::config::SimulateConfig;
use crate::engine::error::EngineError;
use crate::engine::integrator::LangevinMiddleIntegrator;
use crate::engine::minimize::MinimizationResult;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::reporter::Reporter;
use crate::engine::simulation::Simulation;
use crate::engine::system::SimulationSystem;
use std::time::{Duration, Instant};
use tracing::{info, instrument};

/// Wall-clock durations of the run phases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timings {
    pub minimization: Duration,
    pub stepping: Duration,
    pub total: Duration,
}

/// Outcome of a complete simulation workflow.
#[derive(Debug, Clone)]
pub struct SimulateResult {
    /// The input system with final coordinates written back.
    pub final_system: MolecularSystem,
    /// Potential energy before minimization, kcal/mol.
    pub initial_potential: f64,
    /// Potential energy after minimization, kcal/mol.
    pub minimized_potential: f64,
    /// Potential energy after dynamics, kcal/mol.
    pub final_potential: f64,
    /// Whether the minimizer reached its force tolerance.
    pub minimization_converged: bool,
    pub steps_run: u64,
    pub timings: Timings,
}

/// Runs the full simulation flow: load force field, parameterize, build the
/// simulatable system, minimize, and step with the given reporters.
///
/// # Errors
///
/// Propagates force-field loading, parameterization, system construction,
/// numerical, and output errors.
#[instrument(skip_all, name = "simulate_workflow")]
pub fn run(
    initial_system: &MolecularSystem,
    config: &SimulateConfig,
    reporters: Vec<Box<dyn Reporter>>,
    progress: &ProgressReporter,
) -> Result<SimulateResult, EngineError> {
    let run_start = Instant::now();

    // === Phase 0: Preparation and Parameterization ===
    progress.report(Progress::PhaseStart {
        name: "Preparation",
    });
    info!(
        "Loading {} parameter set(s) and parameterizing the system.",
        config.forcefield_paths.len()
    );

    let forcefield = Forcefield::load(&config.forcefield_paths)?;
    let mut working_system = initial_system.clone();
    Parameterizer::new(&forcefield).parameterize_system(&mut working_system)?;

    let sim_system = SimulationSystem::build(
        &working_system,
        &forcefield,
        config.nonbonded,
        config.constraints,
    )?;
    info!(
        atoms = sim_system.num_atoms(),
        bonds = sim_system.bonds.len(),
        angles = sim_system.angles.len(),
        torsions = sim_system.torsions.len(),
        constraints = sim_system.constraints.len(),
        "Simulatable system built."
    );

    let integrator = LangevinMiddleIntegrator::new(
        config.integrator.temperature,
        config.integrator.friction,
        config.integrator.timestep,
        config.seed,
    );
    let mut simulation = Simulation::new(&working_system, &sim_system, integrator);
    progress.report(Progress::PhaseFinish);

    // === Phase 1: Energy minimization ===
    progress.report(Progress::PhaseStart {
        name: "Minimizing energy",
    });
    let minimize_start = Instant::now();
    let MinimizationResult {
        initial_energy,
        final_energy,
        iterations,
        converged,
    } = simulation.minimize_energy(&config.minimization)?;
    let minimization_time = minimize_start.elapsed();
    info!(
        initial = initial_energy,
        minimized = final_energy,
        iterations,
        converged,
        "Minimization finished."
    );
    progress.report(Progress::PhaseFinish);

    // === Phase 2: Dynamics ===
    progress.report(Progress::PhaseStart { name: "Dynamics" });
    progress.report(Progress::TaskStart {
        total_steps: config.steps,
    });
    for reporter in reporters {
        simulation.add_reporter(reporter);
    }

    let stepping_start = Instant::now();
    for _ in 0..config.steps {
        simulation.step(1)?;
        progress.report(Progress::TaskIncrement);
    }
    simulation.finalize_reporters()?;
    let stepping_time = stepping_start.elapsed();
    progress.report(Progress::TaskFinish);
    progress.report(Progress::PhaseFinish);

    let final_potential = simulation.potential_energy().total();
    let final_system = simulation.system_snapshot().clone();
    info!(
        final_potential,
        steps = config.steps,
        "Dynamics finished."
    );

    Ok(SimulateResult {
        final_system,
        initial_potential: initial_energy,
        minimized_potential: final_energy,
        final_potential,
        minimization_converged: converged,
        steps_run: config.steps,
        timings: Timings {
            minimization: minimization_time,
            stepping: stepping_time,
            total: run_start.elapsed(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::pdb::PdbFile;
    use crate::core::io::traits::MolecularFile;
    use crate::engine::config::{
        ConstraintPolicy, MinimizationConfig, NonbondedMethod, SimulateConfigBuilder,
    };
    use crate::engine::reporter::{StateDataReporter, TrajectoryReporter};
    use std::fs;
    use std::io::BufReader;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    const WATER_SET: &str = r#"
[globals]
coulomb14_scale = 0.8333333333
lj14_scale = 0.5

[types.OW]
mass = 15.999
sigma = 3.1655
epsilon = 0.1784

[types.HW]
mass = 1.008
sigma = 1.0
epsilon = 0.0

[bonds."OW-HW"]
k = 450.0
r0 = 0.9572

[angles."HW-OW-HW"]
k = 55.0
theta0 = 104.52

[templates.HOH]
atoms = [
    { name = "O", type = "OW", charge = -0.8476 },
    { name = "H1", type = "HW", charge = 0.4238 },
    { name = "H2", type = "HW", charge = 0.4238 },
]
bonds = [["O", "H1"], ["O", "H2"]]
"#;

    const WATER_PDB: &str = "\
CRYST1   18.000   18.000   18.000  90.00  90.00  90.00 P 1           1
HETATM    1  O   HOH W   1       5.000   5.000   5.000  1.00  0.00           O
HETATM    2  H1  HOH W   1       5.957   5.000   5.000  1.00  0.00           H
HETATM    3  H2  HOH W   1       4.760   5.927   5.000  1.00  0.00           H
HETATM    4  O   HOH W   2       9.000   5.400   5.200  1.00  0.00           O
HETATM    5  H1  HOH W   2       9.957   5.400   5.200  1.00  0.00           H
HETATM    6  H2  HOH W   2       8.760   6.327   5.200  1.00  0.00           H
END
";

    struct Fixture {
        dir: TempDir,
        system: MolecularSystem,
        forcefield_path: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let forcefield_path = dir.path().join("water.toml");
        fs::write(&forcefield_path, WATER_SET).unwrap();

        let mut reader = BufReader::new(WATER_PDB.as_bytes());
        let (system, _) = PdbFile::read_from(&mut reader).unwrap();

        Fixture {
            dir,
            system,
            forcefield_path,
        }
    }

    fn config(fixture: &Fixture, steps: u64, seed: u64) -> SimulateConfig {
        SimulateConfigBuilder::new()
            .forcefield_paths(vec![fixture.forcefield_path.clone()])
            .nonbonded(NonbondedMethod::Pme { cutoff: 8.0 })
            .constraints(ConstraintPolicy::HBonds)
            .temperature(300.0)
            .friction(1.0)
            .timestep(0.002)
            .minimization(MinimizationConfig {
                force_tolerance: 1.0,
                max_iterations: 500,
            })
            .steps(steps)
            .seed(seed)
            .build()
            .unwrap()
    }

    #[test]
    fn workflow_produces_trajectory_and_finite_energies() {
        let fixture = fixture();
        let config = config(&fixture, 20, 42);
        let output_path = fixture.dir.path().join("output.pdb");

        let reporters: Vec<Box<dyn Reporter>> = vec![Box::new(
            TrajectoryReporter::create(&output_path, 10).unwrap(),
        )];
        let result = run(
            &fixture.system,
            &config,
            reporters,
            &ProgressReporter::new(),
        )
        .unwrap();

        assert!(result.initial_potential.is_finite());
        assert!(result.minimized_potential.is_finite());
        assert!(result.final_potential.is_finite());
        assert!(result.minimized_potential <= result.initial_potential + 1e-9);
        assert_eq!(result.steps_run, 20);
        assert!(result.timings.total >= result.timings.stepping);

        let content = fs::read_to_string(&output_path).unwrap();
        assert!(!content.is_empty(), "trajectory must not be empty");
        let frames = content.lines().filter(|l| l.starts_with("MODEL")).count();
        assert_eq!(frames, 2, "20 steps at interval 10 yield 2 frames");
        assert!(content.trim_end().ends_with("END"));
    }

    #[test]
    fn workflow_emits_state_rows_at_the_report_interval() {
        let fixture = fixture();
        let config = config(&fixture, 20, 7);

        #[derive(Clone, Default)]
        struct SharedBuffer(Arc<Mutex<Vec<u8>>>);
        impl std::io::Write for SharedBuffer {
            fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(data);
                Ok(data.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let buffer = SharedBuffer::default();
        let reporters: Vec<Box<dyn Reporter>> =
            vec![Box::new(StateDataReporter::new(buffer.clone(), 10))];
        run(
            &fixture.system,
            &config,
            reporters,
            &ProgressReporter::new(),
        )
        .unwrap();

        let content = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3, "header plus rows for steps 10 and 20");
        assert!(lines[0].contains("Step"));
        assert!(lines[1].starts_with("\"10\""));
        assert!(lines[2].starts_with("\"20\""));
    }

    #[test]
    fn workflow_is_deterministic_under_a_fixed_seed() {
        let fixture = fixture();
        let config_a = config(&fixture, 15, 99);
        let config_b = config(&fixture, 15, 99);

        let result_a = run(
            &fixture.system,
            &config_a,
            Vec::new(),
            &ProgressReporter::new(),
        )
        .unwrap();
        let result_b = run(
            &fixture.system,
            &config_b,
            Vec::new(),
            &ProgressReporter::new(),
        )
        .unwrap();

        assert_eq!(result_a.final_potential, result_b.final_potential);
        for ((_, atom_a), (_, atom_b)) in result_a
            .final_system
            .atoms_iter()
            .zip(result_b.final_system.atoms_iter())
        {
            assert_eq!(atom_a.position, atom_b.position);
        }
    }

    #[test]
    fn workflow_fails_cleanly_for_a_missing_forcefield_file() {
        let fixture = fixture();
        let mut config = config(&fixture, 5, 1);
        config.forcefield_paths = vec![fixture.dir.path().join("absent.toml")];

        let result = run(
            &fixture.system,
            &config,
            Vec::new(),
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(EngineError::ParamLoad { .. })));
    }

    #[test]
    fn workflow_reports_progress_phases_in_order() {
        let fixture = fixture();
        let config = config(&fixture, 4, 3);

        let events = Arc::new(Mutex::new(Vec::new()));
        let events_sink = events.clone();
        let progress = ProgressReporter::with_callback(Box::new(move |event| {
            events_sink.lock().unwrap().push(format!("{:?}", event));
        }));

        run(&fixture.system, &config, Vec::new(), &progress).unwrap();

        let events = events.lock().unwrap();
        let phases: Vec<&String> = events.iter().filter(|e| e.contains("PhaseStart")).collect();
        assert_eq!(phases.len(), 3);
        assert!(phases[0].contains("Preparation"));
        assert!(phases[1].contains("Minimizing"));
        assert!(phases[2].contains("Dynamics"));
        let increments = events.iter().filter(|e| e.contains("TaskIncrement")).count();
        assert_eq!(increments, 4);
    }
}
