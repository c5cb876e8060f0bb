use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
}

/// How long-range nonbonded interactions are treated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NonbondedMethod {
    /// Every pair interacts through the bare potentials; no periodicity.
    NoCutoff,
    /// Interactions are truncated at `cutoff` Angstroms under periodic
    /// boundary conditions.
    CutoffPeriodic { cutoff: f64 },
    /// Ewald-summed electrostatics: real-space within `cutoff` Angstroms,
    /// the rest in reciprocal space. Requires a periodic box.
    Pme { cutoff: f64 },
}

impl NonbondedMethod {
    /// The real-space cutoff, if the method has one.
    pub fn cutoff(&self) -> Option<f64> {
        match self {
            NonbondedMethod::NoCutoff => None,
            NonbondedMethod::CutoffPeriodic { cutoff } | NonbondedMethod::Pme { cutoff } => {
                Some(*cutoff)
            }
        }
    }

    pub fn is_periodic(&self) -> bool {
        !matches!(self, NonbondedMethod::NoCutoff)
    }
}

/// Which bonds are replaced by rigid constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintPolicy {
    /// All bonds stay flexible.
    None,
    /// Every bond involving a hydrogen is fixed at its equilibrium length,
    /// which is what permits the 4 fs timestep of the reference setup.
    HBonds,
}

/// Langevin integrator parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegratorConfig {
    /// Target temperature in Kelvin.
    pub temperature: f64,
    /// Friction (collision) rate in 1/ps.
    pub friction: f64,
    /// Timestep in ps.
    pub timestep: f64,
}

/// Energy minimization termination settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimizationConfig {
    /// Convergence threshold on the largest per-atom force norm, kcal/mol/Å.
    pub force_tolerance: f64,
    /// Hard cap on minimizer iterations.
    pub max_iterations: usize,
}

impl Default for MinimizationConfig {
    fn default() -> Self {
        Self {
            force_tolerance: 1.0,
            max_iterations: 2000,
        }
    }
}

/// Full configuration of a simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulateConfig {
    /// Parameter-set files, merged in order.
    pub forcefield_paths: Vec<PathBuf>,
    pub nonbonded: NonbondedMethod,
    pub constraints: ConstraintPolicy,
    pub integrator: IntegratorConfig,
    pub minimization: MinimizationConfig,
    /// Number of dynamics steps to run.
    pub steps: u64,
    /// Integrator RNG seed; `None` draws fresh entropy per run.
    pub seed: Option<u64>,
}

#[derive(Default)]
pub struct SimulateConfigBuilder {
    forcefield_paths: Option<Vec<PathBuf>>,
    nonbonded: Option<NonbondedMethod>,
    constraints: Option<ConstraintPolicy>,
    temperature: Option<f64>,
    friction: Option<f64>,
    timestep: Option<f64>,
    minimization: MinimizationConfig,
    steps: Option<u64>,
    seed: Option<u64>,
}

impl SimulateConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forcefield_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.forcefield_paths = Some(paths);
        self
    }
    pub fn nonbonded(mut self, method: NonbondedMethod) -> Self {
        self.nonbonded = Some(method);
        self
    }
    pub fn constraints(mut self, policy: ConstraintPolicy) -> Self {
        self.constraints = Some(policy);
        self
    }
    pub fn temperature(mut self, kelvin: f64) -> Self {
        self.temperature = Some(kelvin);
        self
    }
    pub fn friction(mut self, per_ps: f64) -> Self {
        self.friction = Some(per_ps);
        self
    }
    pub fn timestep(mut self, ps: f64) -> Self {
        self.timestep = Some(ps);
        self
    }
    pub fn minimization(mut self, config: MinimizationConfig) -> Self {
        self.minimization = config;
        self
    }
    pub fn steps(mut self, steps: u64) -> Self {
        self.steps = Some(steps);
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<SimulateConfig, ConfigError> {
        Ok(SimulateConfig {
            forcefield_paths: self
                .forcefield_paths
                .ok_or(ConfigError::MissingParameter("forcefield_paths"))?,
            nonbonded: self
                .nonbonded
                .ok_or(ConfigError::MissingParameter("nonbonded"))?,
            constraints: self
                .constraints
                .ok_or(ConfigError::MissingParameter("constraints"))?,
            integrator: IntegratorConfig {
                temperature: self
                    .temperature
                    .ok_or(ConfigError::MissingParameter("temperature"))?,
                friction: self
                    .friction
                    .ok_or(ConfigError::MissingParameter("friction"))?,
                timestep: self
                    .timestep
                    .ok_or(ConfigError::MissingParameter("timestep"))?,
            },
            minimization: self.minimization,
            steps: self.steps.ok_or(ConfigError::MissingParameter("steps"))?,
            seed: self.seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_builder() -> SimulateConfigBuilder {
        SimulateConfigBuilder::new()
            .forcefield_paths(vec![PathBuf::from("ff.toml")])
            .nonbonded(NonbondedMethod::Pme { cutoff: 10.0 })
            .constraints(ConstraintPolicy::HBonds)
            .temperature(300.0)
            .friction(1.0)
            .timestep(0.004)
            .steps(2000)
    }

    #[test]
    fn build_succeeds_with_all_required_parameters() {
        let config = full_builder().build().unwrap();
        assert_eq!(config.integrator.temperature, 300.0);
        assert_eq!(config.integrator.timestep, 0.004);
        assert_eq!(config.steps, 2000);
        assert_eq!(config.seed, None);
        assert_eq!(config.nonbonded.cutoff(), Some(10.0));
    }

    #[test]
    fn build_fails_when_a_required_parameter_is_missing() {
        let result = SimulateConfigBuilder::new()
            .nonbonded(NonbondedMethod::NoCutoff)
            .build();
        assert_eq!(
            result.unwrap_err(),
            ConfigError::MissingParameter("forcefield_paths")
        );
    }

    #[test]
    fn seed_is_optional_and_carried_through() {
        let config = full_builder().seed(42).build().unwrap();
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn nonbonded_method_reports_cutoff_and_periodicity() {
        assert_eq!(NonbondedMethod::NoCutoff.cutoff(), None);
        assert!(!NonbondedMethod::NoCutoff.is_periodic());
        assert!(NonbondedMethod::CutoffPeriodic { cutoff: 9.0 }.is_periodic());
        assert_eq!(
            NonbondedMethod::CutoffPeriodic { cutoff: 9.0 }.cutoff(),
            Some(9.0)
        );
        assert!(NonbondedMethod::Pme { cutoff: 10.0 }.is_periodic());
    }

    #[test]
    fn minimization_defaults_are_sane() {
        let defaults = MinimizationConfig::default();
        assert!(defaults.force_tolerance > 0.0);
        assert!(defaults.max_iterations > 0);
    }
}
