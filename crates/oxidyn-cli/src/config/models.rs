use super::defaults;
use crate::cli::{NonbondedChoice, RunArgs};
use crate::data::DataResolver;
use crate::error::{CliError, Result};
use oxidyn::engine::config::{ConstraintPolicy, NonbondedMethod};
use serde::Deserialize;
use std::path::PathBuf;

/// Settings as they appear in a configuration file: everything optional,
/// merged beneath the command-line arguments.
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct PartialRunConfig {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub forcefield: Option<Vec<String>>,
    pub data_dir: Option<PathBuf>,
    pub steps: Option<u64>,
    pub temperature: Option<f64>,
    pub friction: Option<f64>,
    pub timestep_fs: Option<f64>,
    pub cutoff_nm: Option<f64>,
    pub nonbonded_method: Option<String>,
    pub constrain_h_bonds: Option<bool>,
    pub report_interval: Option<u64>,
    pub seed: Option<u64>,
}

/// Fully resolved run settings in the engine's internal units.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub input: PathBuf,
    pub output: PathBuf,
    pub forcefield_paths: Vec<PathBuf>,
    pub steps: u64,
    /// Kelvin.
    pub temperature: f64,
    /// 1/ps.
    pub friction: f64,
    /// ps.
    pub timestep: f64,
    pub nonbonded: NonbondedMethod,
    pub constraints: ConstraintPolicy,
    pub report_interval: u64,
    pub seed: Option<u64>,
}

impl RunSettings {
    /// Merges CLI arguments over file settings over built-in defaults and
    /// resolves force-field names to paths.
    ///
    /// # Errors
    ///
    /// Returns an argument or data error for invalid values or unknown
    /// force-field names.
    pub fn resolve(
        args: &RunArgs,
        file: Option<PartialRunConfig>,
        resolver: &DataResolver,
    ) -> Result<Self> {
        let file = file.unwrap_or_default();

        let input = args
            .input
            .clone()
            .or(file.input)
            .unwrap_or_else(|| PathBuf::from(defaults::INPUT_PATH));
        let output = args
            .output
            .clone()
            .or(file.output)
            .unwrap_or_else(|| PathBuf::from(defaults::OUTPUT_PATH));

        let forcefield_names: Vec<String> = if !args.forcefield.is_empty() {
            args.forcefield.clone()
        } else {
            file.forcefield.unwrap_or_else(|| {
                defaults::FORCEFIELDS
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            })
        };
        let forcefield_paths = forcefield_names
            .iter()
            .map(|name| resolver.resolve(name))
            .collect::<Result<Vec<_>>>()?;

        let steps = args.steps.or(file.steps).unwrap_or(defaults::STEPS);
        let temperature = args
            .temperature
            .or(file.temperature)
            .unwrap_or(defaults::TEMPERATURE_K);
        let friction = args
            .friction
            .or(file.friction)
            .unwrap_or(defaults::FRICTION_PER_PS);
        let timestep_fs = args
            .timestep
            .or(file.timestep_fs)
            .unwrap_or(defaults::TIMESTEP_FS);
        let cutoff_nm = args.cutoff.or(file.cutoff_nm).unwrap_or(defaults::CUTOFF_NM);
        let report_interval = args
            .report_interval
            .or(file.report_interval)
            .unwrap_or(defaults::REPORT_INTERVAL);
        let seed = args.seed.or(file.seed);

        if timestep_fs <= 0.0 {
            return Err(CliError::Argument(format!(
                "Timestep must be positive, got {} fs",
                timestep_fs
            )));
        }
        if temperature < 0.0 {
            return Err(CliError::Argument(format!(
                "Temperature must be non-negative, got {} K",
                temperature
            )));
        }
        if cutoff_nm <= 0.0 {
            return Err(CliError::Argument(format!(
                "Cutoff must be positive, got {} nm",
                cutoff_nm
            )));
        }
        if report_interval == 0 {
            return Err(CliError::Argument(
                "Report interval must be at least 1".to_string(),
            ));
        }

        let cutoff_angstrom = cutoff_nm * 10.0;
        let method_choice = match (&args.nonbonded_method, &file.nonbonded_method) {
            (Some(choice), _) => *choice,
            (None, Some(name)) => match name.to_ascii_lowercase().as_str() {
                "pme" => NonbondedChoice::Pme,
                "cutoff" => NonbondedChoice::Cutoff,
                "no-cutoff" | "nocutoff" => NonbondedChoice::NoCutoff,
                other => {
                    return Err(CliError::Config(format!(
                        "Unknown nonbonded method '{}' (expected pme, cutoff, or no-cutoff)",
                        other
                    )));
                }
            },
            (None, None) => NonbondedChoice::Pme,
        };
        let nonbonded = match method_choice {
            NonbondedChoice::Pme => NonbondedMethod::Pme {
                cutoff: cutoff_angstrom,
            },
            NonbondedChoice::Cutoff => NonbondedMethod::CutoffPeriodic {
                cutoff: cutoff_angstrom,
            },
            NonbondedChoice::NoCutoff => NonbondedMethod::NoCutoff,
        };

        let constraints = if args.no_constraints || file.constrain_h_bonds == Some(false) {
            ConstraintPolicy::None
        } else {
            ConstraintPolicy::HBonds
        };

        Ok(Self {
            input,
            output,
            forcefield_paths,
            steps,
            temperature,
            friction,
            timestep: timestep_fs / 1000.0,
            nonbonded,
            constraints,
            report_interval,
            seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn resolver_with_defaults() -> (DataResolver, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("amber14-all.toml"), "").unwrap();
        fs::create_dir(dir.path().join("amber14")).unwrap();
        fs::write(dir.path().join("amber14/tip3pfb.toml"), "").unwrap();
        (DataResolver::new(Some(dir.path().to_path_buf())), dir)
    }

    #[test]
    fn bare_defaults_reproduce_the_reference_protocol() {
        let (resolver, dir) = resolver_with_defaults();
        let settings = RunSettings::resolve(&RunArgs::default(), None, &resolver).unwrap();

        assert_eq!(settings.input, PathBuf::from("input.pdb"));
        assert_eq!(settings.output, PathBuf::from("output.pdb"));
        assert_eq!(
            settings.forcefield_paths,
            vec![
                dir.path().join("amber14-all.toml"),
                dir.path().join("amber14/tip3pfb.toml"),
            ]
        );
        assert_eq!(settings.steps, 2000);
        assert_eq!(settings.temperature, 300.0);
        assert_eq!(settings.friction, 1.0);
        assert!((settings.timestep - 0.004).abs() < 1e-12);
        assert_eq!(settings.nonbonded, NonbondedMethod::Pme { cutoff: 10.0 });
        assert_eq!(settings.constraints, ConstraintPolicy::HBonds);
        assert_eq!(settings.report_interval, 1000);
        assert_eq!(settings.seed, None);
    }

    #[test]
    fn cli_arguments_override_file_and_defaults() {
        let (resolver, _dir) = resolver_with_defaults();
        let args = RunArgs {
            steps: Some(100),
            temperature: Some(310.0),
            seed: Some(4),
            ..Default::default()
        };
        let file = PartialRunConfig {
            steps: Some(999),
            friction: Some(2.0),
            ..Default::default()
        };

        let settings = RunSettings::resolve(&args, Some(file), &resolver).unwrap();
        assert_eq!(settings.steps, 100, "CLI beats file");
        assert_eq!(settings.friction, 2.0, "file beats defaults");
        assert_eq!(settings.temperature, 310.0);
        assert_eq!(settings.seed, Some(4));
    }

    #[test]
    fn no_constraints_flag_disables_the_policy() {
        let (resolver, _dir) = resolver_with_defaults();
        let args = RunArgs {
            no_constraints: true,
            ..Default::default()
        };
        let settings = RunSettings::resolve(&args, None, &resolver).unwrap();
        assert_eq!(settings.constraints, ConstraintPolicy::None);
    }

    #[test]
    fn invalid_timestep_is_rejected() {
        let (resolver, _dir) = resolver_with_defaults();
        let args = RunArgs {
            timestep: Some(-1.0),
            ..Default::default()
        };
        let result = RunSettings::resolve(&args, None, &resolver);
        assert!(matches!(result, Err(CliError::Argument(_))));
    }

    #[test]
    fn unknown_forcefield_name_is_a_data_error() {
        let (resolver, _dir) = resolver_with_defaults();
        let args = RunArgs {
            forcefield: vec!["charmm36".to_string()],
            ..Default::default()
        };
        let result = RunSettings::resolve(&args, None, &resolver);
        assert!(matches!(result, Err(CliError::Data(_))));
    }

    #[test]
    fn file_nonbonded_method_is_parsed() {
        let (resolver, _dir) = resolver_with_defaults();
        let file = PartialRunConfig {
            nonbonded_method: Some("no-cutoff".to_string()),
            ..Default::default()
        };
        let settings = RunSettings::resolve(&RunArgs::default(), Some(file), &resolver).unwrap();
        assert_eq!(settings.nonbonded, NonbondedMethod::NoCutoff);

        let bad = PartialRunConfig {
            nonbonded_method: Some("magic".to_string()),
            ..Default::default()
        };
        let result = RunSettings::resolve(&RunArgs::default(), Some(bad), &resolver);
        assert!(matches!(result, Err(CliError::Config(_))));
    }
}
