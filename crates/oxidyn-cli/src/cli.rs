use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "OxiDyn Developers",
    version,
    about = "OxiDyn CLI - A command-line interface for OxiDyn, a molecular dynamics engine for biomolecular simulation.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Minimize and simulate a structure: the full load / parameterize /
    /// minimize / step pipeline with trajectory and state output.
    Run(RunArgs),
    /// Inspect the local force-field data directory.
    Data(DataArgs),
}

/// Nonbonded treatment selectable from the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonbondedChoice {
    /// Ewald-summed electrostatics under periodic boundary conditions.
    Pme,
    /// Truncated interactions under periodic boundary conditions.
    Cutoff,
    /// All pairs, no periodicity.
    NoCutoff,
}

/// Arguments for the `run` subcommand.
///
/// Every option falls back to a configuration-file value and then to the
/// built-in defaults, which reproduce the reference protocol: `input.pdb`
/// to `output.pdb`, amber14 force field with its TIP3P-FB water model, PME
/// at 1 nm, hydrogen-bond constraints, 300 K Langevin dynamics at 4 fs for
/// 2000 steps with output every 1000 steps.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Path to the input structure in PDB format.
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Path for the output PDB trajectory.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Force-field parameter sets, applied in order.
    /// Each entry is a logical name (e.g. 'amber14-all', 'amber14/tip3pfb')
    /// resolved against the data directory, or an explicit path to a
    /// parameter file.
    #[arg(short = 'f', long = "forcefield", value_name = "NAME_OR_PATH")]
    pub forcefield: Vec<String>,

    /// Directory holding named force-field parameter sets.
    /// Defaults to $OXIDYN_DATA_DIR, then ./data.
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Number of dynamics steps to run.
    #[arg(short, long, value_name = "INT")]
    pub steps: Option<u64>,

    /// Target temperature in Kelvin.
    #[arg(short, long, value_name = "KELVIN")]
    pub temperature: Option<f64>,

    /// Langevin friction rate in 1/ps.
    #[arg(long, value_name = "PER_PS")]
    pub friction: Option<f64>,

    /// Integration timestep in femtoseconds.
    #[arg(long, value_name = "FS")]
    pub timestep: Option<f64>,

    /// Nonbonded cutoff in nanometers.
    #[arg(long, value_name = "NM")]
    pub cutoff: Option<f64>,

    /// Nonbonded method.
    #[arg(long, value_name = "METHOD")]
    pub nonbonded_method: Option<NonbondedChoice>,

    /// Keep all bonds flexible instead of constraining hydrogen bonds.
    #[arg(long)]
    pub no_constraints: bool,

    /// Steps between trajectory frames and state-data rows.
    #[arg(short, long, value_name = "INT")]
    pub report_interval: Option<u64>,

    /// Fix the integrator random seed for reproducible trajectories.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,
}

/// Arguments for the `data` subcommand.
#[derive(Args, Debug)]
pub struct DataArgs {
    #[command(subcommand)]
    pub command: DataCommands,
}

/// Available commands for data inspection.
#[derive(Subcommand, Debug)]
pub enum DataCommands {
    /// Show the absolute path to the local data directory.
    Path {
        /// Override the data directory to inspect.
        #[arg(long, value_name = "DIR")]
        data_dir: Option<PathBuf>,
    },
    /// List the parameter sets available in the data directory.
    List {
        /// Override the data directory to inspect.
        #[arg(long, value_name = "DIR")]
        data_dir: Option<PathBuf>,
    },
}
