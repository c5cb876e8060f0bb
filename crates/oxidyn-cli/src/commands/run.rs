use crate::cli::RunArgs;
use crate::config::{PartialRunConfig, RunSettings};
use crate::data::DataResolver;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use oxidyn::{
    core::io::{pdb::PdbFile, traits::MolecularFile},
    engine::config::SimulateConfigBuilder,
    engine::progress::ProgressReporter,
    engine::reporter::{Reporter, StateDataReporter, TrajectoryReporter},
    workflows,
};
use tracing::info;

pub async fn run(args: RunArgs) -> Result<()> {
    let resolver = DataResolver::new(args.data_dir.clone());
    let file_config = match &args.config {
        Some(path) => Some(PartialRunConfig::from_file(path)?),
        None => None,
    };
    let settings = RunSettings::resolve(&args, file_config, &resolver)?;

    println!("OxiDyn version: {}", env!("CARGO_PKG_VERSION"));

    info!("Loading input structure from {:?}", &settings.input);
    let (system, _metadata) =
        PdbFile::read_from_path(&settings.input).map_err(|e| CliError::FileParsing {
            path: settings.input.clone(),
            source: e.into(),
        })?;
    info!(
        "Loaded {} atoms across {} chains.",
        system.atom_count(),
        system.chains_iter().count()
    );

    let mut builder = SimulateConfigBuilder::new()
        .forcefield_paths(settings.forcefield_paths.clone())
        .nonbonded(settings.nonbonded)
        .constraints(settings.constraints)
        .temperature(settings.temperature)
        .friction(settings.friction)
        .timestep(settings.timestep)
        .steps(settings.steps);
    if let Some(seed) = settings.seed {
        builder = builder.seed(seed);
    }
    let config = builder.build().map_err(|e| CliError::Config(e.to_string()))?;

    let reporters: Vec<Box<dyn Reporter>> = vec![
        Box::new(TrajectoryReporter::create(
            &settings.output,
            settings.report_interval,
        )?),
        Box::new(StateDataReporter::to_console(settings.report_interval)),
    ];

    let progress_handler = CliProgressHandler::new();
    let progress = ProgressReporter::with_callback(progress_handler.get_callback());

    info!("Invoking the core simulation workflow...");
    let result = tokio::task::block_in_place(|| {
        workflows::simulate::run(&system, &config, reporters, &progress)
    })?;

    info!(
        initial = result.initial_potential,
        minimized = result.minimized_potential,
        end = result.final_potential,
        "Workflow finished."
    );
    if !result.minimization_converged {
        println!("Warning: minimization stopped at the iteration cap before reaching tolerance.");
    }
    println!(
        "Energy minimization took {:.2} seconds",
        result.timings.minimization.as_secs_f64()
    );
    println!(
        "Simulation steps took {:.2} seconds",
        result.timings.stepping.as_secs_f64()
    );
    println!(
        "Total time for the run: {:.2} seconds",
        result.timings.total.as_secs_f64()
    );

    Ok(())
}
