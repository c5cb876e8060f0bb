use crate::cli::{DataArgs, DataCommands};
use crate::data::DataResolver;
use crate::error::Result;
use tracing::info;

pub async fn run(args: DataArgs) -> Result<()> {
    match args.command {
        DataCommands::Path { data_dir } => {
            let resolver = DataResolver::new(data_dir);
            println!("{}", resolver.data_dir().display());
        }
        DataCommands::List { data_dir } => {
            let resolver = DataResolver::new(data_dir);
            let sets = resolver.list_sets()?;
            info!("Found {} parameter set(s).", sets.len());
            if sets.is_empty() {
                println!(
                    "No parameter sets found under '{}'.",
                    resolver.data_dir().display()
                );
            } else {
                for name in sets {
                    println!("{}", name);
                }
            }
        }
    }
    Ok(())
}
