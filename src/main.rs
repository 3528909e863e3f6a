use std::error::Error;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use motif_atlas::cli::{Cli, Commands};
use motif_atlas::commands;
use motif_atlas::settings::load_settings;
use motif_atlas::stage::is_toolkit_failure;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if is_toolkit_failure(err.as_ref()) => {
            error!("Toolkit failure, stopping: {}", err);
            ExitCode::from(2)
        }
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let settings = || load_settings(&cli.config);

    match cli.command {
        Commands::Pdbs(cmd) => commands::pdbs::command(cmd, &settings()?),
        Commands::Loops(cmd) => commands::loops::command(cmd, &settings()?),
        Commands::Units(cmd) => commands::units::command(cmd, &settings()?),
        Commands::Motifs(cmd) => commands::motifs::command(cmd, &settings()?),
        Commands::Nr(cmd) => commands::nr::command(cmd, &settings()?),
        Commands::Correspond(cmd) => commands::correspond::command(cmd),
    }
}
