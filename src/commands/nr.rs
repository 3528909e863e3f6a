use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::after_release;
use crate::db::establish_connection;
use crate::nr::{self, NrClustering};
use crate::releases::{ReleaseMode, ReleaseOptions};
use crate::settings::Settings;

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Import equivalence classes for every resolution cutoff as one release
    Release(ReleaseCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct ReleaseCommand {
    /// CSV with `resolution,group_id,member_id,representative` rows
    classes: PathBuf,

    #[arg(long, default_value = "minor")]
    mode: ReleaseMode,

    #[arg(long)]
    release_id: Option<String>,

    #[arg(long)]
    description: Option<String>,
}

pub fn command(cmds: Commands, settings: &Settings) -> Result<(), Box<dyn Error>> {
    match cmds {
        Commands::Release(cmd) => {
            let clustering = NrClustering::from_path(&cmd.classes)?;
            let options = ReleaseOptions {
                mode: cmd.mode,
                release_id: cmd.release_id,
                description: cmd.description,
            };

            let mut connection = establish_connection(&settings.database_url)?;
            let summary = nr::import_release(
                &mut connection,
                &clustering,
                &options,
                &mut rand::thread_rng(),
            )?;
            after_release(settings, &summary);
        }
    }
    Ok(())
}
