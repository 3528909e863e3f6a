use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::after_release;
use crate::correspondence::collection::Collection;
use crate::db::establish_connection;
use crate::loops::models::LoopType;
use crate::motifs;
use crate::releases::{ReleaseMode, ReleaseOptions};
use crate::settings::Settings;

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Import a clustering as the next motif release of one loop type
    Release(ReleaseCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct ReleaseCommand {
    /// IL, HL or J3
    loop_type: LoopType,

    /// CSV with `group_id,loop_id` rows
    clustering: PathBuf,

    #[arg(long, default_value = "minor")]
    mode: ReleaseMode,

    /// Explicit release id, must come after the latest release
    #[arg(long)]
    release_id: Option<String>,

    #[arg(long)]
    description: Option<String>,
}

/// Clustering output names its columns after loops.
const CLUSTERING_COLUMNS: [&str; 2] = ["group_id", "loop_id"];

pub fn command(cmds: Commands, settings: &Settings) -> Result<(), Box<dyn Error>> {
    match cmds {
        Commands::Release(cmd) => {
            let clustering = Collection::from_path_with_columns(&cmd.clustering, &CLUSTERING_COLUMNS)?;
            let options = ReleaseOptions {
                mode: cmd.mode,
                release_id: cmd.release_id,
                description: cmd.description,
            };

            let mut connection = establish_connection(&settings.database_url)?;
            let summary = motifs::import_release(
                &mut connection,
                cmd.loop_type,
                &clustering,
                &options,
                &mut rand::thread_rng(),
            )?;
            after_release(settings, &summary);
        }
    }
    Ok(())
}
