use std::error::Error;

use clap::{Parser, Subcommand};
use log::info;

use crate::db::establish_connection;
use crate::pdb::{self, report::RcsbHttpClient, report::StructureSource};
use crate::settings::Settings;

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Refresh chain metadata, for every RNA structure by default
    Update(UpdateCommand),
    /// Import the obsolete-entries file
    Obsolete,
    /// List the ids of every RNA-containing structure
    Search,
}

#[derive(Parser, Debug, Clone)]
pub struct UpdateCommand {
    /// PDB ids; the RNA search result when omitted
    pdb_ids: Vec<String>,
}

pub fn command(cmds: Commands, settings: &Settings) -> Result<(), Box<dyn Error>> {
    let client = RcsbHttpClient::new(
        &settings.pdb.search_url,
        &settings.pdb.report_url,
        &settings.pdb.obsolete_url,
    )?;

    match cmds {
        Commands::Update(cmd) => {
            let ids = if cmd.pdb_ids.is_empty() {
                client.rna_structures()?
            } else {
                cmd.pdb_ids.iter().map(|id| id.to_uppercase()).collect()
            };
            let mut connection = establish_connection(&settings.database_url)?;
            let stored = pdb::update_structures(&mut connection, &client, &ids)?;
            info!("Updated {} chains", stored);
        }
        Commands::Obsolete => {
            let mut connection = establish_connection(&settings.database_url)?;
            let stored = pdb::update_obsolete(&mut connection, &client)?;
            info!("Updated {} obsolete entries", stored);
        }
        Commands::Search => {
            let ids = client.rna_structures()?;
            info!("Found {} RNA structures", ids.len());
            for id in ids {
                println!("{}", id);
            }
        }
    }
    Ok(())
}
