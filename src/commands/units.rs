use std::error::Error;

use clap::Subcommand;

use crate::commands::{resolve_pdbs, PdbArgs};
use crate::db::establish_connection;
use crate::settings::Settings;
use crate::stage::{run_stage, StageLoader};
use crate::toolkit::MatlabToolkit;
use crate::units::coordinates::DistancesAndCoordinatesLoader;
use crate::units::interactions::PairwiseInteractionsLoader;

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Base pairs, stacks and base-phosphate interactions
    Interactions(PdbArgs),
    /// Unit coordinates and distances between units
    Coordinates(PdbArgs),
}

pub fn command(cmds: Commands, settings: &Settings) -> Result<(), Box<dyn Error>> {
    let toolkit = MatlabToolkit::from_settings(&settings.toolkit);
    let mut connection = establish_connection(&settings.database_url)?;

    let interactions = PairwiseInteractionsLoader::new(&toolkit);
    let coordinates = DistancesAndCoordinatesLoader::new(&toolkit);
    let (loader, args): (&dyn StageLoader, PdbArgs) = match cmds {
        Commands::Interactions(args) => (&interactions, args),
        Commands::Coordinates(args) => (&coordinates, args),
    };

    let pdb_ids = resolve_pdbs(&mut connection, &args)?;
    run_stage(
        loader,
        &mut connection,
        &pdb_ids,
        args.recalculate,
        &settings.toolkit.work_dir,
    )?;
    Ok(())
}
