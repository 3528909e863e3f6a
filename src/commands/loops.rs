use std::error::Error;

use clap::{Parser, Subcommand};
use log::info;

use crate::commands::{batch_runner, resolve_pdbs, PdbArgs};
use crate::db::establish_connection;
use crate::loops::extractor::LoopExtractor;
use crate::loops::models::LoopType;
use crate::loops::positions::LoopPositionsLoader;
use crate::loops::qa;
use crate::loops::search::{compare_loops, SEARCH_BATCH_SIZE};
use crate::loops::loops_of_type;
use crate::releases::ReleaseMode;
use crate::settings::Settings;
use crate::stage::run_stage;
use crate::toolkit::MatlabToolkit;

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Extract hairpin, internal and junction loops
    Extract(PdbArgs),
    /// Store nucleotide positions within each loop
    Positions(PdbArgs),
    /// Run loop QA into a new loop release
    Qa(QaCommand),
    /// Compare loops of one type against each other
    Compare(CompareCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct QaCommand {
    #[command(flatten)]
    pdbs: PdbArgs,

    /// Which part of the loop release id to bump
    #[arg(long, default_value = "minor")]
    mode: ReleaseMode,

    #[arg(long)]
    description: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct CompareCommand {
    /// IL, HL or J3
    loop_type: LoopType,

    /// Query loops per toolkit job
    #[arg(long, default_value_t = SEARCH_BATCH_SIZE)]
    batch_size: usize,

    /// Only loops that passed the latest QA
    #[arg(long)]
    valid_only: bool,
}

pub fn command(cmds: Commands, settings: &Settings) -> Result<(), Box<dyn Error>> {
    let toolkit = MatlabToolkit::from_settings(&settings.toolkit);
    let work_dir = &settings.toolkit.work_dir;
    let mut connection = establish_connection(&settings.database_url)?;

    match cmds {
        Commands::Extract(args) => {
            let pdb_ids = resolve_pdbs(&mut connection, &args)?;
            let loader = LoopExtractor::new(&toolkit);
            run_stage(&loader, &mut connection, &pdb_ids, args.recalculate, work_dir)?;
        }
        Commands::Positions(args) => {
            let pdb_ids = resolve_pdbs(&mut connection, &args)?;
            let loader = LoopPositionsLoader::new(&toolkit);
            run_stage(&loader, &mut connection, &pdb_ids, args.recalculate, work_dir)?;
        }
        Commands::Qa(cmd) => {
            let pdb_ids = resolve_pdbs(&mut connection, &cmd.pdbs)?;
            let (release, summary) = qa::run_release(
                &mut connection,
                &toolkit,
                &pdb_ids,
                cmd.mode,
                cmd.description.as_deref(),
                work_dir,
            )?;
            info!("Loop release {}: QA for {} structures", release, summary.processed);
        }
        Commands::Compare(cmd) => {
            let valid_in = if cmd.valid_only {
                let latest = qa::latest_release(&mut connection)?
                    .ok_or("No loop release to take QA results from")?;
                Some(latest.to_string())
            } else {
                None
            };
            let loop_ids = loops_of_type(&mut connection, cmd.loop_type, valid_in.as_deref())?;
            let runner = batch_runner(settings);
            info!(
                "Comparing {} {} loops on {} workers",
                loop_ids.len(),
                cmd.loop_type,
                runner.workers()
            );
            compare_loops(
                &mut connection,
                &toolkit,
                &runner,
                &loop_ids,
                cmd.batch_size,
                work_dir,
            )?;
        }
    }
    Ok(())
}
