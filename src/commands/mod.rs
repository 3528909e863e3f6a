pub mod correspond;
pub mod loops;
pub mod motifs;
pub mod nr;
pub mod pdbs;
pub mod units;

use std::error::Error;

use clap::Args;
use diesel::prelude::*;
use log::{info, warn};

use crate::notify;
use crate::pdb;
use crate::releases::ReleaseSummary;
use crate::runner::{BatchRunner, FailurePolicy};
use crate::schema::pdb_info;
use crate::settings::Settings;

/// Structures a per-PDB stage runs on.
#[derive(Args, Debug, Clone)]
pub struct PdbArgs {
    /// PDB ids; every stored structure when omitted
    pub pdb_ids: Vec<String>,

    /// Delete stored results and process the structures again
    #[arg(short, long)]
    pub recalculate: bool,
}

/// Normalized ids to process: the given ones, or every structure in
/// `pdb_info`, minus obsolete entries.
pub fn resolve_pdbs(
    connection: &mut SqliteConnection,
    args: &PdbArgs,
) -> Result<Vec<String>, Box<dyn Error>> {
    let mut ids: Vec<String> = if args.pdb_ids.is_empty() {
        pdb_info::table
            .select(pdb_info::structure_id)
            .distinct()
            .load(connection)?
    } else {
        args.pdb_ids.iter().map(|id| id.trim().to_uppercase()).collect()
    };
    ids.sort();
    ids.dedup();

    let current = pdb::current_structures(connection, &ids)?;
    if current.len() < ids.len() {
        info!("Skipping {} obsolete structures", ids.len() - current.len());
    }
    Ok(current)
}

pub fn batch_runner(settings: &Settings) -> BatchRunner {
    let policy = if settings.runner.retries > 1 {
        FailurePolicy::Retry {
            attempts: settings.runner.retries,
        }
    } else {
        FailurePolicy::Abort
    };
    BatchRunner::new(settings.runner.workers, policy)
}

/// Cache invalidation and the report file. The release is already
/// committed, so neither can fail the command.
pub fn after_release(settings: &Settings, summary: &ReleaseSummary) {
    match notify::invalidate_caches(&settings.releases.cache_urls) {
        Ok(count) => info!("Invalidated {} caches", count),
        Err(err) => warn!("Cache invalidation failed: {}", err),
    }
    if let Err(err) = notify::write_report(&settings.releases.report_dir, summary) {
        warn!("{}", err);
    }
}
