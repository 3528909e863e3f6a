/// The template every per-PDB loader follows: skip ids whose stage is
/// already complete, optionally wipe and redo them, run the toolkit,
/// store its output, then stamp the stage as done. Toolkit output goes to
/// a per-structure scratch directory that is removed whatever the outcome.

use std::fs;
use std::path::Path;

use diesel::prelude::*;
use log::{error, info, warn};
use tempfile::Builder;
use thiserror::Error;

use crate::db::DatabaseError;
use crate::records::RecordError;
use crate::runner::RunnerError;
use crate::status::{self, Stage};
use crate::toolkit::ToolkitError;

#[derive(Error, Debug)]
pub enum StageError {
    #[error("Toolkit failure for {pdb_id}: {source}")]
    Toolkit {
        pdb_id: String,
        source: ToolkitError,
    },

    #[error("Could not read toolkit output: {0}")]
    Records(#[from] RecordError),

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Invalid(String),
}

impl StageError {
    pub fn toolkit(pdb_id: &str, source: ToolkitError) -> Self {
        StageError::Toolkit {
            pdb_id: pdb_id.to_string(),
            source,
        }
    }
}

impl From<DatabaseError> for StageError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Query(e) => StageError::Database(e),
            other => StageError::Invalid(other.to_string()),
        }
    }
}

pub trait StageLoader {
    fn stage(&self) -> Stage;

    /// Removes everything this loader stored for `pdb_id`.
    fn delete_existing(&self, connection: &mut SqliteConnection, pdb_id: &str)
        -> Result<usize, StageError>;

    /// Runs the toolkit for `pdb_id`, writing its output into `work_dir`,
    /// and stores the parsed rows.
    fn process(
        &self,
        connection: &mut SqliteConnection,
        pdb_id: &str,
        work_dir: &Path,
    ) -> Result<Processed, StageError>;
}

#[derive(Debug, Default)]
pub struct Processed {
    pub rows: usize,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct StageSummary {
    pub skipped: usize,
    pub processed: usize,
    pub rows: usize,
}

pub fn run_stage<L: StageLoader + ?Sized>(
    loader: &L,
    connection: &mut SqliteConnection,
    pdb_ids: &[String],
    recalculate: bool,
    work_dir: &Path,
) -> Result<StageSummary, StageError> {
    let stage = loader.stage();
    fs::create_dir_all(work_dir)?;

    if recalculate {
        info!("Recalculating {} for {} structures", stage, pdb_ids.len());
        connection.transaction::<_, StageError, _>(|conn| {
            for pdb_id in pdb_ids {
                let removed = loader.delete_existing(conn, pdb_id)?;
                info!("Removed {} {} rows for {}", removed, stage, pdb_id);
            }
            status::clear(conn, pdb_ids, stage)?;
            Ok(())
        })?;
    }

    let todo = status::pending(connection, pdb_ids, stage)?;
    let mut summary = StageSummary {
        skipped: pdb_ids.len() - todo.len(),
        ..StageSummary::default()
    };
    info!(
        "{}: {} to process, {} already done",
        stage,
        todo.len(),
        summary.skipped
    );

    for pdb_id in &todo {
        let scratch = Builder::new()
            .prefix(&format!("{}_{}_", stage, pdb_id))
            .tempdir_in(work_dir)?;

        let processed = connection.transaction::<_, StageError, _>(|conn| {
            let processed = loader.process(conn, pdb_id, scratch.path())?;
            status::mark_done(conn, pdb_id, stage)?;
            Ok(processed)
        });

        let scratch_path = scratch.path().to_path_buf();
        if let Err(err) = scratch.close() {
            warn!("Could not remove {}: {}", scratch_path.display(), err);
        }

        let processed = match processed {
            Ok(processed) => processed,
            Err(err) => {
                error!("{} failed for {}: {}", stage, pdb_id, err);
                return Err(err);
            }
        };

        info!("{}: stored {} rows for {}", stage, processed.rows, pdb_id);
        summary.processed += 1;
        summary.rows += processed.rows;
    }

    Ok(summary)
}

/// Whether `err` came from the external toolkit rather than from our side.
pub fn is_toolkit_failure(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if e.is::<ToolkitError>() {
            return true;
        }
        if let Some(StageError::Toolkit { .. }) = e.downcast_ref::<StageError>() {
            return true;
        }
        // Batch jobs are toolkit subprocesses; only pool setup is ours.
        if let Some(runner_err) = e.downcast_ref::<RunnerError>() {
            return !matches!(runner_err, RunnerError::Pool(_));
        }
        current = e.source();
    }
    false
}
