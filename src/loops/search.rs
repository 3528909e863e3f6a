/// All-against-all loop comparison. Loop ids are split into query batches,
/// each batch is searched against every loop by one toolkit job on the
/// batch runner, and the discrepancies are loaded into `loop_search`.

use std::fs;
use std::path::{Path, PathBuf};

use diesel::prelude::*;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::loops::models::LoopSearch;
use crate::records::{self, RecordError};
use crate::runner::{BatchRunner, RunnerError, Task};
use crate::schema::loop_search;
use crate::toolkit::MatlabToolkit;

pub const SEARCH_BATCH_SIZE: usize = 50;

/// `loop_id1, loop_id2, discrepancy`
const RESULT_FIELDS: usize = 3;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Runner(#[from] RunnerError),

    #[error("Could not read search results: {0}")]
    Records(#[from] RecordError),

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
}

#[derive(Debug, Deserialize)]
struct SearchRow {
    loop_id1: String,
    loop_id2: String,
    discrepancy: Option<f64>,
}

/// Toolkit jobs plus the files they read and write.
#[derive(Debug, Default)]
pub struct SearchPlan {
    pub tasks: Vec<Task>,
    pub inputs: Vec<PathBuf>,
    pub outputs: Vec<PathBuf>,
}

/// Writes the target list and one query list per batch into `work_dir`.
pub fn plan_batches(
    toolkit: &MatlabToolkit,
    loop_ids: &[String],
    batch_size: usize,
    work_dir: &Path,
) -> Result<SearchPlan, SearchError> {
    fs::create_dir_all(work_dir)?;

    let targets = work_dir.join("search_targets.txt");
    fs::write(&targets, lines(loop_ids))?;

    let mut plan = SearchPlan {
        inputs: vec![targets.clone()],
        ..SearchPlan::default()
    };

    for (index, batch) in loop_ids.chunks(batch_size.max(1)).enumerate() {
        let query = work_dir.join(format!("search_query_{}.txt", index));
        let output = work_dir.join(format!("search_result_{}.csv", index));
        fs::write(&query, lines(batch))?;

        plan.tasks.push(toolkit.task(
            format!("search-{}", index),
            "searchLoops",
            &[
                query.to_string_lossy().to_string(),
                targets.to_string_lossy().to_string(),
                output.to_string_lossy().to_string(),
            ],
        ));
        plan.inputs.push(query);
        plan.outputs.push(output);
    }

    info!(
        "Planned {} search batches for {} loops",
        plan.tasks.len(),
        loop_ids.len()
    );
    Ok(plan)
}

/// Upserts every result file. A missing discrepancy means no match.
pub fn load_results(
    connection: &mut SqliteConnection,
    outputs: &[PathBuf],
) -> Result<usize, SearchError> {
    connection.transaction::<_, SearchError, _>(|conn| {
        let mut stored = 0;
        for output in outputs {
            let rows: Vec<SearchRow> = records::read_positional_from_path(output, RESULT_FIELDS)?;
            for row in rows {
                let search = LoopSearch {
                    loop_id1: row.loop_id1,
                    loop_id2: row.loop_id2,
                    discrepancy: row.discrepancy,
                };
                diesel::insert_into(loop_search::table)
                    .values(&search)
                    .on_conflict((loop_search::loop_id1, loop_search::loop_id2))
                    .do_update()
                    .set(&search)
                    .execute(conn)?;
                stored += 1;
            }
        }
        Ok(stored)
    })
}

pub fn compare_loops(
    connection: &mut SqliteConnection,
    toolkit: &MatlabToolkit,
    runner: &BatchRunner,
    loop_ids: &[String],
    batch_size: usize,
    work_dir: &Path,
) -> Result<usize, SearchError> {
    if loop_ids.is_empty() {
        info!("No loops to compare");
        return Ok(0);
    }

    let plan = plan_batches(toolkit, loop_ids, batch_size, work_dir)?;
    runner.run(&plan.tasks)?;
    let stored = load_results(connection, &plan.outputs)?;
    info!("Stored {} loop comparisons", stored);

    for file in plan.inputs.iter().chain(&plan.outputs) {
        if let Err(err) = fs::remove_file(file) {
            warn!("Could not remove {}: {}", file.display(), err);
        }
    }
    Ok(stored)
}

fn lines(ids: &[String]) -> String {
    let mut text = ids.join("\n");
    text.push('\n');
    text
}
