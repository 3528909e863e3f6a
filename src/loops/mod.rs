pub mod extractor;
pub mod models;
pub mod positions;
pub mod qa;
pub mod search;

use std::collections::HashSet;

use diesel::prelude::*;

use crate::db::ID_CHUNK;
use crate::loops::models::{LoopType, QaStatus};
use crate::schema::{all_loops, loop_qa};

/// Ids of every stored loop of `pdb_id`, sorted.
pub fn loops_in_structure(
    connection: &mut SqliteConnection,
    pdb_id: &str,
) -> QueryResult<Vec<String>> {
    all_loops::table
        .filter(all_loops::pdb_id.eq(pdb_id.to_uppercase()))
        .order(all_loops::id)
        .select(all_loops::id)
        .load(connection)
}

/// Ids of every loop of `loop_type`, optionally restricted to loops that
/// passed QA in the given loop release.
pub fn loops_of_type(
    connection: &mut SqliteConnection,
    loop_type: LoopType,
    valid_in: Option<&str>,
) -> QueryResult<Vec<String>> {
    match valid_in {
        None => all_loops::table
            .filter(all_loops::loop_type.eq(loop_type.as_ref()))
            .order(all_loops::id)
            .select(all_loops::id)
            .load(connection),
        Some(release_id) => all_loops::table
            .inner_join(loop_qa::table)
            .filter(all_loops::loop_type.eq(loop_type.as_ref()))
            .filter(loop_qa::release_id.eq(release_id))
            .filter(loop_qa::status.eq(QaStatus::Valid.code()))
            .order(all_loops::id)
            .select(all_loops::id)
            .load(connection),
    }
}

/// The subset of `loop_ids` missing from `all_loops`.
pub fn unknown_loops(
    connection: &mut SqliteConnection,
    loop_ids: &[&str],
) -> QueryResult<Vec<String>> {
    let mut known = HashSet::with_capacity(loop_ids.len());
    for chunk in loop_ids.chunks(ID_CHUNK) {
        let found: Vec<String> = all_loops::table
            .filter(all_loops::id.eq_any(chunk))
            .select(all_loops::id)
            .load(connection)?;
        known.extend(found);
    }
    Ok(loop_ids
        .iter()
        .filter(|id| !known.contains(**id))
        .map(|id| id.to_string())
        .collect())
}
