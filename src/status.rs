use std::collections::HashSet;

use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::db::ID_CHUNK;
use crate::schema::pdb_analysis_status;

/// A per-PDB processing step whose completion is recorded in
/// `pdb_analysis_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Loops,
    LoopPositions,
    LoopQa,
    Interactions,
    Coordinates,
}

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = pdb_analysis_status)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AnalysisStatus {
    pub pdb_id: String,
    pub stage: String,
    pub completed_at: Option<NaiveDateTime>,
}

/// The subset of `pdb_ids` that has not completed `stage`, in input order.
pub fn pending(
    connection: &mut SqliteConnection,
    pdb_ids: &[String],
    stage: Stage,
) -> QueryResult<Vec<String>> {
    let mut done = HashSet::new();
    for chunk in pdb_ids.chunks(ID_CHUNK) {
        let completed: Vec<String> = pdb_analysis_status::table
            .filter(pdb_analysis_status::stage.eq(stage.as_ref()))
            .filter(pdb_analysis_status::pdb_id.eq_any(chunk))
            .filter(pdb_analysis_status::completed_at.is_not_null())
            .select(pdb_analysis_status::pdb_id)
            .load(connection)?;
        done.extend(completed);
    }

    Ok(pdb_ids
        .iter()
        .filter(|id| !done.contains(*id))
        .cloned()
        .collect())
}

pub fn mark_done(
    connection: &mut SqliteConnection,
    pdb_id: &str,
    stage: Stage,
) -> QueryResult<NaiveDateTime> {
    let now = Utc::now().naive_utc();
    let row = AnalysisStatus {
        pdb_id: pdb_id.to_string(),
        stage: stage.to_string(),
        completed_at: Some(now),
    };

    diesel::insert_into(pdb_analysis_status::table)
        .values(&row)
        .on_conflict((pdb_analysis_status::pdb_id, pdb_analysis_status::stage))
        .do_update()
        .set(pdb_analysis_status::completed_at.eq(Some(now)))
        .execute(connection)?;
    Ok(now)
}

/// Nulls the completion time so the next run processes these ids again.
pub fn clear(
    connection: &mut SqliteConnection,
    pdb_ids: &[String],
    stage: Stage,
) -> QueryResult<usize> {
    let mut cleared = 0;
    for chunk in pdb_ids.chunks(ID_CHUNK) {
        cleared += diesel::update(
            pdb_analysis_status::table
                .filter(pdb_analysis_status::stage.eq(stage.as_ref()))
                .filter(pdb_analysis_status::pdb_id.eq_any(chunk)),
        )
        .set(pdb_analysis_status::completed_at.eq(None::<NaiveDateTime>))
        .execute(connection)?;
    }
    Ok(cleared)
}

pub fn completed_at(
    connection: &mut SqliteConnection,
    pdb_id: &str,
    stage: Stage,
) -> QueryResult<Option<NaiveDateTime>> {
    Ok(pdb_analysis_status::table
        .filter(pdb_analysis_status::pdb_id.eq(pdb_id))
        .filter(pdb_analysis_status::stage.eq(stage.as_ref()))
        .select(pdb_analysis_status::completed_at)
        .first::<Option<NaiveDateTime>>(connection)
        .optional()?
        .flatten())
}
