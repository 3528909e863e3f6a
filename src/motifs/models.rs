use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::releases::diff::join_ids;
use crate::releases::ReleaseDiff;
use crate::schema::{ml_loops, ml_motifs, ml_parents, ml_release_diff, ml_releases};

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable)]
#[diesel(table_name = ml_releases)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MotifRelease {
    pub id: String,
    pub loop_type: String,
    pub created_at: NaiveDateTime,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable)]
#[diesel(table_name = ml_motifs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Motif {
    pub id: String,
    pub release_id: String,
    pub loop_type: String,
    pub handle: String,
    pub version: i32,
    /// How the id was chosen, e.g. "Updated, 1 parent".
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable)]
#[diesel(table_name = ml_loops)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MotifLoop {
    pub motif_id: String,
    pub loop_id: String,
    pub release_id: String,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable)]
#[diesel(table_name = ml_parents)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MotifParent {
    pub motif_id: String,
    pub release_id: String,
    pub parent_motif_id: String,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable)]
#[diesel(table_name = ml_release_diff)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MotifReleaseDiff {
    pub release_id_1: String,
    pub release_id_2: String,
    pub loop_type: String,
    pub same_groups: String,
    pub updated_groups: String,
    pub added_groups: String,
    pub removed_groups: String,
    pub added_loops: String,
    pub removed_loops: String,
    pub num_same_groups: i32,
    pub num_updated_groups: i32,
    pub num_added_groups: i32,
    pub num_removed_groups: i32,
    pub num_added_loops: i32,
    pub num_removed_loops: i32,
}

impl MotifReleaseDiff {
    /// `release` compared with the `previous` release of `loop_type`.
    pub fn new(release: &str, previous: &str, loop_type: &str, diff: &ReleaseDiff) -> Self {
        Self {
            release_id_1: release.to_string(),
            release_id_2: previous.to_string(),
            loop_type: loop_type.to_string(),
            same_groups: join_ids(&diff.same_groups),
            updated_groups: join_ids(&diff.updated_groups),
            added_groups: join_ids(&diff.added_groups),
            removed_groups: join_ids(&diff.removed_groups),
            added_loops: join_ids(&diff.added_members),
            removed_loops: join_ids(&diff.removed_members),
            num_same_groups: diff.same_groups.len() as i32,
            num_updated_groups: diff.updated_groups.len() as i32,
            num_added_groups: diff.added_groups.len() as i32,
            num_removed_groups: diff.removed_groups.len() as i32,
            num_added_loops: diff.added_members.len() as i32,
            num_removed_loops: diff.removed_members.len() as i32,
        }
    }
}
