use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::releases::diff::join_ids;
use crate::releases::ReleaseDiff;
use crate::schema::{nr_classes, nr_members, nr_parents, nr_release_diff, nr_releases};

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable)]
#[diesel(table_name = nr_releases)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct NrRelease {
    pub id: String,
    pub created_at: NaiveDateTime,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable)]
#[diesel(table_name = nr_classes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct NrClass {
    pub id: String,
    pub release_id: String,
    pub resolution: String,
    pub handle: String,
    pub version: i32,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable)]
#[diesel(table_name = nr_members)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct NrMember {
    pub class_id: String,
    pub release_id: String,
    pub member_id: String,
    pub representative: bool,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable)]
#[diesel(table_name = nr_parents)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct NrParent {
    pub class_id: String,
    pub release_id: String,
    pub parent_class_id: String,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable)]
#[diesel(table_name = nr_release_diff)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct NrReleaseDiff {
    pub release_id_1: String,
    pub release_id_2: String,
    pub resolution: String,
    pub same_groups: String,
    pub updated_groups: String,
    pub added_groups: String,
    pub removed_groups: String,
    pub added_members: String,
    pub removed_members: String,
    pub num_same_groups: i32,
    pub num_updated_groups: i32,
    pub num_added_groups: i32,
    pub num_removed_groups: i32,
    pub num_added_members: i32,
    pub num_removed_members: i32,
}

impl NrReleaseDiff {
    pub fn new(release: &str, previous: &str, resolution: &str, diff: &ReleaseDiff) -> Self {
        Self {
            release_id_1: release.to_string(),
            release_id_2: previous.to_string(),
            resolution: resolution.to_string(),
            same_groups: join_ids(&diff.same_groups),
            updated_groups: join_ids(&diff.updated_groups),
            added_groups: join_ids(&diff.added_groups),
            removed_groups: join_ids(&diff.removed_groups),
            added_members: join_ids(&diff.added_members),
            removed_members: join_ids(&diff.removed_members),
            num_same_groups: diff.same_groups.len() as i32,
            num_updated_groups: diff.updated_groups.len() as i32,
            num_added_groups: diff.added_groups.len() as i32,
            num_removed_groups: diff.removed_groups.len() as i32,
            num_added_members: diff.added_members.len() as i32,
            num_removed_members: diff.removed_members.len() as i32,
        }
    }
}
