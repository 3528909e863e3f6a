use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;

use crate::schema::{pdb_info, pdb_obsolete};

/// One chain of one structure, as reported by the structure database.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = pdb_info)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct PdbInfo {
    pub structure_id: String,
    pub chain_id: String,
    pub title: Option<String>,
    pub experimental_technique: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub resolution: Option<f64>,
    pub macromolecule_type: Option<String>,
    pub entity_id: Option<i32>,
    pub sequence: Option<String>,
    pub chain_length: Option<i32>,
    pub source: Option<String>,
    pub updated_at: NaiveDateTime,
}

impl PdbInfo {
    pub fn is_rna(&self) -> bool {
        self.macromolecule_type
            .as_deref()
            .map_or(false, |t| t.contains("RNA"))
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = pdb_obsolete)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct PdbObsolete {
    pub obsolete_id: String,
    pub obsolete_date: NaiveDate,
    pub replaced_by: Option<String>,
}
