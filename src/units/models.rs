use diesel::prelude::*;

use crate::schema::{unit_coordinates, unit_distances, unit_pair_interactions};

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = unit_pair_interactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct UnitPairInteraction {
    pub unit_id_1: String,
    pub unit_id_2: String,
    pub pdb_id: String,
    /// Leontis-Westhof base pair family, e.g. `cWW`.
    pub f_lwbp: Option<String>,
    pub f_stacks: Option<String>,
    /// Base-phosphate interaction.
    pub f_bphs: Option<String>,
    pub f_crossing: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = unit_coordinates)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UnitCoordinates {
    pub unit_id: String,
    pub pdb_id: String,
    /// Atom records of the unit as written by the toolkit.
    pub coordinates: String,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = unit_distances)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UnitDistance {
    pub unit_id_1: String,
    pub unit_id_2: String,
    pub pdb_id: String,
    pub distance: f64,
}
