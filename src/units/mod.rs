pub mod coordinates;
pub mod interactions;
pub mod models;

use crate::stage::StageError;

/// Unit ids start with their structure: `1S72|1|0|G|5`.
pub fn structure_of(unit_id: &str) -> Option<&str> {
    unit_id.split('|').next().filter(|pdb| !pdb.is_empty() && unit_id.contains('|'))
}

/// Rejects a unit id that does not belong to `pdb_id`.
pub fn check_unit(unit_id: &str, pdb_id: &str) -> Result<(), StageError> {
    match structure_of(unit_id) {
        Some(pdb) if pdb.eq_ignore_ascii_case(pdb_id) => Ok(()),
        _ => Err(StageError::Invalid(format!(
            "Unit {} does not belong to {}",
            unit_id, pdb_id
        ))),
    }
}
