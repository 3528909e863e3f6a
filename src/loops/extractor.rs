use std::path::Path;

use chrono::Utc;
use diesel::dsl::max;
use diesel::prelude::*;
use log::{debug, info};
use serde::Deserialize;

use crate::loops::models::{Loop, LoopId, LoopType};
use crate::records;
use crate::schema::all_loops;
use crate::stage::{Processed, StageError, StageLoader};
use crate::status::Stage;
use crate::toolkit::Toolkit;

pub const EXTRACTED_COLUMNS: [&str; 3] = ["loop_type", "seq", "nt_ids"];

#[derive(Debug, Deserialize)]
struct ExtractedLoop {
    loop_type: String,
    seq: String,
    nt_ids: String,
}

/// Extracts hairpin, internal and junction loops from a structure.
///
/// Loops are never rewritten: a loop whose nucleotides match an existing
/// loop of the same type keeps its id, anything new gets the next
/// sequential id for its type in that structure.
pub struct LoopExtractor<'a, T: Toolkit> {
    toolkit: &'a T,
}

impl<'a, T: Toolkit> LoopExtractor<'a, T> {
    pub fn new(toolkit: &'a T) -> Self {
        Self { toolkit }
    }
}

impl<'a, T: Toolkit> StageLoader for LoopExtractor<'a, T> {
    fn stage(&self) -> Stage {
        Stage::Loops
    }

    fn delete_existing(
        &self,
        _connection: &mut SqliteConnection,
        pdb_id: &str,
    ) -> Result<usize, StageError> {
        // Loop ids are referenced by positions, QA and motif releases.
        debug!("Keeping existing loops of {}, new ones will be matched by signature", pdb_id);
        Ok(0)
    }

    fn process(
        &self,
        connection: &mut SqliteConnection,
        pdb_id: &str,
        work_dir: &Path,
    ) -> Result<Processed, StageError> {
        let output = work_dir.join(format!("{}_loops.csv", pdb_id));
        self.toolkit
            .call(
                "extractLoops",
                &[pdb_id.to_string(), output.to_string_lossy().to_string()],
            )
            .map_err(|err| StageError::toolkit(pdb_id, err))?;

        let extracted: Vec<ExtractedLoop> =
            records::read_records_from_path(&output, &EXTRACTED_COLUMNS)?;

        let mut created = 0;
        for row in extracted {
            let loop_type: LoopType = row
                .loop_type
                .parse()
                .map_err(|_| StageError::Invalid(format!("Unknown loop type {}", row.loop_type)))?;
            if store_loop(connection, loop_type, pdb_id, &row.seq, &row.nt_ids)?.is_some() {
                created += 1;
            }
        }

        info!("Extracted {} new loops from {}", created, pdb_id);
        Ok(Processed { rows: created })
    }
}

/// Normalizes a comma separated nucleotide list.
pub fn normalize_nt_ids(nt_ids: &str) -> Vec<String> {
    nt_ids
        .split(',')
        .map(str::trim)
        .filter(|nt| !nt.is_empty())
        .map(str::to_string)
        .collect()
}

/// Inserts the loop unless one with the same signature exists. Returns the
/// id of a newly created loop.
pub fn store_loop(
    connection: &mut SqliteConnection,
    loop_type: LoopType,
    pdb_id: &str,
    seq: &str,
    nt_ids: &str,
) -> Result<Option<String>, StageError> {
    let nts = normalize_nt_ids(nt_ids);
    if nts.is_empty() {
        return Err(StageError::Invalid(format!(
            "{} loop in {} has no nucleotides",
            loop_type, pdb_id
        )));
    }
    let signature = nts.join(",");
    let pdb_id = pdb_id.to_uppercase();

    let existing: Option<String> = all_loops::table
        .filter(all_loops::loop_type.eq(loop_type.as_ref()))
        .filter(all_loops::pdb_id.eq(&pdb_id))
        .filter(all_loops::nt_ids.eq(&signature))
        .select(all_loops::id)
        .first(connection)
        .optional()?;

    if let Some(id) = existing {
        debug!("{} already stored as {}", signature, id);
        return Ok(None);
    }

    let last: Option<i32> = all_loops::table
        .filter(all_loops::loop_type.eq(loop_type.as_ref()))
        .filter(all_loops::pdb_id.eq(&pdb_id))
        .select(max(all_loops::sequential_id))
        .first(connection)?;
    let sequential_id = last.unwrap_or(0) + 1;

    let id = LoopId::new(loop_type, &pdb_id, sequential_id as u32).to_string();
    let row = Loop {
        id: id.clone(),
        loop_type: loop_type.to_string(),
        pdb_id,
        sequential_id,
        length: nts.len() as i32,
        seq: seq.to_string(),
        nt_ids: signature,
        created_at: Utc::now().naive_utc(),
    };
    diesel::insert_into(all_loops::table)
        .values(&row)
        .execute(connection)?;

    Ok(Some(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;

    #[test]
    fn numbers_loops_per_type_and_structure() {
        let mut conn = test_connection();
        let a = store_loop(&mut conn, LoopType::IL, "1s72", "CAG*CUG", "1S72|1|0|C|10,1S72|1|0|A|11").unwrap();
        let b = store_loop(&mut conn, LoopType::IL, "1S72", "GA*UC", "1S72|1|0|G|20,1S72|1|0|A|21").unwrap();
        let c = store_loop(&mut conn, LoopType::HL, "1S72", "GAAA", "1S72|1|0|G|30").unwrap();

        assert_eq!(a.as_deref(), Some("IL_1S72_001"));
        assert_eq!(b.as_deref(), Some("IL_1S72_002"));
        assert_eq!(c.as_deref(), Some("HL_1S72_001"));
    }

    #[test]
    fn same_signature_is_not_stored_twice() {
        let mut conn = test_connection();
        store_loop(&mut conn, LoopType::HL, "2AW7", "GAAA", "2AW7|1|A|G|5, 2AW7|1|A|A|6").unwrap();
        let again = store_loop(&mut conn, LoopType::HL, "2AW7", "GAAA", "2AW7|1|A|G|5,2AW7|1|A|A|6").unwrap();
        assert_eq!(again, None);

        let count: i64 = all_loops::table.count().get_result(&mut conn).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn empty_loops_are_rejected() {
        let mut conn = test_connection();
        let result = store_loop(&mut conn, LoopType::HL, "2AW7", "", " , ");
        assert!(matches!(result, Err(StageError::Invalid(_))));
    }
}
