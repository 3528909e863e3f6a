use std::collections::HashSet;
use std::path::Path;

use diesel::prelude::*;
use log::info;
use serde::Deserialize;

use crate::loops::models::LoopPosition;
use crate::loops::loops_in_structure;
use crate::records;
use crate::schema::loop_positions;
use crate::stage::{Processed, StageError, StageLoader};
use crate::status::Stage;
use crate::toolkit::Toolkit;

/// `loop_id, position, nt_id, bulge, flanking`
const POSITION_FIELDS: usize = 5;

#[derive(Debug, Deserialize)]
struct PositionRow {
    loop_id: String,
    position: i32,
    nt_id: String,
    #[serde(deserialize_with = "records::deserialize_flag")]
    bulge: bool,
    #[serde(deserialize_with = "records::deserialize_flag")]
    flanking: bool,
}

/// Stores the nucleotide positions of every loop in a structure.
pub struct LoopPositionsLoader<'a, T: Toolkit> {
    toolkit: &'a T,
}

impl<'a, T: Toolkit> LoopPositionsLoader<'a, T> {
    pub fn new(toolkit: &'a T) -> Self {
        Self { toolkit }
    }
}

impl<'a, T: Toolkit> StageLoader for LoopPositionsLoader<'a, T> {
    fn stage(&self) -> Stage {
        Stage::LoopPositions
    }

    fn delete_existing(
        &self,
        connection: &mut SqliteConnection,
        pdb_id: &str,
    ) -> Result<usize, StageError> {
        let loop_ids = loops_in_structure(connection, pdb_id)?;
        let removed = diesel::delete(
            loop_positions::table.filter(loop_positions::loop_id.eq_any(&loop_ids)),
        )
        .execute(connection)?;
        Ok(removed)
    }

    fn process(
        &self,
        connection: &mut SqliteConnection,
        pdb_id: &str,
        work_dir: &Path,
    ) -> Result<Processed, StageError> {
        let output = work_dir.join(format!("{}_loop_positions.csv", pdb_id));
        self.toolkit
            .call(
                "loopPositions",
                &[pdb_id.to_string(), output.to_string_lossy().to_string()],
            )
            .map_err(|err| StageError::toolkit(pdb_id, err))?;

        let rows: Vec<PositionRow> = records::read_positional_from_path(&output, POSITION_FIELDS)?;
        let known: HashSet<String> = loops_in_structure(connection, pdb_id)?.into_iter().collect();

        let positions = rows
            .into_iter()
            .map(|row| {
                if !known.contains(&row.loop_id) {
                    return Err(StageError::Invalid(format!(
                        "{} is not a loop of {}",
                        row.loop_id, pdb_id
                    )));
                }
                Ok(LoopPosition {
                    loop_id: row.loop_id,
                    position: row.position,
                    nt_id: row.nt_id,
                    bulge: row.bulge,
                    flanking: row.flanking,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let stored = upsert_positions(connection, &positions)?;
        Ok(Processed { rows: stored })
    }
}

pub fn upsert_positions(
    connection: &mut SqliteConnection,
    positions: &[LoopPosition],
) -> Result<usize, StageError> {
    for (index, position) in positions.iter().enumerate() {
        if index % 1000 == 0 {
            info!("Inserted {0}/{1}", index, positions.len());
        }

        diesel::insert_into(loop_positions::table)
            .values(position)
            .on_conflict((loop_positions::loop_id, loop_positions::nt_id))
            .do_update()
            .set(position)
            .execute(connection)?;
    }
    Ok(positions.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;
    use crate::loops::extractor::store_loop;
    use crate::loops::models::LoopType;
    use crate::stage::run_stage;
    use crate::toolkit::ToolkitError;
    use std::fs;

    /// Writes a fixed positions file wherever it is asked to.
    struct CannedToolkit(&'static str);

    impl Toolkit for CannedToolkit {
        fn call(&self, _function: &str, args: &[String]) -> Result<(), ToolkitError> {
            fs::write(&args[1], self.0).unwrap();
            Ok(())
        }
    }

    fn with_loop() -> SqliteConnection {
        let mut conn = test_connection();
        store_loop(&mut conn, LoopType::HL, "1S72", "GAAA", "1S72|1|0|G|5,1S72|1|0|A|6").unwrap();
        conn
    }

    #[test]
    fn stores_positions_of_known_loops() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = with_loop();
        let toolkit = CannedToolkit("HL_1S72_001,1,1S72|1|0|G|5,0,1\nHL_1S72_001,2,1S72|1|0|A|6,1,0\n");
        let loader = LoopPositionsLoader::new(&toolkit);

        let summary = run_stage(&loader, &mut conn, &["1S72".to_string()], false, dir.path()).unwrap();
        assert_eq!(summary.rows, 2);

        let stored: Vec<LoopPosition> = loop_positions::table
            .order(loop_positions::position)
            .select(LoopPosition::as_select())
            .load(&mut conn)
            .unwrap();
        assert!(stored[0].flanking && !stored[0].bulge);
        assert!(stored[1].bulge && !stored[1].flanking);

        // Recalculating replaces rather than duplicates.
        run_stage(&loader, &mut conn, &["1S72".to_string()], true, dir.path()).unwrap();
        let count: i64 = loop_positions::table.count().get_result(&mut conn).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn rejects_positions_of_unknown_loops() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = with_loop();
        let toolkit = CannedToolkit("HL_2AW7_001,1,2AW7|1|A|G|5,0,1\n");
        let loader = LoopPositionsLoader::new(&toolkit);

        let err = run_stage(&loader, &mut conn, &["1S72".to_string()], false, dir.path()).unwrap_err();
        assert!(matches!(err, StageError::Invalid(_)));
    }

    #[test]
    fn rejects_short_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = with_loop();
        let toolkit = CannedToolkit("HL_1S72_001,1,1S72|1|0|G|5\n");
        let loader = LoopPositionsLoader::new(&toolkit);

        let err = run_stage(&loader, &mut conn, &["1S72".to_string()], false, dir.path()).unwrap_err();
        assert!(matches!(err, StageError::Records(_)));
    }
}
