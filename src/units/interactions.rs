use std::path::Path;

use diesel::prelude::*;
use log::info;
use serde::Deserialize;

use crate::records;
use crate::schema::unit_pair_interactions;
use crate::stage::{Processed, StageError, StageLoader};
use crate::status::Stage;
use crate::toolkit::Toolkit;
use crate::units::check_unit;
use crate::units::models::UnitPairInteraction;

pub const INTERACTION_COLUMNS: [&str; 6] = [
    "unit_id_1",
    "unit_id_2",
    "f_lwbp",
    "f_stacks",
    "f_bphs",
    "f_crossing",
];

#[derive(Debug, Deserialize)]
struct InteractionRow {
    unit_id_1: String,
    unit_id_2: String,
    f_lwbp: Option<String>,
    f_stacks: Option<String>,
    f_bphs: Option<String>,
    f_crossing: Option<i32>,
}

/// Pairwise base pairing, stacking and base-phosphate annotations.
pub struct PairwiseInteractionsLoader<'a, T: Toolkit> {
    toolkit: &'a T,
}

impl<'a, T: Toolkit> PairwiseInteractionsLoader<'a, T> {
    pub fn new(toolkit: &'a T) -> Self {
        Self { toolkit }
    }
}

impl<'a, T: Toolkit> StageLoader for PairwiseInteractionsLoader<'a, T> {
    fn stage(&self) -> Stage {
        Stage::Interactions
    }

    fn delete_existing(
        &self,
        connection: &mut SqliteConnection,
        pdb_id: &str,
    ) -> Result<usize, StageError> {
        Ok(diesel::delete(
            unit_pair_interactions::table
                .filter(unit_pair_interactions::pdb_id.eq(pdb_id.to_uppercase())),
        )
        .execute(connection)?)
    }

    fn process(
        &self,
        connection: &mut SqliteConnection,
        pdb_id: &str,
        work_dir: &Path,
    ) -> Result<Processed, StageError> {
        let output = work_dir.join(format!("{}_interactions.csv", pdb_id));
        self.toolkit
            .call(
                "pairwiseInteractions",
                &[pdb_id.to_string(), output.to_string_lossy().to_string()],
            )
            .map_err(|err| StageError::toolkit(pdb_id, err))?;

        let rows: Vec<InteractionRow> =
            records::read_records_from_path(&output, &INTERACTION_COLUMNS)?;
        let total = rows.len();
        let pdb = pdb_id.to_uppercase();

        for (index, row) in rows.into_iter().enumerate() {
            if index % 1000 == 0 {
                info!("Inserted {0}/{1}", index, total);
            }
            check_unit(&row.unit_id_1, pdb_id)?;
            check_unit(&row.unit_id_2, pdb_id)?;

            let interaction = UnitPairInteraction {
                unit_id_1: row.unit_id_1,
                unit_id_2: row.unit_id_2,
                pdb_id: pdb.clone(),
                f_lwbp: row.f_lwbp.filter(|v| !v.is_empty()),
                f_stacks: row.f_stacks.filter(|v| !v.is_empty()),
                f_bphs: row.f_bphs.filter(|v| !v.is_empty()),
                f_crossing: row.f_crossing,
            };
            diesel::insert_into(unit_pair_interactions::table)
                .values(&interaction)
                .on_conflict((
                    unit_pair_interactions::unit_id_1,
                    unit_pair_interactions::unit_id_2,
                ))
                .do_update()
                .set(&interaction)
                .execute(connection)?;
        }

        Ok(Processed { rows: total })
    }
}
