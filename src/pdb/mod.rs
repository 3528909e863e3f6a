pub mod models;
pub mod obsolete;
pub mod report;

use std::collections::HashSet;

use diesel::prelude::*;
use log::info;
use thiserror::Error;

use crate::db::ID_CHUNK;
use crate::pdb::models::{PdbInfo, PdbObsolete};
use crate::pdb::report::StructureSource;
use crate::records::RecordError;
use crate::schema::{pdb_info, pdb_obsolete};

/// Structures per custom report request.
pub const REPORT_BATCH_SIZE: usize = 500;

#[derive(Error, Debug)]
pub enum PdbError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid search response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid report: {0}")]
    Records(#[from] RecordError),

    #[error("Invalid date: {0}")]
    Date(String),

    #[error("Malformed obsolete record: {0}")]
    ObsoleteLine(String),

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
}

/// Refreshes `pdb_info` for `pdb_ids`, one report request per batch.
pub fn update_structures(
    connection: &mut SqliteConnection,
    source: &dyn StructureSource,
    pdb_ids: &[String],
) -> Result<usize, PdbError> {
    let mut stored = 0;
    for batch in pdb_ids.chunks(REPORT_BATCH_SIZE) {
        info!("Requesting report for {} structures", batch.len());
        let rows = report::parse_report(&source.report(batch)?)?;
        let rna = rows.iter().filter(|row| row.is_rna()).count();
        info!("Report has {} chains, {} of them RNA", rows.len(), rna);
        stored += upsert_structures(connection, &rows)?;
    }
    info!("Stored {} chains for {} structures", stored, pdb_ids.len());
    Ok(stored)
}

pub fn upsert_structures(
    connection: &mut SqliteConnection,
    rows: &[PdbInfo],
) -> Result<usize, PdbError> {
    info!("Starting to insert {} chains", rows.len());

    connection.transaction::<_, PdbError, _>(|conn| {
        for (index, row) in rows.iter().enumerate() {
            if index % 1000 == 0 {
                info!("Inserted {0}/{1}", index, rows.len());
            }

            diesel::insert_into(pdb_info::table)
                .values(row)
                .on_conflict((pdb_info::structure_id, pdb_info::chain_id))
                .do_update()
                .set(row)
                .execute(conn)?;
        }
        Ok(())
    })?;

    info!("Finished inserting all chains");
    Ok(rows.len())
}

/// Refreshes the obsolete-entries table from the current status file.
pub fn update_obsolete(
    connection: &mut SqliteConnection,
    source: &dyn StructureSource,
) -> Result<usize, PdbError> {
    let entries = obsolete::parse_obsolete(&source.obsolete_file()?)?;
    upsert_obsolete(connection, &entries)
}

pub fn upsert_obsolete(
    connection: &mut SqliteConnection,
    entries: &[PdbObsolete],
) -> Result<usize, PdbError> {
    connection.transaction::<_, PdbError, _>(|conn| {
        for entry in entries {
            diesel::insert_into(pdb_obsolete::table)
                .values(entry)
                .on_conflict(pdb_obsolete::obsolete_id)
                .do_update()
                .set(entry)
                .execute(conn)?;
        }
        Ok(())
    })?;
    info!("Stored {} obsolete entries", entries.len());
    Ok(entries.len())
}

/// Drops obsolete ids from `pdb_ids`.
pub fn current_structures(
    connection: &mut SqliteConnection,
    pdb_ids: &[String],
) -> Result<Vec<String>, PdbError> {
    let mut obsolete = HashSet::new();
    for chunk in pdb_ids.chunks(ID_CHUNK) {
        let found: Vec<String> = pdb_obsolete::table
            .filter(pdb_obsolete::obsolete_id.eq_any(chunk))
            .select(pdb_obsolete::obsolete_id)
            .load(connection)?;
        obsolete.extend(found);
    }
    Ok(pdb_ids
        .iter()
        .filter(|id| !obsolete.contains(*id))
        .cloned()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;
    use std::cell::RefCell;

    struct FakeSource {
        requested: RefCell<Vec<Vec<String>>>,
    }

    impl StructureSource for FakeSource {
        fn rna_structures(&self) -> Result<Vec<String>, PdbError> {
            Ok(vec!["1S72".to_string()])
        }

        fn report(&self, pdb_ids: &[String]) -> Result<String, PdbError> {
            self.requested.borrow_mut().push(pdb_ids.to_vec());
            let mut body = report::REPORT_COLUMNS.join(",");
            body.push('\n');
            for id in pdb_ids {
                body.push_str(&format!("{},A,Title,X-RAY DIFFRACTION,2020-01-01,3.1,RNA,1,GGC,3,\n", id));
            }
            Ok(body)
        }

        fn obsolete_file(&self) -> Result<String, PdbError> {
            Ok("OBSLTE    31-JAN-94 116L     216L\nOBSLTE    01-FEB-95 1S72\n".to_string())
        }
    }

    #[test]
    fn updates_structures_idempotently() {
        let mut conn = test_connection();
        let source = FakeSource { requested: RefCell::new(Vec::new()) };
        let ids = vec!["1S72".to_string(), "2AW7".to_string()];

        assert_eq!(update_structures(&mut conn, &source, &ids).unwrap(), 2);
        assert_eq!(update_structures(&mut conn, &source, &ids).unwrap(), 2);

        let count: i64 = pdb_info::table.count().get_result(&mut conn).unwrap();
        assert_eq!(count, 2);
        assert_eq!(source.requested.borrow().len(), 2);
    }

    #[test]
    fn upsert_overwrites_changed_fields() {
        let mut conn = test_connection();
        let mut rows = report::parse_report(
            &FakeSource { requested: RefCell::new(Vec::new()) }
                .report(&["1S72".to_string()])
                .unwrap(),
        )
        .unwrap();
        upsert_structures(&mut conn, &rows).unwrap();

        rows[0].resolution = None;
        rows[0].title = Some("Revised".to_string());
        upsert_structures(&mut conn, &rows).unwrap();

        let stored: PdbInfo = pdb_info::table
            .select(PdbInfo::as_select())
            .first(&mut conn)
            .unwrap();
        assert_eq!(stored.title.as_deref(), Some("Revised"));
        assert_eq!(stored.resolution, None);
    }

    #[test]
    fn obsolete_entries_filter_structures() {
        let mut conn = test_connection();
        let source = FakeSource { requested: RefCell::new(Vec::new()) };
        assert_eq!(update_obsolete(&mut conn, &source).unwrap(), 2);

        let ids = vec!["1S72".to_string(), "2AW7".to_string()];
        assert_eq!(current_structures(&mut conn, &ids).unwrap(), ["2AW7"]);

        let mut many: Vec<String> = (0..40_000).map(|i| format!("X{:04X}", i)).collect();
        many.push("1S72".to_string());
        let current = current_structures(&mut conn, &many).unwrap();
        assert_eq!(current.len(), 40_000);
        assert!(!current.contains(&"1S72".to_string()));
    }
}
