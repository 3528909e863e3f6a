use std::collections::HashSet;
use std::path::Path;

use chrono::Utc;
use diesel::prelude::*;
use log::{info, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::loops::loops_in_structure;
use crate::loops::models::{LoopQa, LoopRelease, QaStatus};
use crate::records;
use crate::releases::{release_id, ReleaseError, ReleaseId, ReleaseMode};
use crate::schema::{loop_qa, loop_releases};
use crate::stage::{run_stage, Processed, StageError, StageLoader, StageSummary};
use crate::status::Stage;
use crate::toolkit::Toolkit;

#[derive(Error, Debug)]
pub enum QaError {
    #[error("{0}")]
    Release(#[from] ReleaseError),

    #[error("{0}")]
    Stage(#[from] StageError),
}

pub const QA_COLUMNS: [&str; 4] = ["loop_id", "status", "modifications", "complementary"];

#[derive(Debug, Deserialize)]
struct QaRow {
    loop_id: String,
    status: i32,
    modifications: Option<String>,
    complementary: Option<String>,
}

/// Runs loop quality assurance for one loop release.
pub struct LoopQaLoader<'a, T: Toolkit> {
    toolkit: &'a T,
    release_id: String,
}

impl<'a, T: Toolkit> LoopQaLoader<'a, T> {
    pub fn new(toolkit: &'a T, release_id: ReleaseId) -> Self {
        Self {
            toolkit,
            release_id: release_id.to_string(),
        }
    }
}

impl<'a, T: Toolkit> StageLoader for LoopQaLoader<'a, T> {
    fn stage(&self) -> Stage {
        Stage::LoopQa
    }

    fn delete_existing(
        &self,
        connection: &mut SqliteConnection,
        pdb_id: &str,
    ) -> Result<usize, StageError> {
        let loop_ids = loops_in_structure(connection, pdb_id)?;
        let removed = diesel::delete(
            loop_qa::table
                .filter(loop_qa::release_id.eq(&self.release_id))
                .filter(loop_qa::loop_id.eq_any(&loop_ids)),
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
        let output = work_dir.join(format!("{}_loop_qa.csv", pdb_id));
        self.toolkit
            .call(
                "loopQualityAssurance",
                &[pdb_id.to_string(), output.to_string_lossy().to_string()],
            )
            .map_err(|err| StageError::toolkit(pdb_id, err))?;

        let rows: Vec<QaRow> = records::read_records_from_path(&output, &QA_COLUMNS)?;
        let known: HashSet<String> = loops_in_structure(connection, pdb_id)?.into_iter().collect();

        let mut stored = 0;
        for row in rows {
            if !known.contains(&row.loop_id) {
                return Err(StageError::Invalid(format!(
                    "{} is not a loop of {}",
                    row.loop_id, pdb_id
                )));
            }
            let status = QaStatus::from_repr(row.status).ok_or_else(|| {
                StageError::Invalid(format!("Unknown QA status {} for {}", row.status, row.loop_id))
            })?;
            if status != QaStatus::Valid {
                info!("{} is {}", row.loop_id, status);
            }

            let qa = LoopQa {
                loop_id: row.loop_id,
                release_id: self.release_id.clone(),
                status: status.code(),
                modifications: row.modifications.filter(|m| !m.is_empty()),
                complementary: row.complementary.filter(|c| !c.is_empty()),
            };
            diesel::insert_into(loop_qa::table)
                .values(&qa)
                .on_conflict((loop_qa::loop_id, loop_qa::release_id))
                .do_update()
                .set(&qa)
                .execute(connection)?;
            stored += 1;
        }

        if stored < known.len() {
            warn!("QA covered {} of {} loops in {}", stored, known.len(), pdb_id);
        }

        Ok(Processed { rows: stored })
    }
}

pub fn latest_release(connection: &mut SqliteConnection) -> Result<Option<ReleaseId>, ReleaseError> {
    let ids: Vec<String> = loop_releases::table
        .select(loop_releases::id)
        .load(connection)?;
    Ok(release_id::latest(&ids)?)
}

/// Registers the loop release a QA run writes into.
pub fn create_release(
    connection: &mut SqliteConnection,
    mode: ReleaseMode,
    description: Option<&str>,
) -> Result<ReleaseId, ReleaseError> {
    let id = ReleaseId::following(latest_release(connection)?, mode);
    let release = LoopRelease {
        id: id.to_string(),
        created_at: Utc::now().naive_utc(),
        description: description.map(str::to_string),
    };
    diesel::insert_into(loop_releases::table)
        .values(&release)
        .execute(connection)?;
    info!("Created loop release {}", id);
    Ok(id)
}

/// Drops a loop release and every QA row written into it.
pub fn discard_release(
    connection: &mut SqliteConnection,
    release_id: &ReleaseId,
) -> Result<usize, ReleaseError> {
    let id = release_id.to_string();
    connection.transaction::<_, ReleaseError, _>(|conn| {
        let removed = diesel::delete(loop_qa::table.filter(loop_qa::release_id.eq(&id))).execute(conn)?;
        diesel::delete(loop_releases::table.filter(loop_releases::id.eq(&id))).execute(conn)?;
        warn!("Discarded loop release {} and {} QA rows", id, removed);
        Ok(removed)
    })
}

/// Runs QA for `pdb_ids` into a new loop release. Each run redoes every
/// structure; if any of them fails the release is discarded so it never
/// becomes the latest one.
pub fn run_release<T: Toolkit>(
    connection: &mut SqliteConnection,
    toolkit: &T,
    pdb_ids: &[String],
    mode: ReleaseMode,
    description: Option<&str>,
    work_dir: &Path,
) -> Result<(ReleaseId, StageSummary), QaError> {
    let release = create_release(connection, mode, description)?;
    let loader = LoopQaLoader::new(toolkit, release);

    match run_stage(&loader, connection, pdb_ids, true, work_dir) {
        Ok(summary) => Ok((release, summary)),
        Err(err) => {
            discard_release(connection, &release)?;
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;
    use crate::loops::extractor::store_loop;
    use crate::loops::models::LoopType;
    use crate::toolkit::ToolkitError;
    use std::fs;

    struct CannedToolkit(&'static str);

    impl Toolkit for CannedToolkit {
        fn call(&self, _function: &str, args: &[String]) -> Result<(), ToolkitError> {
            fs::write(&args[1], self.0).unwrap();
            Ok(())
        }
    }

    fn with_loops() -> SqliteConnection {
        let mut conn = test_connection();
        store_loop(&mut conn, LoopType::IL, "1S72", "CAG*CUG", "1S72|1|0|C|10,1S72|1|0|G|40").unwrap();
        store_loop(&mut conn, LoopType::IL, "1S72", "GA*UC", "1S72|1|0|G|20,1S72|1|0|C|30").unwrap();
        conn
    }

    #[test]
    fn releases_are_numbered_in_order() {
        let mut conn = test_connection();
        assert_eq!(create_release(&mut conn, ReleaseMode::Minor, None).unwrap(), ReleaseId::new(0, 1));
        assert_eq!(create_release(&mut conn, ReleaseMode::Minor, None).unwrap(), ReleaseId::new(0, 2));
        assert_eq!(
            create_release(&mut conn, ReleaseMode::Major, Some("yearly")).unwrap(),
            ReleaseId::new(1, 0)
        );
        assert_eq!(latest_release(&mut conn).unwrap(), Some(ReleaseId::new(1, 0)));
    }

    #[test]
    fn stores_status_codes_per_release() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = with_loops();
        let release = create_release(&mut conn, ReleaseMode::Minor, None).unwrap();
        let toolkit = CannedToolkit(
            "loop_id,status,modifications,complementary\n\
             IL_1S72_001,1,,\n\
             IL_1S72_002,3,PSU,\n",
        );
        let loader = LoopQaLoader::new(&toolkit, release);

        let summary = run_stage(&loader, &mut conn, &["1S72".to_string()], true, dir.path()).unwrap();
        assert_eq!(summary.rows, 2);

        let stored: Vec<LoopQa> = loop_qa::table
            .order(loop_qa::loop_id)
            .select(LoopQa::as_select())
            .load(&mut conn)
            .unwrap();
        assert_eq!(stored[0].status, QaStatus::Valid.code());
        assert_eq!(stored[0].modifications, None);
        assert_eq!(stored[1].status, QaStatus::ModifiedNucleotides.code());
        assert_eq!(stored[1].modifications.as_deref(), Some("PSU"));
        assert_eq!(stored[1].release_id, "0.1");
    }

    #[test]
    fn unknown_status_codes_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = with_loops();
        let release = create_release(&mut conn, ReleaseMode::Minor, None).unwrap();
        let toolkit = CannedToolkit("loop_id,status,modifications,complementary\nIL_1S72_001,9,,\n");
        let loader = LoopQaLoader::new(&toolkit, release);

        let err = run_stage(&loader, &mut conn, &["1S72".to_string()], true, dir.path()).unwrap_err();
        assert!(matches!(err, StageError::Invalid(_)));
        let count: i64 = loop_qa::table.count().get_result(&mut conn).unwrap();
        assert_eq!(count, 0);
    }
}
