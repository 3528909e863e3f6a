use std::cell::RefCell;
use std::fs;

use diesel::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use motif_atlas::correspondence::collection::Collection;
use motif_atlas::db::establish_connection;
use motif_atlas::loops::extractor::LoopExtractor;
use motif_atlas::loops::qa;
use motif_atlas::loops::{loops_in_structure, loops_of_type};
use motif_atlas::loops::models::LoopType;
use motif_atlas::motifs::import_release;
use motif_atlas::releases::{ReleaseId, ReleaseMode, ReleaseOptions};
use motif_atlas::schema::{all_loops, loop_qa};
use motif_atlas::stage::{is_toolkit_failure, run_stage};
use motif_atlas::status::{self, Stage};
use motif_atlas::toolkit::{Toolkit, ToolkitError};

/// Stands in for the numerical toolkit: writes canned loops per structure
/// and fails for structures it has no output for.
struct FakeToolkit {
    calls: RefCell<Vec<String>>,
}

impl FakeToolkit {
    fn new() -> Self {
        Self { calls: RefCell::new(Vec::new()) }
    }

    fn output_for(pdb_id: &str) -> Option<String> {
        let rows = match pdb_id {
            "1S72" => vec![
                ("HL", "GAAA", "1S72|1|0|G|5,1S72|1|0|A|6"),
                ("HL", "GCAA", "1S72|1|0|G|15,1S72|1|0|C|16"),
                ("IL", "CAG*CUG", "1S72|1|0|C|20,1S72|1|0|G|40"),
            ],
            "2AW7" => vec![("HL", "GAAA", "2AW7|1|A|G|5,2AW7|1|A|A|6")],
            _ => return None,
        };
        let mut csv = String::from("loop_type,seq,nt_ids\n");
        for (loop_type, seq, nts) in rows {
            csv.push_str(&format!("{},{},\"{}\"\n", loop_type, seq, nts));
        }
        Some(csv)
    }
}

impl Toolkit for FakeToolkit {
    fn call(&self, function: &str, args: &[String]) -> Result<(), ToolkitError> {
        self.calls.borrow_mut().push(args[0].clone());
        match Self::output_for(&args[0]) {
            Some(csv) => {
                fs::write(&args[1], csv).unwrap();
                Ok(())
            }
            None => Err(ToolkitError::Failed {
                function: function.to_string(),
                code: Some(1),
                message: "Error using extractLoops: no coordinates".to_string(),
            }),
        }
    }
}

/// Marks every loop valid, except that it fails for `fail_on`.
struct QaToolkit {
    fail_on: Option<&'static str>,
}

impl Toolkit for QaToolkit {
    fn call(&self, function: &str, args: &[String]) -> Result<(), ToolkitError> {
        let loops = match args[0].as_str() {
            "1S72" => vec!["HL_1S72_001", "HL_1S72_002", "IL_1S72_001"],
            "2AW7" => vec!["HL_2AW7_001"],
            _ => vec![],
        };
        if self.fail_on == Some(args[0].as_str()) {
            return Err(ToolkitError::Failed {
                function: function.to_string(),
                code: Some(1),
                message: "Error using loopQualityAssurance".to_string(),
            });
        }
        let mut csv = String::from("loop_id,status,modifications,complementary\n");
        for loop_id in loops {
            csv.push_str(&format!("{},1,,\n", loop_id));
        }
        fs::write(&args[1], csv).unwrap();
        Ok(())
    }
}

fn ids(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

#[test]
fn extraction_is_resumable_and_feeds_a_release() {
    let work_dir = tempfile::tempdir().unwrap();
    let mut conn = establish_connection(":memory:").unwrap();
    let toolkit = FakeToolkit::new();
    let extractor = LoopExtractor::new(&toolkit);

    let summary = run_stage(&extractor, &mut conn, &ids(&["1S72", "2AW7"]), false, work_dir.path()).unwrap();
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.rows, 4);
    assert_eq!(
        loops_in_structure(&mut conn, "1S72").unwrap(),
        ["HL_1S72_001", "HL_1S72_002", "IL_1S72_001"]
    );
    assert_eq!(fs::read_dir(work_dir.path()).unwrap().count(), 0);

    // Completed structures are skipped on the next run.
    let again = run_stage(&extractor, &mut conn, &ids(&["1S72", "2AW7"]), false, work_dir.path()).unwrap();
    assert_eq!(again.skipped, 2);
    assert_eq!(toolkit.calls.borrow().len(), 2);

    // Recalculating matches loops by signature, so nothing is duplicated.
    let redo = run_stage(&extractor, &mut conn, &ids(&["1S72"]), true, work_dir.path()).unwrap();
    assert_eq!(redo.rows, 0);
    let count: i64 = all_loops::table.count().get_result(&mut conn).unwrap();
    assert_eq!(count, 4);

    let hairpins = Collection::from_pairs([
        ("Group_1", "HL_1S72_001"),
        ("Group_1", "HL_2AW7_001"),
        ("Group_2", "HL_1S72_002"),
    ]);
    let mut rng = StdRng::seed_from_u64(8);
    let release = import_release(&mut conn, LoopType::HL, &hairpins, &ReleaseOptions::default(), &mut rng).unwrap();
    assert_eq!(release.diffs[0].1.added_groups.len(), 2);
}

#[test]
fn toolkit_failure_is_reported_and_not_committed() {
    let work_dir = tempfile::tempdir().unwrap();
    let mut conn = establish_connection(":memory:").unwrap();
    let toolkit = FakeToolkit::new();
    let extractor = LoopExtractor::new(&toolkit);

    let err = run_stage(&extractor, &mut conn, &ids(&["2AW7", "9XYZ", "1S72"]), false, work_dir.path())
        .unwrap_err();
    assert!(is_toolkit_failure(&err));
    assert!(err.to_string().contains("9XYZ"));

    // The structure before the failure is done, the rest is still pending.
    assert_eq!(
        status::pending(&mut conn, &ids(&["2AW7", "9XYZ", "1S72"]), Stage::Loops).unwrap(),
        ["9XYZ", "1S72"]
    );
    assert!(loops_in_structure(&mut conn, "1S72").unwrap().is_empty());
}

#[test]
fn failed_qa_run_leaves_the_previous_release_latest() {
    let work_dir = tempfile::tempdir().unwrap();
    let mut conn = establish_connection(":memory:").unwrap();
    let extractor_toolkit = FakeToolkit::new();
    let pdb_ids = ids(&["1S72", "2AW7"]);
    run_stage(&LoopExtractor::new(&extractor_toolkit), &mut conn, &pdb_ids, false, work_dir.path()).unwrap();

    let complete = QaToolkit { fail_on: None };
    let (first, summary) =
        qa::run_release(&mut conn, &complete, &pdb_ids, ReleaseMode::Minor, None, work_dir.path()).unwrap();
    assert_eq!(first, ReleaseId::new(0, 1));
    assert_eq!(summary.rows, 4);

    let broken = QaToolkit { fail_on: Some("2AW7") };
    let err = qa::run_release(&mut conn, &broken, &pdb_ids, ReleaseMode::Minor, None, work_dir.path())
        .unwrap_err();
    assert!(is_toolkit_failure(&err));

    // Nothing of the aborted release survives.
    assert_eq!(qa::latest_release(&mut conn).unwrap(), Some(first));
    let orphaned: i64 = loop_qa::table
        .filter(loop_qa::release_id.eq("0.2"))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(orphaned, 0);
    assert_eq!(
        loops_of_type(&mut conn, LoopType::HL, Some("0.1")).unwrap(),
        ["HL_1S72_001", "HL_1S72_002", "HL_2AW7_001"]
    );

    // The next successful run takes the freed id.
    let (next, _) =
        qa::run_release(&mut conn, &complete, &pdb_ids, ReleaseMode::Minor, None, work_dir.path()).unwrap();
    assert_eq!(next, ReleaseId::new(0, 2));
}
