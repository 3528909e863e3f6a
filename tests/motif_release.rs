use diesel::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use motif_atlas::correspondence::collection::Collection;
use motif_atlas::db::establish_connection;
use motif_atlas::loops::extractor::store_loop;
use motif_atlas::loops::models::LoopType;
use motif_atlas::motifs::models::{MotifParent, MotifReleaseDiff};
use motif_atlas::motifs::{import_release, latest_release, release_collection};
use motif_atlas::releases::{ReleaseError, ReleaseId, ReleaseMode, ReleaseOptions};
use motif_atlas::schema::{ml_handles, ml_parents, ml_release_diff};

fn database_with_hairpins(n: usize) -> SqliteConnection {
    let mut conn = establish_connection(":memory:").unwrap();
    for i in 1..=n {
        store_loop(&mut conn, LoopType::HL, "1S72", "GAAA", &format!("1S72|1|0|G|{}", i)).unwrap();
    }
    conn
}

fn hairpin(i: usize) -> String {
    format!("HL_1S72_{:03}", i)
}

fn clustering(groups: &[(&str, &[usize])]) -> Collection {
    let mut collection = Collection::new();
    for (group, members) in groups {
        for member in *members {
            collection.insert(*group, hairpin(*member));
        }
    }
    collection
}

/// Id of the motif holding `loop_id` in `release`.
fn motif_of(conn: &mut SqliteConnection, release: ReleaseId, loop_id: &str) -> String {
    release_collection(conn, LoopType::HL, &release)
        .unwrap()
        .groups()
        .find(|(_, members)| members.contains(loop_id))
        .map(|(id, _)| id.clone())
        .unwrap()
}

#[test]
fn second_release_keeps_identities_and_records_lineage() {
    let mut conn = database_with_hairpins(7);
    let mut rng = StdRng::seed_from_u64(42);

    let first = clustering(&[("Group_1", &[1, 2, 3]), ("Group_2", &[4, 5]), ("Group_3", &[6])]);
    let summary = import_release(&mut conn, LoopType::HL, &first, &ReleaseOptions::default(), &mut rng).unwrap();
    assert_eq!(summary.release_id, ReleaseId::new(0, 1));

    let stable = motif_of(&mut conn, summary.release_id, &hairpin(1));
    let grown = motif_of(&mut conn, summary.release_id, &hairpin(4));
    let dropped = motif_of(&mut conn, summary.release_id, &hairpin(6));

    let second = clustering(&[("Group_1", &[1, 2, 3]), ("Group_2", &[4, 5, 7])]);
    let summary = import_release(&mut conn, LoopType::HL, &second, &ReleaseOptions::default(), &mut rng).unwrap();
    assert_eq!(summary.release_id, ReleaseId::new(0, 2));
    assert_eq!(summary.previous, Some(ReleaseId::new(0, 1)));

    // Exact match keeps the id, the grown motif keeps its handle with a new version.
    assert_eq!(motif_of(&mut conn, summary.release_id, &hairpin(1)), stable);
    let updated = motif_of(&mut conn, summary.release_id, &hairpin(7));
    let (grown_handle, grown_version) = grown.rsplit_once('.').unwrap();
    assert_eq!(updated, format!("{}.{}", grown_handle, grown_version.parse::<u32>().unwrap() + 1));

    let parents: Vec<MotifParent> = ml_parents::table
        .filter(ml_parents::release_id.eq("0.2"))
        .filter(ml_parents::motif_id.eq(&updated))
        .select(MotifParent::as_select())
        .load(&mut conn)
        .unwrap();
    assert_eq!(parents.len(), 1);
    assert_eq!(parents[0].parent_motif_id, grown);

    let diff: MotifReleaseDiff = ml_release_diff::table
        .select(MotifReleaseDiff::as_select())
        .first(&mut conn)
        .unwrap();
    assert_eq!(diff.release_id_1, "0.2");
    assert_eq!(diff.release_id_2, "0.1");
    assert_eq!(diff.num_same_groups, 1);
    assert_eq!(diff.num_updated_groups, 1);
    assert_eq!(diff.num_added_groups, 0);
    assert_eq!(diff.removed_groups, dropped);
    assert_eq!(diff.added_loops, hairpin(7));
    assert_eq!(diff.removed_loops, hairpin(6));

    // No new handles were needed for the second release.
    let handles: i64 = ml_handles::table.count().get_result(&mut conn).unwrap();
    assert_eq!(handles, 3);
}

#[test]
fn identical_release_is_all_exact_matches() {
    let mut conn = database_with_hairpins(4);
    let mut rng = StdRng::seed_from_u64(1);
    let groups = clustering(&[("Group_1", &[1, 2]), ("Group_2", &[3, 4])]);

    import_release(&mut conn, LoopType::HL, &groups, &ReleaseOptions::default(), &mut rng).unwrap();
    let summary = import_release(&mut conn, LoopType::HL, &groups, &ReleaseOptions::default(), &mut rng).unwrap();

    let (_, diff) = &summary.diffs[0];
    assert_eq!(diff.same_groups.len(), 2);
    assert!(diff.is_empty());
}

#[test]
fn explicit_release_ids_must_move_forward() {
    let mut conn = database_with_hairpins(2);
    let mut rng = StdRng::seed_from_u64(9);
    let groups = clustering(&[("Group_1", &[1, 2])]);

    let major = ReleaseOptions {
        mode: ReleaseMode::Major,
        ..ReleaseOptions::default()
    };
    let summary = import_release(&mut conn, LoopType::HL, &groups, &major, &mut rng).unwrap();
    assert_eq!(summary.release_id, ReleaseId::new(1, 0));

    let stale = ReleaseOptions {
        release_id: Some("0.9".to_string()),
        ..ReleaseOptions::default()
    };
    let err = import_release(&mut conn, LoopType::HL, &groups, &stale, &mut rng).unwrap_err();
    assert!(matches!(err, ReleaseError::ReleaseId(_)));
    assert_eq!(latest_release(&mut conn, LoopType::HL).unwrap(), Some(ReleaseId::new(1, 0)));

    let explicit = ReleaseOptions {
        release_id: Some("1.10".to_string()),
        ..ReleaseOptions::default()
    };
    let summary = import_release(&mut conn, LoopType::HL, &groups, &explicit, &mut rng).unwrap();
    assert_eq!(summary.release_id.to_string(), "1.10");
}

#[test]
fn loop_types_have_separate_release_histories() {
    let mut conn = database_with_hairpins(2);
    store_loop(&mut conn, LoopType::IL, "1S72", "CG*CG", "1S72|1|0|C|50,1S72|1|0|G|60").unwrap();
    let mut rng = StdRng::seed_from_u64(3);

    import_release(&mut conn, LoopType::HL, &clustering(&[("Group_1", &[1, 2])]), &ReleaseOptions::default(), &mut rng)
        .unwrap();
    let internal = Collection::from_pairs([("Group_1", "IL_1S72_001")]);
    let summary = import_release(&mut conn, LoopType::IL, &internal, &ReleaseOptions::default(), &mut rng).unwrap();

    assert_eq!(summary.release_id, ReleaseId::new(0, 1));
    assert_eq!(summary.previous, None);
}
