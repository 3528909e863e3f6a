/// Motif Atlas releases: one clustering of the loops of one type, matched
/// against the previous release of that type so that motifs keep their
/// handles across releases.

use chrono::Utc;
use diesel::prelude::*;
use log::{info, warn};
use rand::Rng;

use crate::correspondence::collection::Collection;
use crate::correspondence::identifiers::HandleRegistry;
use crate::correspondence::merger::Merger;
use crate::loops::models::{LoopId, LoopType};
use crate::loops::unknown_loops;
use crate::motifs::models::{Motif, MotifLoop, MotifParent, MotifRelease, MotifReleaseDiff};
use crate::releases::{
    reconcile, release_id, resolve_release_id, ReleaseError, ReleaseId, ReleaseOptions,
    ReleaseSummary,
};
use crate::schema::{ml_handles, ml_loops, ml_motifs, ml_parents, ml_release_diff, ml_releases};

pub mod models;

pub fn latest_release(
    connection: &mut SqliteConnection,
    loop_type: LoopType,
) -> Result<Option<ReleaseId>, ReleaseError> {
    let ids: Vec<String> = ml_releases::table
        .filter(ml_releases::loop_type.eq(loop_type.as_ref()))
        .select(ml_releases::id)
        .load(connection)?;
    Ok(release_id::latest(&ids)?)
}

/// Motif membership of a stored release.
pub fn release_collection(
    connection: &mut SqliteConnection,
    loop_type: LoopType,
    release: &ReleaseId,
) -> Result<Collection, ReleaseError> {
    let motif_ids: Vec<String> = ml_motifs::table
        .filter(ml_motifs::release_id.eq(release.to_string()))
        .filter(ml_motifs::loop_type.eq(loop_type.as_ref()))
        .select(ml_motifs::id)
        .load(connection)?;

    let pairs: Vec<(String, String)> = ml_loops::table
        .filter(ml_loops::release_id.eq(release.to_string()))
        .filter(ml_loops::motif_id.eq_any(&motif_ids))
        .select((ml_loops::motif_id, ml_loops::loop_id))
        .load(connection)?;
    Ok(Collection::from_pairs(pairs))
}

/// Checks the clustering before anything is written: every member must be
/// a stored loop of `loop_type`.
pub fn validate_clustering(
    connection: &mut SqliteConnection,
    loop_type: LoopType,
    clustering: &Collection,
) -> Result<(), ReleaseError> {
    if clustering.is_empty() {
        return Err(ReleaseError::Invalid(format!("No {} motifs to import", loop_type)));
    }

    let members: Vec<&str> = clustering.members().into_iter().collect();
    for member in &members {
        let id: LoopId = member.parse().map_err(ReleaseError::Invalid)?;
        if id.loop_type != loop_type {
            return Err(ReleaseError::Invalid(format!(
                "{} is not a {} loop",
                member, loop_type
            )));
        }
    }

    let unknown = unknown_loops(connection, &members)?;
    if let Some(first) = unknown.first() {
        return Err(ReleaseError::UnknownMembers {
            count: unknown.len(),
            first: first.clone(),
        });
    }
    Ok(())
}

/// Imports `clustering` as the next motif release of `loop_type`. Either
/// the whole release is written or nothing is.
pub fn import_release<R: Rng + ?Sized>(
    connection: &mut SqliteConnection,
    loop_type: LoopType,
    clustering: &Collection,
    options: &ReleaseOptions,
    rng: &mut R,
) -> Result<ReleaseSummary, ReleaseError> {
    validate_clustering(connection, loop_type, clustering)?;

    let previous = latest_release(connection, loop_type)?;
    let release = resolve_release_id(previous, options.release_id.as_deref(), options.mode)?;
    let old = match &previous {
        Some(previous) => release_collection(connection, loop_type, previous)?,
        None => Collection::new(),
    };
    info!(
        "Importing {} release {} with {} motifs (previous {:?}, {} motifs)",
        loop_type,
        release,
        clustering.len(),
        previous.map(|p| p.to_string()),
        old.len()
    );

    let handles: Vec<String> = ml_handles::table.select(ml_handles::handle).load(connection)?;
    let mut registry = HandleRegistry::from_existing(handles);
    let reconciled = reconcile(
        &Merger::default(),
        clustering,
        &old,
        loop_type.as_ref(),
        &mut registry,
        rng,
    )?;

    let release_id = release.to_string();
    connection.transaction::<_, ReleaseError, _>(|conn| {
        diesel::insert_into(ml_releases::table)
            .values(&MotifRelease {
                id: release_id.clone(),
                loop_type: loop_type.to_string(),
                created_at: Utc::now().naive_utc(),
                description: options.description.clone(),
            })
            .execute(conn)?;

        for handle in reconciled.new_handles() {
            diesel::insert_into(ml_handles::table)
                .values(ml_handles::handle.eq(handle))
                .execute(conn)?;
        }

        for (index, assignment) in reconciled.assignments.iter().enumerate() {
            if index % 1000 == 0 {
                info!("Inserted {0}/{1}", index, reconciled.assignments.len());
            }
            let motif_id = assignment.id.to_string();

            diesel::insert_into(ml_motifs::table)
                .values(&Motif {
                    id: motif_id.clone(),
                    release_id: release_id.clone(),
                    loop_type: loop_type.to_string(),
                    handle: assignment.id.handle().to_string(),
                    version: assignment.id.version() as i32,
                    comment: assignment.explanation.clone(),
                })
                .execute(conn)?;

            let loops: Vec<MotifLoop> = clustering
                .get(&assignment.group)
                .into_iter()
                .flatten()
                .map(|loop_id| MotifLoop {
                    motif_id: motif_id.clone(),
                    loop_id: loop_id.clone(),
                    release_id: release_id.clone(),
                })
                .collect();
            diesel::insert_into(ml_loops::table)
                .values(&loops)
                .execute(conn)?;

            let parents: Vec<MotifParent> = assignment
                .parents
                .iter()
                .map(|parent| MotifParent {
                    motif_id: motif_id.clone(),
                    release_id: release_id.clone(),
                    parent_motif_id: parent.to_string(),
                })
                .collect();
            if !parents.is_empty() {
                diesel::insert_into(ml_parents::table)
                    .values(&parents)
                    .execute(conn)?;
            }
        }

        if let Some(previous) = &previous {
            diesel::insert_into(ml_release_diff::table)
                .values(&MotifReleaseDiff::new(
                    &release_id,
                    &previous.to_string(),
                    loop_type.as_ref(),
                    &reconciled.diff,
                ))
                .execute(conn)?;
        }
        Ok(())
    })?;

    if reconciled.diff.is_empty() && previous.is_some() {
        warn!("{} release {} is identical to its predecessor", loop_type, release);
    }
    info!("Committed {} release {}: {}", loop_type, release, reconciled.diff);

    Ok(ReleaseSummary {
        kind: "ml".to_string(),
        release_id: release,
        previous,
        diffs: vec![(loop_type.to_string(), reconciled.diff)],
    })
}

/// Motifs of a stored release, sorted by id.
pub fn motifs_in_release(
    connection: &mut SqliteConnection,
    loop_type: LoopType,
    release: &ReleaseId,
) -> QueryResult<Vec<Motif>> {
    ml_motifs::table
        .filter(ml_motifs::release_id.eq(release.to_string()))
        .filter(ml_motifs::loop_type.eq(loop_type.as_ref()))
        .order(ml_motifs::id)
        .select(Motif::as_select())
        .load(connection)
}
