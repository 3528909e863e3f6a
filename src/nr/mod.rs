use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

use chrono::Utc;
use diesel::prelude::*;
use log::info;
use rand::Rng;
use serde::Deserialize;

use crate::correspondence::collection::Collection;
use crate::correspondence::identifiers::HandleRegistry;
use crate::correspondence::merger::Merger;
use crate::nr::models::{NrClass, NrMember, NrParent, NrRelease, NrReleaseDiff};
use crate::records;
use crate::releases::{
    reconcile, release_id, resolve_release_id, Reconciled, ReleaseError, ReleaseId,
    ReleaseOptions, ReleaseSummary,
};
use crate::schema::{nr_classes, nr_handles, nr_members, nr_parents, nr_release_diff, nr_releases};

pub mod models;

pub const NR_COLUMNS: [&str; 4] = ["resolution", "group_id", "member_id", "representative"];

/// Resolution label for the class list without a cutoff.
pub const ALL_RESOLUTIONS: &str = "all";

#[derive(Debug, Deserialize)]
struct NrRow {
    resolution: String,
    group_id: String,
    member_id: String,
    #[serde(deserialize_with = "records::deserialize_flag")]
    representative: bool,
}

/// Equivalence classes per resolution cutoff, with one representative per
/// class.
#[derive(Debug, Clone, Default)]
pub struct NrClustering {
    classes: BTreeMap<String, Collection>,
    representatives: BTreeMap<(String, String), String>,
}

impl NrClustering {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ReleaseError> {
        let rows: Vec<NrRow> = records::read_records(reader, &NR_COLUMNS)?;
        let mut clustering = Self::default();

        for (index, row) in rows.into_iter().enumerate() {
            if row.group_id.is_empty() || row.member_id.is_empty() {
                return Err(ReleaseError::Invalid(format!(
                    "Empty identifier in row {}",
                    index + 1
                )));
            }
            let resolution = normalize_resolution(&row.resolution)?;
            if row.representative {
                let key = (resolution.clone(), row.group_id.clone());
                if let Some(existing) = clustering.representatives.insert(key, row.member_id.clone()) {
                    return Err(ReleaseError::Invalid(format!(
                        "Class {} at {} has two representatives: {} and {}",
                        row.group_id, resolution, existing, row.member_id
                    )));
                }
            }
            clustering
                .classes
                .entry(resolution)
                .or_default()
                .insert(row.group_id, row.member_id);
        }

        for (resolution, classes) in &clustering.classes {
            for group in classes.group_ids() {
                let key = (resolution.clone(), group.clone());
                if !clustering.representatives.contains_key(&key) {
                    return Err(ReleaseError::Invalid(format!(
                        "Class {} at {} has no representative",
                        group, resolution
                    )));
                }
            }
        }
        Ok(clustering)
    }

    pub fn from_path(path: &Path) -> Result<Self, ReleaseError> {
        Self::from_reader(records::open(path)?)
    }

    pub fn resolutions(&self) -> impl Iterator<Item = &String> {
        self.classes.keys()
    }

    pub fn classes(&self, resolution: &str) -> Option<&Collection> {
        self.classes.get(resolution)
    }

    pub fn representative(&self, resolution: &str, group: &str) -> Option<&str> {
        self.representatives
            .get(&(resolution.to_string(), group.to_string()))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// `4.0A`, `4.0` and `4` all become `4.0`; `all` stays `all`. Cutoffs
/// finer than a tenth of an angstrom are rejected, since two of them
/// would share one label.
pub fn normalize_resolution(raw: &str) -> Result<String, ReleaseError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case(ALL_RESOLUTIONS) {
        return Ok(ALL_RESOLUTIONS.to_string());
    }
    let number = trimmed.trim_end_matches(['A', 'Å']);
    match number.parse::<f64>() {
        Ok(cutoff) if cutoff.is_finite() && cutoff > 0.0 => {
            let tenths = cutoff * 10.0;
            if (tenths - tenths.round()).abs() > 1e-9 {
                return Err(ReleaseError::Invalid(format!(
                    "Resolution cutoff {} is finer than 0.1",
                    raw
                )));
            }
            Ok(format!("{:.1}", cutoff))
        }
        _ => Err(ReleaseError::Invalid(format!("Invalid resolution cutoff: {}", raw))),
    }
}

pub fn class_prefix(resolution: &str) -> String {
    format!("NR_{}", resolution)
}

pub fn latest_release(connection: &mut SqliteConnection) -> Result<Option<ReleaseId>, ReleaseError> {
    let ids: Vec<String> = nr_releases::table.select(nr_releases::id).load(connection)?;
    Ok(release_id::latest(&ids)?)
}

/// Resolutions present in a stored release.
pub fn release_resolutions(
    connection: &mut SqliteConnection,
    release: &ReleaseId,
) -> QueryResult<Vec<String>> {
    nr_classes::table
        .filter(nr_classes::release_id.eq(release.to_string()))
        .select(nr_classes::resolution)
        .distinct()
        .order(nr_classes::resolution)
        .load(connection)
}

/// Class membership of a stored release at one resolution.
pub fn release_collection(
    connection: &mut SqliteConnection,
    release: &ReleaseId,
    resolution: &str,
) -> Result<Collection, ReleaseError> {
    let class_ids: Vec<String> = nr_classes::table
        .filter(nr_classes::release_id.eq(release.to_string()))
        .filter(nr_classes::resolution.eq(resolution))
        .select(nr_classes::id)
        .load(connection)?;

    let pairs: Vec<(String, String)> = nr_members::table
        .filter(nr_members::release_id.eq(release.to_string()))
        .filter(nr_members::class_id.eq_any(&class_ids))
        .select((nr_members::class_id, nr_members::member_id))
        .load(connection)?;
    Ok(Collection::from_pairs(pairs))
}

/// Imports one non-redundant release covering every resolution cutoff.
/// Each cutoff is matched only against the same cutoff of the previous
/// release; cutoffs that disappear are reported as fully removed.
pub fn import_release<R: Rng + ?Sized>(
    connection: &mut SqliteConnection,
    clustering: &NrClustering,
    options: &ReleaseOptions,
    rng: &mut R,
) -> Result<ReleaseSummary, ReleaseError> {
    if clustering.is_empty() {
        return Err(ReleaseError::Invalid("No NR classes to import".to_string()));
    }

    let previous = latest_release(connection)?;
    let release = resolve_release_id(previous, options.release_id.as_deref(), options.mode)?;

    let mut resolutions: BTreeSet<String> = clustering.resolutions().cloned().collect();
    if let Some(previous) = &previous {
        resolutions.extend(release_resolutions(connection, previous)?);
    }

    let handles: Vec<String> = nr_handles::table.select(nr_handles::handle).load(connection)?;
    let mut registry = HandleRegistry::from_existing(handles);
    let merger = Merger::default();
    let empty = Collection::new();

    let mut reconciled: Vec<(String, Reconciled)> = Vec::new();
    for resolution in &resolutions {
        let old = match &previous {
            Some(previous) => release_collection(connection, previous, resolution)?,
            None => Collection::new(),
        };
        let new = clustering.classes(resolution).unwrap_or(&empty);
        let result = reconcile(
            &merger,
            new,
            &old,
            &class_prefix(resolution),
            &mut registry,
            rng,
        )?;
        reconciled.push((resolution.clone(), result));
    }

    let release_id = release.to_string();
    connection.transaction::<_, ReleaseError, _>(|conn| {
        diesel::insert_into(nr_releases::table)
            .values(&NrRelease {
                id: release_id.clone(),
                created_at: Utc::now().naive_utc(),
                description: options.description.clone(),
            })
            .execute(conn)?;

        for (resolution, result) in &reconciled {
            for handle in result.new_handles() {
                diesel::insert_into(nr_handles::table)
                    .values(nr_handles::handle.eq(handle))
                    .execute(conn)?;
            }

            let classes = clustering.classes(resolution).unwrap_or(&empty);
            for assignment in &result.assignments {
                let class_id = assignment.id.to_string();
                diesel::insert_into(nr_classes::table)
                    .values(&NrClass {
                        id: class_id.clone(),
                        release_id: release_id.clone(),
                        resolution: resolution.clone(),
                        handle: assignment.id.handle().to_string(),
                        version: assignment.id.version() as i32,
                        comment: assignment.explanation.clone(),
                    })
                    .execute(conn)?;

                let representative = clustering.representative(resolution, &assignment.group);
                let members: Vec<NrMember> = classes
                    .get(&assignment.group)
                    .into_iter()
                    .flatten()
                    .map(|member| NrMember {
                        class_id: class_id.clone(),
                        release_id: release_id.clone(),
                        member_id: member.clone(),
                        representative: representative == Some(member.as_str()),
                    })
                    .collect();
                diesel::insert_into(nr_members::table)
                    .values(&members)
                    .execute(conn)?;

                let parents: Vec<NrParent> = assignment
                    .parents
                    .iter()
                    .map(|parent| NrParent {
                        class_id: class_id.clone(),
                        release_id: release_id.clone(),
                        parent_class_id: parent.to_string(),
                    })
                    .collect();
                if !parents.is_empty() {
                    diesel::insert_into(nr_parents::table)
                        .values(&parents)
                        .execute(conn)?;
                }
            }

            if let Some(previous) = &previous {
                diesel::insert_into(nr_release_diff::table)
                    .values(&NrReleaseDiff::new(
                        &release_id,
                        &previous.to_string(),
                        resolution,
                        &result.diff,
                    ))
                    .execute(conn)?;
            }
            info!("Stored {} classes at {}", result.assignments.len(), resolution);
        }
        Ok(())
    })?;

    info!("Committed NR release {}", release);
    Ok(ReleaseSummary {
        kind: "nr".to_string(),
        release_id: release,
        previous,
        diffs: reconciled
            .into_iter()
            .map(|(resolution, result)| (resolution, result.diff))
            .collect(),
    })
}
