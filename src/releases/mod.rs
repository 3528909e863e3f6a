pub mod diff;
pub mod release_id;

use log::info;
use rand::Rng;
use thiserror::Error;

use crate::correspondence::collection::{Collection, CollectionError};
use crate::correspondence::identifiers::{HandleRegistry, IdentifierError};
use crate::correspondence::merger::{Decision, MergeOutcome, Merger};
use crate::correspondence::{assign_ids, Assignment};
use crate::records::RecordError;

pub use diff::ReleaseDiff;
pub use release_id::{ReleaseId, ReleaseIdError, ReleaseMode};

#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("{0}")]
    ReleaseId(#[from] ReleaseIdError),

    #[error("Invalid group id: {0}")]
    Identifier(#[from] IdentifierError),

    #[error("Could not read groups: {0}")]
    Collection(#[from] CollectionError),

    #[error("Could not read release input: {0}")]
    Records(#[from] RecordError),

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("{count} unknown members, first {first}")]
    UnknownMembers { count: usize, first: String },

    #[error("{0}")]
    Invalid(String),
}

/// Picks the id of the release being created: `requested` when given
/// (it must sort after `latest`), otherwise the next id for `mode`.
pub fn resolve_release_id(
    latest: Option<ReleaseId>,
    requested: Option<&str>,
    mode: ReleaseMode,
) -> Result<ReleaseId, ReleaseError> {
    match requested {
        Some(raw) => Ok(raw.parse::<ReleaseId>()?.check_after(latest)?),
        None => Ok(ReleaseId::following(latest, mode)),
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReleaseOptions {
    pub mode: ReleaseMode,
    /// Explicit id for the new release instead of the next one for `mode`.
    pub release_id: Option<String>,
    pub description: Option<String>,
}

/// A new classification matched against the previous release.
#[derive(Debug)]
pub struct Reconciled {
    pub outcome: MergeOutcome,
    pub assignments: Vec<Assignment>,
    pub diff: ReleaseDiff,
}

impl Reconciled {
    /// Handles issued for this release.
    pub fn new_handles(&self) -> impl Iterator<Item = &str> {
        self.assignments
            .iter()
            .filter(|a| a.decision == Decision::NewId)
            .map(|a| a.id.handle())
    }
}

pub fn reconcile<R: Rng + ?Sized>(
    merger: &Merger,
    new: &Collection,
    old: &Collection,
    prefix: &str,
    registry: &mut HandleRegistry,
    rng: &mut R,
) -> Result<Reconciled, ReleaseError> {
    let outcome = merger.merge(new, old);
    let assignments = assign_ids(&outcome, prefix, registry, rng)?;
    let diff = ReleaseDiff::new(&assignments, &outcome, new, old);
    info!("{}: {}", prefix, diff);
    Ok(Reconciled {
        outcome,
        assignments,
        diff,
    })
}

/// What a committed release import produced, per classification.
#[derive(Debug, Clone)]
pub struct ReleaseSummary {
    /// `ml` for motifs, `nr` for non-redundant classes.
    pub kind: String,
    pub release_id: ReleaseId,
    pub previous: Option<ReleaseId>,
    /// Diff against the previous release, keyed by loop type or resolution.
    pub diffs: Vec<(String, ReleaseDiff)>,
}
