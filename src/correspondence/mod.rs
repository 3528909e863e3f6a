pub mod collection;
pub mod identifiers;
pub mod merger;

use rand::Rng;

use crate::correspondence::identifiers::{GroupId, HandleRegistry, IdentifierError};
use crate::correspondence::merger::{Decision, MergeOutcome};

/// Final identity of one new group.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Label of the group in the new collection.
    pub group: String,
    pub id: GroupId,
    pub decision: Decision,
    pub parents: Vec<GroupId>,
    pub explanation: String,
}

/// Turns merge decisions into ids. Old group labels must be valid
/// [`GroupId`]s; new identities get `prefix`, a fresh handle and version 1.
pub fn assign_ids<R: Rng + ?Sized>(
    outcome: &MergeOutcome,
    prefix: &str,
    registry: &mut HandleRegistry,
    rng: &mut R,
) -> Result<Vec<Assignment>, IdentifierError> {
    let mut assignments = Vec::with_capacity(outcome.correspondences.len());

    for correspondence in outcome.correspondences.values() {
        let id = match (&correspondence.decision, &correspondence.matched) {
            (Decision::ExactMatch, Some(old)) => old.parse::<GroupId>()?,
            (Decision::Correspond, Some(old)) => old.parse::<GroupId>()?.next_version(),
            _ => GroupId::new(prefix, registry.issue(rng)?, 1),
        };

        let parents = correspondence
            .parents
            .iter()
            .map(|parent| parent.parse::<GroupId>())
            .collect::<Result<Vec<_>, _>>()?;

        assignments.push(Assignment {
            group: correspondence.group.clone(),
            id,
            decision: correspondence.decision,
            parents,
            explanation: correspondence.explanation.clone(),
        });
    }

    Ok(assignments)
}
