use std::collections::BTreeSet;
use std::fmt;

use crate::correspondence::collection::Collection;
use crate::correspondence::merger::{Decision, MergeOutcome};
use crate::correspondence::Assignment;

/// What changed between two consecutive releases of one classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseDiff {
    pub same_groups: Vec<String>,
    pub updated_groups: Vec<String>,
    pub added_groups: Vec<String>,
    pub removed_groups: Vec<String>,
    pub added_members: Vec<String>,
    pub removed_members: Vec<String>,
}

impl ReleaseDiff {
    pub fn new(
        assignments: &[Assignment],
        outcome: &MergeOutcome,
        new: &Collection,
        old: &Collection,
    ) -> Self {
        let mut diff = Self::default();

        for assignment in assignments {
            let id = assignment.id.to_string();
            match assignment.decision {
                Decision::ExactMatch => diff.same_groups.push(id),
                Decision::Correspond => diff.updated_groups.push(id),
                Decision::NewId => diff.added_groups.push(id),
            }
        }
        diff.removed_groups = outcome.removed.iter().cloned().collect();

        let new_members = new.members();
        let old_members = old.members();
        diff.added_members = difference(&new_members, &old_members);
        diff.removed_members = difference(&old_members, &new_members);

        diff.same_groups.sort();
        diff.updated_groups.sort();
        diff.added_groups.sort();
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.updated_groups.is_empty()
            && self.added_groups.is_empty()
            && self.removed_groups.is_empty()
            && self.added_members.is_empty()
            && self.removed_members.is_empty()
    }
}

impl fmt::Display for ReleaseDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} same, {} updated, {} added, {} removed groups; {} added, {} removed members",
            self.same_groups.len(),
            self.updated_groups.len(),
            self.added_groups.len(),
            self.removed_groups.len(),
            self.added_members.len(),
            self.removed_members.len(),
        )
    }
}

/// Space separated, the way id lists are stored in diff rows.
pub fn join_ids(ids: &[String]) -> String {
    ids.join(" ")
}

fn difference(left: &BTreeSet<&str>, right: &BTreeSet<&str>) -> Vec<String> {
    left.difference(right).map(|s| s.to_string()).collect()
}
