/// Correspondence between the groups of two releases.
///
/// Every new group is compared with every old group it shares members with.
/// The decision for a new group depends on how many old groups it touches
/// and on the two directional overlap ratios of each pair:
///
/// | old groups | rule | decision |
/// |---|---|---|
/// | 0 | | `new_id` |
/// | 1 | both ratios are 1 | `exact_match` |
/// | 1 | both ratios >= threshold | `correspond` |
/// | 1 | otherwise | `new_id`, old group is a parent |
/// | 2 | first candidate (by id) with both ratios >= threshold | `correspond` |
/// | 2 | none | `new_id`, both are parents |
/// | >2 | | `new_id`, all are parents |

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::warn;
use strum_macros::{Display, EnumString};
use thiserror::Error;

use crate::correspondence::collection::Collection;

pub const DEFAULT_MIN_OVERLAP: f64 = 2.0 / 3.0;

/// Above this many parents a group never inherits an identity.
pub const MAX_INHERITING_PARENTS: usize = 2;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Overlap threshold must be in (0, 1], got {0}")]
    InvalidThreshold(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Decision {
    ExactMatch,
    Correspond,
    NewId,
}

/// Intersection of one new group with one old group.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlap {
    pub intersection: BTreeSet<String>,
    pub new_size: usize,
    pub old_size: usize,
}

impl Overlap {
    /// `|new ∩ old| / |new|`
    pub fn new_ratio(&self) -> f64 {
        self.intersection.len() as f64 / self.new_size as f64
    }

    /// `|new ∩ old| / |old|`
    pub fn old_ratio(&self) -> f64 {
        self.intersection.len() as f64 / self.old_size as f64
    }

    pub fn is_exact(&self) -> bool {
        self.intersection.len() == self.new_size && self.intersection.len() == self.old_size
    }

    pub fn clears(&self, threshold: f64) -> bool {
        self.new_ratio() >= threshold && self.old_ratio() >= threshold
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Correspondence {
    pub group: String,
    pub decision: Decision,
    /// Old group whose identity is inherited.
    pub matched: Option<String>,
    pub parents: Vec<String>,
    pub explanation: String,
}

#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub overlaps: BTreeMap<(String, String), Overlap>,
    pub correspondences: BTreeMap<String, Correspondence>,
    /// Old groups whose identity was not carried into the new collection.
    pub removed: BTreeSet<String>,
}

impl MergeOutcome {
    pub fn with_decision(&self, decision: Decision) -> impl Iterator<Item = &Correspondence> {
        self.correspondences
            .values()
            .filter(move |c| c.decision == decision)
    }

    pub fn count(&self, decision: Decision) -> usize {
        self.with_decision(decision).count()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Merger {
    min_overlap: f64,
}

impl Default for Merger {
    fn default() -> Self {
        Self {
            min_overlap: DEFAULT_MIN_OVERLAP,
        }
    }
}

impl Merger {
    pub fn new(min_overlap: f64) -> Result<Self, MergeError> {
        if !(min_overlap > 0.0 && min_overlap <= 1.0) {
            return Err(MergeError::InvalidThreshold(min_overlap));
        }
        Ok(Self { min_overlap })
    }

    pub fn min_overlap(&self) -> f64 {
        self.min_overlap
    }

    /// Matches the groups of `new` against the groups of `old`.
    pub fn merge(&self, new: &Collection, old: &Collection) -> MergeOutcome {
        let overlaps = compute_overlaps(new, old);

        let mut candidates: BTreeMap<&str, Vec<(&str, &Overlap)>> = BTreeMap::new();
        for ((new_group, old_group), overlap) in &overlaps {
            candidates
                .entry(new_group.as_str())
                .or_default()
                .push((old_group.as_str(), overlap));
        }

        let mut claimed: BTreeMap<String, String> = BTreeMap::new();
        let mut correspondences = BTreeMap::new();

        for group in new.group_ids() {
            let matches = candidates.remove(group.as_str()).unwrap_or_default();
            let mut correspondence = self.establish(group, &matches);

            if let Some(old_id) = correspondence.matched.clone() {
                if let Some(owner) = claimed.get(&old_id) {
                    warn!(
                        "{} would reuse {} which is already taken by {}, assigning a new id",
                        group, old_id, owner
                    );
                    correspondence.decision = Decision::NewId;
                    correspondence.matched = None;
                    correspondence.explanation = format!(
                        "{}, {} already taken by {}",
                        new_id_explanation(correspondence.parents.len()),
                        old_id,
                        owner
                    );
                } else {
                    claimed.insert(old_id, group.clone());
                }
            }

            correspondences.insert(group.clone(), correspondence);
        }

        let removed = old
            .group_ids()
            .filter(|id| !claimed.contains_key(*id))
            .cloned()
            .collect();

        MergeOutcome {
            overlaps,
            correspondences,
            removed,
        }
    }

    fn establish(&self, group: &str, matches: &[(&str, &Overlap)]) -> Correspondence {
        let parents: Vec<String> = matches.iter().map(|(id, _)| id.to_string()).collect();

        let (decision, matched, explanation) = match matches {
            [] => (Decision::NewId, None, new_id_explanation(0)),
            [(old, overlap)] if overlap.is_exact() => {
                (Decision::ExactMatch, Some(old.to_string()), "Exact match".to_string())
            }
            [(old, overlap)] if overlap.clears(self.min_overlap) => (
                Decision::Correspond,
                Some(old.to_string()),
                updated_explanation(1),
            ),
            [_] => (Decision::NewId, None, new_id_explanation(1)),
            _ if matches.len() <= MAX_INHERITING_PARENTS => {
                // Ordered by old id, so the first acceptable candidate is stable.
                match matches.iter().find(|(_, o)| o.clears(self.min_overlap)) {
                    Some((old, _)) => (
                        Decision::Correspond,
                        Some(old.to_string()),
                        updated_explanation(matches.len()),
                    ),
                    None => (Decision::NewId, None, new_id_explanation(matches.len())),
                }
            }
            _ => (Decision::NewId, None, new_id_explanation(matches.len())),
        };

        Correspondence {
            group: group.to_string(),
            decision,
            matched,
            parents,
            explanation,
        }
    }
}

/// All non-empty intersections between groups of `new` and `old`.
pub fn compute_overlaps(new: &Collection, old: &Collection) -> BTreeMap<(String, String), Overlap> {
    let mut owners: HashMap<&str, Vec<&str>> = HashMap::new();
    for (old_group, members) in old.groups() {
        for member in members {
            owners.entry(member.as_str()).or_default().push(old_group.as_str());
        }
    }

    let mut overlaps = BTreeMap::new();
    for (new_group, members) in new.groups() {
        let mut shared: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
        for member in members {
            if let Some(old_groups) = owners.get(member.as_str()) {
                for old_group in old_groups {
                    shared.entry(*old_group).or_default().insert(member.clone());
                }
            }
        }

        for (old_group, intersection) in shared {
            let old_size = old.get(old_group).map(|m| m.len()).unwrap_or(0);
            overlaps.insert(
                (new_group.clone(), old_group.to_string()),
                Overlap {
                    intersection,
                    new_size: members.len(),
                    old_size,
                },
            );
        }
    }
    overlaps
}

fn parents_label(count: usize) -> String {
    match count {
        0 => "no parents".to_string(),
        1 => "1 parent".to_string(),
        n => format!("{} parents", n),
    }
}

fn new_id_explanation(parents: usize) -> String {
    format!("New id, {}", parents_label(parents))
}

fn updated_explanation(parents: usize) -> String {
    format!("Updated, {}", parents_label(parents))
}
