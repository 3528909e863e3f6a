use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

use thiserror::Error;

use crate::records::{self, RecordError};

#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("Membership file error: {0}")]
    Records(#[from] RecordError),

    #[error("Empty identifier in membership row {row}")]
    EmptyIdentifier { row: usize },
}

pub const MEMBERSHIP_COLUMNS: [&str; 2] = ["group_id", "member_id"];

/// A labeled partition: group id -> set of member ids.
///
/// Both maps are ordered, so every walk over a collection is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    groups: BTreeMap<String, BTreeSet<String>>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, G, M>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (G, M)>,
        G: Into<String>,
        M: Into<String>,
    {
        let mut collection = Self::new();
        for (group, member) in pairs {
            collection.insert(group, member);
        }
        collection
    }

    /// Reads `group_id,member_id` rows.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CollectionError> {
        Self::from_reader_with_columns(reader, &MEMBERSHIP_COLUMNS)
    }

    /// Reads a two-column membership file whose header must be `columns`
    /// (group first, member second).
    pub fn from_reader_with_columns<R: Read>(
        reader: R,
        columns: &[&str; 2],
    ) -> Result<Self, CollectionError> {
        let rows: Vec<(String, String)> = records::read_records(reader, columns)?;
        let mut collection = Self::new();
        for (index, (group, member)) in rows.into_iter().enumerate() {
            if group.is_empty() || member.is_empty() {
                return Err(CollectionError::EmptyIdentifier { row: index + 1 });
            }
            collection.insert(group, member);
        }
        Ok(collection)
    }

    pub fn from_path(path: &Path) -> Result<Self, CollectionError> {
        Self::from_reader(records::open(path)?)
    }

    pub fn from_path_with_columns(path: &Path, columns: &[&str; 2]) -> Result<Self, CollectionError> {
        Self::from_reader_with_columns(records::open(path)?, columns)
    }

    pub fn insert(&mut self, group: impl Into<String>, member: impl Into<String>) {
        self.groups
            .entry(group.into())
            .or_default()
            .insert(member.into());
    }

    pub fn get(&self, group: &str) -> Option<&BTreeSet<String>> {
        self.groups.get(group)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.groups.iter()
    }

    pub fn group_ids(&self) -> impl Iterator<Item = &String> {
        self.groups.keys()
    }

    /// Every member of every group.
    pub fn members(&self) -> BTreeSet<&str> {
        self.groups
            .values()
            .flat_map(|members| members.iter().map(String::as_str))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_members_by_id() {
        let collection = Collection::from_pairs([("G2", "c"), ("G1", "a"), ("G1", "b"), ("G1", "a")]);
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.get("G1").map(|m| m.len()), Some(2));
        let ids: Vec<&String> = collection.group_ids().collect();
        assert_eq!(ids, ["G1", "G2"]);
        assert_eq!(collection.members().len(), 3);
    }

    #[test]
    fn reads_membership_csv() {
        let data = "group_id,member_id\nGroup_1,IL_1S72_001\nGroup_1,IL_1S72_002\nGroup_2,IL_2AW7_001\n";
        let collection = Collection::from_reader(data.as_bytes()).unwrap();
        assert_eq!(collection.len(), 2);
        assert!(collection.get("Group_1").unwrap().contains("IL_1S72_002"));
    }

    #[test]
    fn rejects_empty_identifiers() {
        let data = "group_id,member_id\nGroup_1,\n";
        let result = Collection::from_reader(data.as_bytes());
        assert!(matches!(result, Err(CollectionError::EmptyIdentifier { row: 1 })));
    }

    #[test]
    fn reads_other_column_names_in_order() {
        let data = "group_id,loop_id\nGroup_1,HL_1S72_001\n";
        let collection = Collection::from_reader_with_columns(data.as_bytes(), &["group_id", "loop_id"]).unwrap();
        assert!(collection.get("Group_1").unwrap().contains("HL_1S72_001"));

        assert!(Collection::from_reader(data.as_bytes()).is_err());
    }
}
