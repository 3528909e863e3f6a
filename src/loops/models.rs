use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use regex::Regex;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString, FromRepr};

use crate::schema::{all_loops, loop_positions, loop_qa, loop_releases, loop_search};

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter, AsRefStr)]
pub enum LoopType {
    /// Internal loop
    IL,
    /// Hairpin loop
    HL,
    /// Three-way junction
    J3,
}

/// `{type}_{pdb}_{seq_id}`, e.g. `IL_1S72_001`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoopId {
    pub loop_type: LoopType,
    pub pdb_id: String,
    pub sequential_id: u32,
}

impl LoopId {
    pub fn new(loop_type: LoopType, pdb_id: &str, sequential_id: u32) -> Self {
        Self {
            loop_type,
            pdb_id: pdb_id.to_uppercase(),
            sequential_id,
        }
    }
}

impl fmt::Display for LoopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{:03}", self.loop_type, self.pdb_id, self.sequential_id)
    }
}

fn loop_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<type>IL|HL|J3)_(?P<pdb>[0-9A-Za-z]{4})_(?P<seq>\d{3,})$")
            .expect("loop id pattern is valid")
    })
}

impl FromStr for LoopId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = loop_id_pattern()
            .captures(s)
            .ok_or_else(|| format!("Malformed loop id: {}", s))?;
        let loop_type = caps["type"]
            .parse()
            .map_err(|_| format!("Unknown loop type in {}", s))?;
        let sequential_id = caps["seq"]
            .parse()
            .map_err(|_| format!("Malformed sequence number in {}", s))?;
        Ok(Self::new(loop_type, &caps["pdb"], sequential_id))
    }
}

/// Loop QA outcome codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromRepr)]
#[repr(i32)]
pub enum QaStatus {
    Valid = 1,
    MissingNucleotides = 2,
    ModifiedNucleotides = 3,
    AbnormalChainNumber = 4,
    IncompleteNucleotides = 5,
    SelfComplementary = 6,
}

impl QaStatus {
    pub fn code(self) -> i32 {
        self as i32
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable)]
#[diesel(table_name = all_loops)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Loop {
    pub id: String,
    pub loop_type: String,
    pub pdb_id: String,
    pub sequential_id: i32,
    pub length: i32,
    pub seq: String,
    pub nt_ids: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = loop_positions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LoopPosition {
    pub loop_id: String,
    pub position: i32,
    pub nt_id: String,
    pub bulge: bool,
    pub flanking: bool,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable)]
#[diesel(table_name = loop_releases)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LoopRelease {
    pub id: String,
    pub created_at: NaiveDateTime,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = loop_qa)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct LoopQa {
    pub loop_id: String,
    pub release_id: String,
    pub status: i32,
    pub modifications: Option<String>,
    pub complementary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = loop_search)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct LoopSearch {
    pub loop_id1: String,
    pub loop_id2: String,
    pub discrepancy: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_ids_round_trip_through_text() {
        let id: LoopId = "IL_1S72_007".parse().unwrap();
        assert_eq!(id.loop_type, LoopType::IL);
        assert_eq!(id.pdb_id, "1S72");
        assert_eq!(id.sequential_id, 7);
        assert_eq!(LoopId::new(LoopType::J3, "4v9f", 12).to_string(), "J3_4V9F_012");
        assert_eq!(LoopId::new(LoopType::HL, "1S72", 1234).to_string(), "HL_1S72_1234");
    }

    #[test]
    fn rejects_malformed_loop_ids() {
        for raw in ["XL_1S72_001", "IL_1S7_001", "IL_1S72_1", "IL1S72001"] {
            assert!(raw.parse::<LoopId>().is_err(), "{} should not parse", raw);
        }
    }

    #[test]
    fn qa_codes_map_to_statuses() {
        assert_eq!(QaStatus::from_repr(1), Some(QaStatus::Valid));
        assert_eq!(QaStatus::from_repr(6), Some(QaStatus::SelfComplementary));
        assert_eq!(QaStatus::from_repr(7), None);
        assert_eq!(QaStatus::ModifiedNucleotides.code(), 3);
    }
}
