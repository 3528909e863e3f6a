use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use rand::Rng;
use regex::Regex;
use thiserror::Error;

pub const HANDLE_LENGTH: usize = 5;
const HANDLE_SPACE: u32 = 100_000;

#[derive(Error, Debug, PartialEq)]
pub enum IdentifierError {
    #[error("Malformed group id: {0}")]
    Malformed(String),

    #[error("All {0} handles have been issued")]
    Exhausted(u32),

    #[error("Handle {0} has already been issued")]
    Duplicate(String),
}

fn group_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<prefix>.+)_(?P<handle>\d{5})\.(?P<version>\d+)$")
            .expect("group id pattern is valid")
    })
}

/// Identity of a motif or NR class: `{prefix}_{handle}.{version}`,
/// e.g. `IL_12345.2` or `NR_4.0_12345.1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId {
    prefix: String,
    handle: String,
    version: u32,
}

impl GroupId {
    pub fn new(prefix: impl Into<String>, handle: impl Into<String>, version: u32) -> Self {
        Self {
            prefix: prefix.into(),
            handle: handle.into(),
            version,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn handle(&self) -> &str {
        &self.handle
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Same handle, next version.
    pub fn next_version(&self) -> Self {
        Self {
            prefix: self.prefix.clone(),
            handle: self.handle.clone(),
            version: self.version + 1,
        }
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}.{}", self.prefix, self.handle, self.version)
    }
}

impl FromStr for GroupId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = group_id_pattern()
            .captures(s)
            .ok_or_else(|| IdentifierError::Malformed(s.to_string()))?;
        let version = caps["version"]
            .parse()
            .map_err(|_| IdentifierError::Malformed(s.to_string()))?;
        if version == 0 {
            return Err(IdentifierError::Malformed(s.to_string()));
        }
        Ok(Self::new(&caps["prefix"], &caps["handle"], version))
    }
}

/// Every handle ever issued. A handle is never handed out twice, even after
/// the group that owned it disappears from a release.
#[derive(Debug, Clone, Default)]
pub struct HandleRegistry {
    issued: HashSet<String>,
}

impl HandleRegistry {
    pub fn from_existing<I, S>(handles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            issued: handles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.issued.contains(handle)
    }

    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }

    pub fn reserve(&mut self, handle: &str) -> Result<(), IdentifierError> {
        if !self.issued.insert(handle.to_string()) {
            return Err(IdentifierError::Duplicate(handle.to_string()));
        }
        Ok(())
    }

    pub fn issue<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<String, IdentifierError> {
        if self.issued.len() >= HANDLE_SPACE as usize {
            return Err(IdentifierError::Exhausted(HANDLE_SPACE));
        }
        loop {
            let candidate = format!("{:0width$}", rng.gen_range(0..HANDLE_SPACE), width = HANDLE_LENGTH);
            if self.issued.insert(candidate.clone()) {
                return Ok(candidate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn parses_motif_and_nr_ids() {
        let motif: GroupId = "IL_04321.7".parse().unwrap();
        assert_eq!(motif.prefix(), "IL");
        assert_eq!(motif.handle(), "04321");
        assert_eq!(motif.version(), 7);

        let nr: GroupId = "NR_4.0_56789.12".parse().unwrap();
        assert_eq!(nr.prefix(), "NR_4.0");
        assert_eq!(nr.to_string(), "NR_4.0_56789.12");
    }

    #[test]
    fn rejects_malformed_ids() {
        for raw in ["IL_1234.1", "IL_12345", "12345.1", "IL_12345.0", "IL_12345.x"] {
            assert!(raw.parse::<GroupId>().is_err(), "{} should not parse", raw);
        }
    }

    #[test]
    fn next_version_keeps_handle() {
        let id = GroupId::new("HL", "00042", 3);
        let next = id.next_version();
        assert_eq!(next.to_string(), "HL_00042.4");
        assert!(next > id);
    }

    #[test]
    fn issued_handles_are_unique() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut registry = HandleRegistry::from_existing(["00001"]);
        let mut seen = HashSet::new();
        for _ in 0..500 {
            let handle = registry.issue(&mut rng).unwrap();
            assert_eq!(handle.len(), HANDLE_LENGTH);
            assert_ne!(handle, "00001");
            assert!(seen.insert(handle));
        }
        assert_eq!(registry.len(), 501);
    }

    #[test]
    fn reserving_twice_fails() {
        let mut registry = HandleRegistry::default();
        registry.reserve("12345").unwrap();
        assert_eq!(
            registry.reserve("12345"),
            Err(IdentifierError::Duplicate("12345".to_string()))
        );
    }
}
