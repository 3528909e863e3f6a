use std::fmt;
use std::str::FromStr;

use strum_macros::{Display, EnumString};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ReleaseIdError {
    #[error("Malformed release id: {0}")]
    Malformed(String),

    #[error("Release {requested} does not come after the latest release {latest}")]
    NotAfter {
        requested: ReleaseId,
        latest: ReleaseId,
    },
}

/// Which component of the release id to bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ReleaseMode {
    #[default]
    Minor,
    Major,
}

/// A `major.minor` release id. Ordering is numeric on `(major, minor)`,
/// so `1.10` comes after `1.9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ReleaseId {
    pub major: u32,
    pub minor: u32,
}

impl ReleaseId {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    pub fn next(&self, mode: ReleaseMode) -> Self {
        match mode {
            ReleaseMode::Minor => Self::new(self.major, self.minor + 1),
            ReleaseMode::Major => Self::new(self.major + 1, 0),
        }
    }

    /// The id following `latest`, or following `0.0` for the first release.
    pub fn following(latest: Option<ReleaseId>, mode: ReleaseMode) -> Self {
        latest.unwrap_or_default().next(mode)
    }

    /// Accepts an explicitly requested id only if it sorts after `latest`.
    pub fn check_after(self, latest: Option<ReleaseId>) -> Result<Self, ReleaseIdError> {
        match latest {
            Some(latest) if self <= latest => Err(ReleaseIdError::NotAfter {
                requested: self,
                latest,
            }),
            _ => Ok(self),
        }
    }
}

impl fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ReleaseId {
    type Err = ReleaseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ReleaseIdError::Malformed(s.to_string());
        let (major, minor) = s.trim().split_once('.').ok_or_else(malformed)?;
        Ok(Self {
            major: major.parse().map_err(|_| malformed())?,
            minor: minor.parse().map_err(|_| malformed())?,
        })
    }
}

/// Latest of a set of stored release ids.
pub fn latest<I, S>(ids: I) -> Result<Option<ReleaseId>, ReleaseIdError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut latest: Option<ReleaseId> = None;
    for id in ids {
        let id: ReleaseId = id.as_ref().parse()?;
        if latest.map_or(true, |current| id > current) {
            latest = Some(id);
        }
    }
    Ok(latest)
}
