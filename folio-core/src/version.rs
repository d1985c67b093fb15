//! Version markers.
//!
//! Every save of a document-translation moves its marker forward. Ordinary
//! edits bump the minor part, edits flagged as major bump the major part and
//! restart the minor part at 1. The first save of a document lands on `1.1`.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `major.minor` version marker, ordered lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    /// Marker of a document that was never saved.
    pub const NONE: Version = Version { major: 0, minor: 0 };
    /// Marker assigned on first save and after a history reset.
    pub const INITIAL: Version = Version { major: 1, minor: 1 };

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    fn bump(self, bump: VersionBump) -> Self {
        match bump {
            VersionBump::Minor => Self::new(self.major, self.minor.saturating_add(1)),
            VersionBump::Major => Self::new(self.major.saturating_add(1), 1),
        }
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidVersion(s.to_string());
        let (major, minor) = s.trim().split_once('.').ok_or_else(invalid)?;
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

/// Which part of the marker a save increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionBump {
    Minor,
    Major,
}

impl FromStr for VersionBump {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minor" => Ok(VersionBump::Minor),
            "major" => Ok(VersionBump::Major),
            other => Err(ModelError::InvalidVersion(other.to_string())),
        }
    }
}

/// Deterministic bump policy: the same flag always yields the same bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionPolicy {
    /// Bump applied to ordinary saves.
    pub ordinary: VersionBump,
    /// Bump applied to saves flagged as a major edit.
    pub flagged: VersionBump,
}

impl Default for VersionPolicy {
    fn default() -> Self {
        Self {
            ordinary: VersionBump::Minor,
            flagged: VersionBump::Major,
        }
    }
}

impl VersionPolicy {
    /// Marker following `current`.
    pub fn next(&self, current: Version, major_edit: bool) -> Version {
        if current.is_none() {
            return Version::INITIAL;
        }
        let bump = if major_edit { self.flagged } else { self.ordinary };
        current.bump(bump)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let v: Version = "2.13".parse().unwrap();
        assert_eq!(v, Version::new(2, 13));
        assert_eq!(v.to_string(), "2.13");
        assert!("2".parse::<Version>().is_err());
        assert!("a.b".parse::<Version>().is_err());
        assert!("".parse::<Version>().is_err());
    }

    #[test]
    fn test_ordering() {
        assert!(Version::new(1, 10) > Version::new(1, 9));
        assert!(Version::new(2, 1) > Version::new(1, 99));
        assert!(Version::INITIAL > Version::NONE);
    }

    #[test]
    fn test_first_save_is_initial() {
        let policy = VersionPolicy::default();
        assert_eq!(policy.next(Version::NONE, false), Version::INITIAL);
        assert_eq!(policy.next(Version::NONE, true), Version::INITIAL);
    }

    #[test]
    fn test_default_policy_bumps() {
        let policy = VersionPolicy::default();
        assert_eq!(policy.next(Version::new(1, 1), false), Version::new(1, 2));
        assert_eq!(policy.next(Version::new(1, 7), true), Version::new(2, 1));
    }

    #[test]
    fn test_major_only_policy() {
        let policy = VersionPolicy {
            ordinary: VersionBump::Major,
            flagged: VersionBump::Major,
        };
        assert_eq!(policy.next(Version::new(3, 4), false), Version::new(4, 1));
    }

    #[test]
    fn test_bump_parse() {
        assert_eq!("MAJOR".parse::<VersionBump>().unwrap(), VersionBump::Major);
        assert!("patch".parse::<VersionBump>().is_err());
    }
}
