//! Semantic version bumping for `MAJOR.MINOR.PATCH` strings.

use crate::error::VersionError;
use std::fmt;
use std::str::FromStr;

/// Which segment of the version increments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BumpKind {
    /// `x.y.z` -> `x.y.(z+1)`
    Patch,
    /// `x.y.z` -> `x.(y+1).0`
    Minor,
    /// `x.y.z` -> `(x+1).0.0`
    Major,
}

impl BumpKind {
    /// Lowercase name, as used in step names and on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            BumpKind::Patch => "patch",
            BumpKind::Minor => "minor",
            BumpKind::Major => "major",
        }
    }
}

impl fmt::Display for BumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BumpKind {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "patch" => Ok(BumpKind::Patch),
            "minor" => Ok(BumpKind::Minor),
            "major" => Ok(BumpKind::Major),
            other => Err(VersionError::UnsupportedBump {
                bump: other.to_string(),
            }),
        }
    }
}

/// A parsed three-part version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct VersionTriple {
    /// Major segment
    pub major: u64,
    /// Minor segment
    pub minor: u64,
    /// Patch segment
    pub patch: u64,
}

impl VersionTriple {
    /// Parse `"X.Y.Z"`; anything other than three dot-separated integers is `None`
    pub fn parse(version: &str) -> Option<Self> {
        let parts: Vec<&str> = version.trim().split('.').collect();
        if parts.len() != 3 {
            return None;
        }
        let segment = |s: &str| -> Option<u64> {
            if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            s.parse().ok()
        };
        Some(Self {
            major: segment(parts[0])?,
            minor: segment(parts[1])?,
            patch: segment(parts[2])?,
        })
    }

    /// The next version for `kind`, or `None` if the bumped segment would overflow
    pub fn bumped(self, kind: BumpKind) -> Option<Self> {
        let next = match kind {
            BumpKind::Patch => Self {
                patch: self.patch.checked_add(1)?,
                ..self
            },
            BumpKind::Minor => Self {
                minor: self.minor.checked_add(1)?,
                patch: 0,
                ..self
            },
            BumpKind::Major => Self {
                major: self.major.checked_add(1)?,
                minor: 0,
                patch: 0,
            },
        };
        Some(next)
    }
}

impl fmt::Display for VersionTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Bump `version`, or `None` when it is not three dot-separated integers
/// or the bumped segment would overflow.
pub fn bump_version(version: &str, kind: BumpKind) -> Option<String> {
    VersionTriple::parse(version)?.bumped(kind).map(|v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_examples() {
        assert_eq!(bump_version("1.4.9", BumpKind::Patch).as_deref(), Some("1.4.10"));
        assert_eq!(bump_version("1.4.9", BumpKind::Minor).as_deref(), Some("1.5.0"));
        assert_eq!(bump_version("1.4.9", BumpKind::Major).as_deref(), Some("2.0.0"));
    }

    #[test]
    fn test_bump_overflow_is_not_a_version() {
        let max = u64::MAX;
        assert_eq!(bump_version(&format!("1.2.{}", max), BumpKind::Patch), None);
        assert_eq!(bump_version(&format!("1.{}.3", max), BumpKind::Minor), None);
        assert_eq!(bump_version(&format!("{}.2.3", max), BumpKind::Major), None);
        // Only the incremented segment matters
        assert_eq!(
            bump_version(&format!("1.2.{}", max), BumpKind::Minor).as_deref(),
            Some("1.3.0")
        );
    }

    #[test]
    fn test_bump_from_zero() {
        assert_eq!(bump_version("0.0.0", BumpKind::Patch).as_deref(), Some("0.0.1"));
        assert_eq!(bump_version("0.0.7", BumpKind::Minor).as_deref(), Some("0.1.0"));
        assert_eq!(bump_version("0.9.7", BumpKind::Major).as_deref(), Some("1.0.0"));
    }

    #[test]
    fn test_bump_properties_hold_across_range() {
        for x in [0u64, 1, 7, 10, 99] {
            for y in [0u64, 3, 12] {
                for z in [0u64, 9, 41] {
                    let v = format!("{x}.{y}.{z}");
                    let patch = format!("{x}.{y}.{}", z + 1);
                    let minor = format!("{x}.{}.0", y + 1);
                    let major = format!("{}.0.0", x + 1);
                    assert_eq!(bump_version(&v, BumpKind::Patch), Some(patch));
                    assert_eq!(bump_version(&v, BumpKind::Minor), Some(minor));
                    assert_eq!(bump_version(&v, BumpKind::Major), Some(major));
                }
            }
        }
    }

    #[test]
    fn test_malformed_versions_are_rejected() {
        for bad in ["1.4", "1.4.9.2", "", "1..2", "a.b.c", "1.4.x", "1.2.3-beta.1", "-1.2.3"] {
            assert_eq!(bump_version(bad, BumpKind::Patch), None, "{bad:?}");
        }
    }

    #[test]
    fn test_bump_kind_parsing() {
        assert_eq!("Patch".parse::<BumpKind>().unwrap(), BumpKind::Patch);
        assert_eq!("major".parse::<BumpKind>().unwrap(), BumpKind::Major);
        assert!("prerelease".parse::<BumpKind>().is_err());
        assert_eq!(BumpKind::Minor.to_string(), "minor");
    }
}
