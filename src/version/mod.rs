//! Version management for single-package releases.
//!
//! The bumper itself is pure string logic; [`apply_bump`] mutates the
//! in-memory package metadata and [`bump_and_persist`] flushes it to disk.

mod bumper;

pub use bumper::{BumpKind, VersionTriple, bump_version};

use crate::error::{Result, VersionError};
use crate::metadata::PackageMetadata;

/// What a bump did to the package
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BumpOutcome {
    /// Version changed
    Bumped {
        /// Version before the bump
        from: String,
        /// Version after the bump
        to: String,
    },
    /// Version left untouched because it could not be bumped
    Skipped {
        /// Offending version string
        version: String,
        /// Why it was skipped
        reason: String,
    },
}

/// Bump the version held in `package`.
///
/// A version that is not three dot-separated integers is left unchanged and
/// logged, unless `strict` is set, in which case it is an error.
pub fn apply_bump(
    package: &mut PackageMetadata,
    kind: BumpKind,
    strict: bool,
) -> Result<BumpOutcome> {
    let current = package.version().unwrap_or_default().to_string();

    match bump_version(&current, kind) {
        Some(next) => {
            log::info!("Old package version: {}", current);
            package.set_version(next.clone());
            log::info!("New package version: {}", next);
            Ok(BumpOutcome::Bumped {
                from: current,
                to: next,
            })
        }
        None => {
            let reason = if current.is_empty() {
                "package has no version".to_string()
            } else if VersionTriple::parse(&current).is_some() {
                format!("{} segment would overflow", kind)
            } else {
                "expected MAJOR.MINOR.PATCH".to_string()
            };
            if strict {
                if let Err(source) = semver::Version::parse(&current) {
                    return Err(VersionError::ParseFailed {
                        version: current,
                        source,
                    }
                    .into());
                }
                return Err(VersionError::InvalidVersion {
                    version: current,
                    reason,
                }
                .into());
            }
            log::warn!(
                "Skipping {} bump of malformed version '{}': {}",
                kind,
                current,
                reason
            );
            Ok(BumpOutcome::Skipped {
                version: current,
                reason,
            })
        }
    }
}

/// Bump and, if the version changed, write the package file.
pub async fn bump_and_persist(
    package: &mut PackageMetadata,
    kind: BumpKind,
    strict: bool,
) -> Result<BumpOutcome> {
    let outcome = apply_bump(package, kind, strict)?;
    if matches!(outcome, BumpOutcome::Bumped { .. }) {
        package.save().await?;
    }
    Ok(outcome)
}
