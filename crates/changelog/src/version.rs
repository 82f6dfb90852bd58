//! Version bump calculation.
//!
//! This module provides:
//! - [`BumpType`], the semantic-version increment implied by a change
//! - [`BumpTracker`], which folds the most severe bump over a set of commits
//! - Version extraction from free text and next-version calculation

use crate::error::{Error, Result};
use crate::static_regex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Type of version bump.
///
/// Ordered by severity, so `Major > Minor > Patch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpType {
    /// Patch version bump (0.0.X).
    Patch,
    /// Minor version bump (0.X.0).
    Minor,
    /// Major version bump (X.0.0).
    Major,
}

impl BumpType {
    /// Parse a bump type from a string.
    ///
    /// Returns `None` for anything other than `major`, `minor` or `patch`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "major" => Some(Self::Major),
            "minor" => Some(Self::Minor),
            "patch" => Some(Self::Patch),
            _ => None,
        }
    }

    /// Priority of this bump, lower is more severe.
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Major => 0,
            Self::Minor => 1,
            Self::Patch => 2,
        }
    }
}

impl fmt::Display for BumpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Patch => write!(f, "patch"),
            Self::Minor => write!(f, "minor"),
            Self::Major => write!(f, "major"),
        }
    }
}

/// Accumulates the most severe bump seen across classified commits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BumpTracker {
    bump: Option<BumpType>,
    matched: usize,
}

impl BumpTracker {
    /// Create an empty tracker.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bump: None,
            matched: 0,
        }
    }

    /// Record the bump of one commit's category.
    ///
    /// Categories without a bump are ignored and do not count as matched.
    pub fn record(&mut self, bump: Option<BumpType>) {
        let Some(bump) = bump else {
            return;
        };
        self.matched += 1;
        self.bump = Some(match self.bump {
            Some(current) if current.priority() <= bump.priority() => current,
            _ => bump,
        });
    }

    /// The most severe bump recorded so far.
    #[must_use]
    pub const fn bump(&self) -> Option<BumpType> {
        self.bump
    }

    /// Number of commits that contributed a bump.
    #[must_use]
    pub const fn matched(&self) -> usize {
        self.matched
    }
}

static VERSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(
        r"(?:^|[\s(\[/@])[vV]?((?:0|[1-9]\d*)\.(?:0|[1-9]\d*)\.(?:0|[1-9]\d*)(?:-[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*)?(?:\+[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*)?)",
    )
});

/// Extract the first semantic version from arbitrary text.
///
/// A leading `v` is dropped, so `"v1.2.3 (2024-01-01)"` yields `"1.2.3"`.
#[must_use]
pub fn extract_version(text: &str) -> Option<String> {
    VERSION_REGEX.captures_iter(text).find_map(|caps| {
        let found = caps.get(1)?;
        // Reject things like "1.2.3.4" or "1.2.3abc"
        let boundary = text[found.end()..].chars().next();
        if boundary.is_some_and(|c| c.is_alphanumeric() || c == '.') {
            return None;
        }
        semver::Version::parse(found.as_str())
            .ok()
            .map(|_| found.as_str().to_string())
    })
}

/// Parse a version string, treating an empty string as `0.0.0`.
///
/// # Errors
///
/// Returns an error if the string is not a valid semantic version.
pub fn parse_version(version: &str) -> Result<semver::Version> {
    let trimmed = version.trim();
    if trimmed.is_empty() {
        return Ok(semver::Version::new(0, 0, 0));
    }
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    semver::Version::parse(trimmed).map_err(|_| Error::invalid_version(version))
}

/// Calculate the version that follows `current` for the given bump.
///
/// Pre-release versions are released rather than skipped: `1.2.3-rc.1`
/// bumped by patch becomes `1.2.3`, and `2.0.0-rc.1` bumped by major
/// becomes `2.0.0`. Build metadata is dropped.
///
/// # Errors
///
/// Returns an error if `current` is not a valid semantic version.
pub fn next_version(current: &str, bump: BumpType) -> Result<semver::Version> {
    let version = parse_version(current)?;
    let prerelease = !version.pre.is_empty();
    let (major, minor, patch) = (version.major, version.minor, version.patch);

    let next = match bump {
        BumpType::Major if prerelease && minor == 0 && patch == 0 => {
            semver::Version::new(major, 0, 0)
        }
        BumpType::Major => semver::Version::new(major + 1, 0, 0),
        BumpType::Minor if prerelease && patch == 0 => semver::Version::new(major, minor, 0),
        BumpType::Minor => semver::Version::new(major, minor + 1, 0),
        BumpType::Patch if prerelease => semver::Version::new(major, minor, patch),
        BumpType::Patch => semver::Version::new(major, minor, patch + 1),
    };
    Ok(next)
}
