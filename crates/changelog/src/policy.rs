//! Release policy: changelog categories and exclusion rules.
//!
//! The policy is read from `.github/release.yml`, the same file GitHub uses
//! for generated release notes:
//!
//! ```yaml
//! changelog:
//!   exclude:
//!     labels: [skip-changelog]
//!     authors: [dependabot]
//!   categories:
//!     - title: Features
//!       labels: [feature]
//!       commit_patterns: ["^feat"]
//!       semver: minor
//!     - title: Other
//!       labels: ["*"]
//! ```
//!
//! When the file does not exist a conventional-commits policy is used.
//! Problems in the file never abort a run: they are logged and the affected
//! part falls back to a safe default.

use crate::version::BumpType;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Location of the policy file relative to the repository root.
pub const POLICY_PATH: &str = ".github/release.yml";

/// Label that marks the wildcard category.
pub const WILDCARD_LABEL: &str = "*";

/// Labels and authors excluded from a category or from the whole changelog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exclusion {
    /// Excluded labels.
    pub labels: BTreeSet<String>,
    /// Excluded author logins.
    pub authors: BTreeSet<String>,
}

impl Exclusion {
    /// Whether an item with these labels and author is excluded.
    #[must_use]
    pub fn excludes(&self, labels: &BTreeSet<String>, author: Option<&str>) -> bool {
        !self.labels.is_disjoint(labels) || author.is_some_and(|a| self.authors.contains(a))
    }
}

/// A changelog category.
#[derive(Debug, Clone)]
pub struct Category {
    /// Section title.
    pub title: String,
    /// Labels that select this category.
    pub labels: Vec<String>,
    /// Case-insensitive patterns matched against change titles.
    pub title_patterns: Vec<Regex>,
    /// Version bump implied by changes in this category.
    pub semver_bump: Option<BumpType>,
    /// Items this category refuses.
    pub exclude: Exclusion,
}

impl Category {
    /// Create a category with a title and no rules.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            labels: Vec::new(),
            title_patterns: Vec::new(),
            semver_bump: None,
            exclude: Exclusion::default(),
        }
    }

    /// Add selecting labels.
    #[must_use]
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels.extend(labels.into_iter().map(Into::into));
        self
    }

    /// Add title patterns, skipping invalid ones.
    #[must_use]
    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let compiled = compile_patterns(&self.title, patterns);
        self.title_patterns.extend(compiled);
        self
    }

    /// Set the implied version bump.
    #[must_use]
    pub const fn with_semver(mut self, bump: BumpType) -> Self {
        self.semver_bump = Some(bump);
        self
    }

    /// Set the category exclusion rule.
    #[must_use]
    pub fn with_exclude(mut self, exclude: Exclusion) -> Self {
        self.exclude = exclude;
        self
    }

    /// Whether this is the catch-all category.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.labels.iter().any(|l| l == WILDCARD_LABEL)
    }

    /// Whether any of the given labels selects this category.
    #[must_use]
    pub fn matches_labels(&self, labels: &BTreeSet<String>) -> bool {
        self.labels.iter().any(|l| labels.contains(l))
    }

    /// Whether any title pattern matches the trimmed title.
    #[must_use]
    pub fn matches_title(&self, title: &str) -> bool {
        let title = title.trim();
        self.title_patterns.iter().any(|p| p.is_match(title))
    }
}

/// Normalized release policy.
#[derive(Debug, Clone, Default)]
pub struct ReleasePolicy {
    /// Items dropped from the changelog and from the bump calculation.
    pub global_exclude: Exclusion,
    /// Categories in declaration order.
    pub categories: Vec<Category>,
}

impl ReleasePolicy {
    /// The built-in conventional-commits policy.
    #[must_use]
    pub fn conventional() -> Self {
        const SCOPE: &str = r"(?:\([^)]+\))?";
        let categories = vec![
            Category::new("Breaking Changes 🛠")
                .with_patterns([format!(r"^\w+{SCOPE}!:"), r"^BREAKING[ -]CHANGE:".to_string()])
                .with_semver(BumpType::Major),
            Category::new("New Features ✨")
                .with_patterns([format!(r"^feat{SCOPE}!?:")])
                .with_semver(BumpType::Minor),
            Category::new("Bug Fixes 🐛")
                .with_patterns([format!(r"^fix{SCOPE}!?:"), r#"^Revert ""#.to_string()])
                .with_semver(BumpType::Patch),
            Category::new("Documentation 📚")
                .with_patterns([format!(r"^docs?{SCOPE}!?:")])
                .with_semver(BumpType::Patch),
            Category::new("Build / dependencies / internal 🔧")
                .with_patterns([format!(
                    r"^(?:build|refactor|meta|chore|ci|ref|perf){SCOPE}!?:"
                )])
                .with_semver(BumpType::Patch),
        ];

        Self {
            global_exclude: Exclusion {
                labels: BTreeSet::from(["skip-changelog".to_string()]),
                authors: BTreeSet::new(),
            },
            categories,
        }
    }

    /// Load the policy of a repository.
    ///
    /// A missing file yields [`ReleasePolicy::conventional`]; so does a file
    /// that cannot be read or parsed.
    #[must_use]
    pub fn load(repo_root: &Path) -> Self {
        let path = repo_root.join(POLICY_PATH);
        if !path.exists() {
            debug!(path = %path.display(), "No release policy file, using conventional commits");
            return Self::conventional();
        }

        match fs::read_to_string(&path) {
            Ok(content) => Self::from_yaml(&content),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read release policy, using conventional commits");
                Self::conventional()
            }
        }
    }

    /// Parse a policy document.
    ///
    /// Invalid YAML falls back to [`ReleasePolicy::conventional`]. A
    /// `categories` value that is not a list means "no categories".
    #[must_use]
    pub fn from_yaml(content: &str) -> Self {
        if content.trim().is_empty() {
            return Self::default();
        }

        let raw: RawPolicyFile = match serde_yaml::from_str(content) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Invalid release policy, using conventional commits");
                return Self::conventional();
            }
        };

        let Some(changelog) = raw.changelog else {
            return Self::default();
        };

        let categories = match changelog.categories {
            serde_yaml::Value::Sequence(items) => items
                .into_iter()
                .filter_map(|item| match serde_yaml::from_value::<RawCategory>(item) {
                    Ok(raw) => Some(raw.into_category()),
                    Err(e) => {
                        warn!(error = %e, "Skipping malformed changelog category");
                        None
                    }
                })
                .collect(),
            serde_yaml::Value::Null => Vec::new(),
            other => {
                warn!(value = ?other, "changelog.categories is not a list, ignoring it");
                Vec::new()
            }
        };

        Self {
            global_exclude: changelog.exclude.into(),
            categories,
        }
    }

    /// Categories other than the wildcard, in declaration order.
    pub fn regular_categories(&self) -> impl Iterator<Item = (usize, &Category)> {
        self.categories
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_wildcard())
    }

    /// The first wildcard category, if any.
    #[must_use]
    pub fn wildcard_category(&self) -> Option<(usize, &Category)> {
        self.categories.iter().enumerate().find(|(_, c)| c.is_wildcard())
    }

    /// Whether an item is dropped from the changelog entirely.
    #[must_use]
    pub fn is_globally_excluded(&self, labels: &BTreeSet<String>, author: Option<&str>) -> bool {
        self.global_exclude.excludes(labels, author)
    }
}

fn compile_patterns<I, S>(category: &str, patterns: I) -> Vec<Regex>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    patterns
        .into_iter()
        .filter_map(|pattern| {
            let pattern = pattern.as_ref();
            let compiled: Result<Regex, regex::Error> =
                RegexBuilder::new(pattern).case_insensitive(true).build();
            match compiled {
                Ok(regex) => Some(regex),
                Err(e) => {
                    warn!(category, pattern, error = %e, "Skipping invalid commit pattern");
                    None
                }
            }
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPolicyFile {
    changelog: Option<RawChangelog>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawChangelog {
    exclude: RawExclude,
    categories: serde_yaml::Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawExclude {
    labels: Vec<String>,
    authors: Vec<String>,
}

impl From<RawExclude> for Exclusion {
    fn from(raw: RawExclude) -> Self {
        Self {
            labels: raw.labels.into_iter().collect(),
            authors: raw.authors.into_iter().collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCategory {
    title: String,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    commit_patterns: Vec<String>,
    #[serde(default)]
    semver: Option<String>,
    #[serde(default)]
    exclude: RawExclude,
}

impl RawCategory {
    fn into_category(self) -> Category {
        let semver_bump = self.semver.as_deref().and_then(|s| {
            let bump = BumpType::parse(s);
            if bump.is_none() {
                warn!(category = %self.title, semver = s, "Unknown semver value, ignoring it");
            }
            bump
        });

        let mut category = Category::new(self.title)
            .with_labels(self.labels)
            .with_patterns(self.commit_patterns)
            .with_exclude(self.exclude.into());
        category.semver_bump = semver_bump;
        category
    }
}
