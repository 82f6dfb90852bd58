//! Commit and pull request data model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Marker that keeps a change out of the rendered changelog.
///
/// The change still counts toward the version bump.
pub const SKIP_CHANGELOG_MARKER: &str = "#skip-changelog";

/// Marker that appends the commit or pull request body to its entry.
pub const BODY_IN_CHANGELOG_MARKER: &str = "#body-in-changelog";

/// One commit read from source-control history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCommit {
    /// The full commit hash.
    pub hash: String,
    /// The first line of the commit message.
    pub title: String,
    /// The rest of the commit message.
    #[serde(default)]
    pub body: String,
}

impl RawCommit {
    /// Create a new raw commit.
    #[must_use]
    pub fn new(hash: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Pull request data correlated with a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrMetadata {
    /// Login of the author, without the `@`.
    pub author: Option<String>,
    /// Pull request number.
    pub pr_number: Option<u64>,
    /// Pull request title.
    pub pr_title: Option<String>,
    /// Pull request description.
    pub pr_body: Option<String>,
    /// Labels attached to the pull request.
    pub labels: BTreeSet<String>,
}

impl PrMetadata {
    /// Metadata for a pull request with the given number.
    #[must_use]
    pub fn pull_request(number: u64) -> Self {
        Self {
            pr_number: Some(number),
            ..Self::default()
        }
    }

    /// Set the author.
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the pull request title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.pr_title = Some(title.into());
        self
    }

    /// Set the pull request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.pr_body = Some(body.into());
        self
    }

    /// Add labels.
    #[must_use]
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels.extend(labels.into_iter().map(Into::into));
        self
    }
}

/// A commit together with its pull request data, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// The commit as read from history.
    pub raw: RawCommit,
    /// Correlated pull request data.
    pub meta: Option<PrMetadata>,
}

impl Commit {
    /// Pair a raw commit with its metadata.
    #[must_use]
    pub const fn new(raw: RawCommit, meta: Option<PrMetadata>) -> Self {
        Self { raw, meta }
    }

    /// The commit hash.
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.raw.hash
    }

    /// The author login, if known.
    #[must_use]
    pub fn author(&self) -> Option<&str> {
        self.meta.as_ref().and_then(|m| m.author.as_deref())
    }

    /// The pull request number, if the commit came from one.
    #[must_use]
    pub fn pr_number(&self) -> Option<u64> {
        self.meta.as_ref().and_then(|m| m.pr_number)
    }

    /// The pull request title, if any.
    #[must_use]
    pub fn pr_title(&self) -> Option<&str> {
        self.meta.as_ref().and_then(|m| m.pr_title.as_deref())
    }

    /// The pull request body, if any.
    #[must_use]
    pub fn pr_body(&self) -> Option<&str> {
        self.meta.as_ref().and_then(|m| m.pr_body.as_deref())
    }

    /// Labels of the pull request (empty without one).
    #[must_use]
    pub fn labels(&self) -> BTreeSet<String> {
        self.meta
            .as_ref()
            .map(|m| m.labels.clone())
            .unwrap_or_default()
    }

    /// The title used for classification and rendering.
    ///
    /// Prefers the pull request title over the commit title.
    #[must_use]
    pub fn display_title(&self) -> &str {
        self.pr_title()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.raw.title)
    }

    /// The body used for markers: pull request body first, then commit body.
    #[must_use]
    pub fn display_body(&self) -> &str {
        self.pr_body()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or(&self.raw.body)
    }

    /// Whether the commit or its pull request asks to stay out of the changelog.
    #[must_use]
    pub fn has_skip_marker(&self) -> bool {
        self.raw.body.contains(SKIP_CHANGELOG_MARKER)
            || self
                .pr_body()
                .is_some_and(|b| b.contains(SKIP_CHANGELOG_MARKER))
    }
}
