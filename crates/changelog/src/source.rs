//! Collaborator boundary for commit history and pull request data.
//!
//! The generator never talks to git or a code host directly. It consumes:
//! - a [`HistorySource`], which lists commits between two revisions
//! - a [`PullRequestSource`], which correlates commit hashes with pull requests
//!
//! [`crate::git::GitHistory`] reads history from a local repository.
//! [`StaticHistory`] serves commits that were read earlier.
//! [`TitleReferences`] and [`StaticPullRequests`] are offline correlators.

use crate::commit::{PrMetadata, RawCommit};
use crate::error::{Error, Result};
use crate::static_regex;
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

/// Maximum number of hashes sent to a [`PullRequestSource`] in one call.
pub const DEFAULT_CHUNK_SIZE: usize = 50;

/// Source of commit history.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// List commits after `from` up to `to` (HEAD when `None`).
    ///
    /// Commits are returned newest first, without merge commits.
    async fn commits(&self, from: &str, to: Option<&str>) -> Result<Vec<RawCommit>>;
}

/// Source of pull request data keyed by commit hash.
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// Look up pull request data for each hash.
    ///
    /// A `None` value means the commit is known but has no pull request.
    /// Hashes absent from the map were not found at all.
    async fn fetch(&self, hashes: &[String]) -> Result<HashMap<String, Option<PrMetadata>>>;
}

/// History backed by a fixed, newest-first list of commits.
///
/// The requested range is ignored. Useful when the commits were already read,
/// for example to build a [`TitleReferences`] correlator first.
#[derive(Debug, Clone, Default)]
pub struct StaticHistory {
    commits: Vec<RawCommit>,
}

impl StaticHistory {
    /// Create a history from commits ordered newest first.
    #[must_use]
    pub const fn new(commits: Vec<RawCommit>) -> Self {
        Self { commits }
    }
}

#[async_trait]
impl HistorySource for StaticHistory {
    async fn commits(&self, _from: &str, _to: Option<&str>) -> Result<Vec<RawCommit>> {
        Ok(self.commits.clone())
    }
}

static PR_REFERENCE: LazyLock<Regex> = LazyLock::new(|| static_regex(r"\(#(\d+)\)\s*$"));

/// Correlator that reads the pull request number from a `(#123)` title suffix.
///
/// Squash merges on most code hosts append this suffix, so this works without
/// network access. Authors, labels and bodies stay unknown.
pub struct TitleReferences {
    titles: HashMap<String, String>,
}

impl TitleReferences {
    /// Build a correlator over the given commits.
    #[must_use]
    pub fn new(commits: &[RawCommit]) -> Self {
        Self {
            titles: commits
                .iter()
                .map(|c| (c.hash.clone(), c.title.clone()))
                .collect(),
        }
    }

    /// Extract the pull request number from a title suffix.
    #[must_use]
    pub fn pr_number(title: &str) -> Option<u64> {
        PR_REFERENCE
            .captures(title)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

#[async_trait]
impl PullRequestSource for TitleReferences {
    async fn fetch(&self, hashes: &[String]) -> Result<HashMap<String, Option<PrMetadata>>> {
        Ok(hashes
            .iter()
            .filter_map(|hash| {
                let title = self.titles.get(hash)?;
                Some((
                    hash.clone(),
                    Self::pr_number(title).map(PrMetadata::pull_request),
                ))
            })
            .collect())
    }
}

/// Correlator backed by a fixed map, e.g. exported pull request data.
#[derive(Debug, Clone, Default)]
pub struct StaticPullRequests {
    entries: HashMap<String, PrMetadata>,
}

impl StaticPullRequests {
    /// Create a correlator from a hash-to-metadata map.
    #[must_use]
    pub const fn new(entries: HashMap<String, PrMetadata>) -> Self {
        Self { entries }
    }

    /// Add or replace the metadata of one commit.
    #[must_use]
    pub fn with(mut self, hash: impl Into<String>, meta: PrMetadata) -> Self {
        self.entries.insert(hash.into(), meta);
        self
    }

    /// Load a JSON object mapping commit hashes to metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub async fn from_json_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::changelog_io_with_source(
                format!("Failed to read pull request data: {}", path.display()),
                Some(path.to_path_buf()),
                e,
            )
        })?;
        Ok(Self::new(serde_json::from_str(&content)?))
    }
}

#[async_trait]
impl PullRequestSource for StaticPullRequests {
    async fn fetch(&self, hashes: &[String]) -> Result<HashMap<String, Option<PrMetadata>>> {
        Ok(hashes
            .iter()
            .map(|hash| (hash.clone(), self.entries.get(hash).cloned()))
            .collect())
    }
}
