//! The changelog pipeline.
//!
//! A run reads the history since a base revision, correlates commits with
//! pull requests, cancels reverts, classifies what remains against the
//! [`ReleasePolicy`] and renders the result:
//!
//! ```text
//! history -> correlate (chunked) -> cancel reverts -> global exclusion
//!         -> category + bump -> skip marker -> categories / leftovers -> render
//! ```

use crate::cache::ChangelogCache;
use crate::commit::{Commit, PrMetadata, RawCommit};
use crate::entry::{EntryText, changelog_body, changelog_entries};
use crate::error::{Error, Result};
use crate::matcher::match_category;
use crate::policy::ReleasePolicy;
use crate::render::{CategorySection, ChangeItem, ChangelogDocument, MarkdownRenderer};
use crate::revert::cancel_reverts;
use crate::scope::extract_scope;
use crate::source::{DEFAULT_CHUNK_SIZE, HistorySource, PullRequestSource};
use crate::version::{BumpTracker, BumpType};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default number of uncategorized entries rendered before truncating.
pub const DEFAULT_MAX_LEFTOVERS: usize = 100;

/// Settings of a [`ChangelogGenerator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Base URL of the repository, e.g. `https://github.com/owner/repo`.
    pub repo_url: String,
    /// Number of hashes per pull request lookup.
    pub chunk_size: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            repo_url: String::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl GeneratorConfig {
    /// Config linking into `repo_url`.
    #[must_use]
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self::default().with_repo_url(repo_url)
    }

    /// Set the repository URL. A trailing `/` is dropped.
    #[must_use]
    pub fn with_repo_url(mut self, repo_url: impl Into<String>) -> Self {
        self.repo_url = repo_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the lookup chunk size (at least 1).
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

/// Output of one changelog run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangelogResult {
    /// Rendered Markdown, empty when nothing is worth mentioning.
    pub changelog: String,
    /// Most severe bump among the classified commits.
    pub bump_type: Option<BumpType>,
    /// Number of commits read from history.
    pub total_commits: usize,
    /// Number of commits whose category carries a bump.
    pub matched_commits_with_semver: usize,
    /// Whether the previewed pull request is kept out of the changelog.
    pub pr_skipped: bool,
}

/// A pull request that is not merged yet, rendered on top of the history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestPreview {
    /// Pull request number.
    pub number: u64,
    /// Pull request title.
    pub title: String,
    /// Pull request description.
    pub body: String,
    /// Author login.
    pub author: Option<String>,
    /// Labels.
    pub labels: BTreeSet<String>,
}

impl PullRequestPreview {
    /// Preview pull request `number` titled `title`.
    #[must_use]
    pub fn new(number: u64, title: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            body: String::new(),
            author: None,
            labels: BTreeSet::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the author.
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
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

    fn hash(&self) -> String {
        format!("pull/{}", self.number)
    }

    fn into_commit(self) -> Commit {
        let raw = RawCommit::new(self.hash(), self.title.clone(), String::new());
        let mut meta = PrMetadata::pull_request(self.number)
            .with_title(self.title)
            .with_body(self.body)
            .with_labels(self.labels);
        meta.author = self.author;
        Commit::new(raw, Some(meta))
    }
}

struct Classification {
    document: ChangelogDocument,
    bump: BumpTracker,
    total_commits: usize,
    pr_skipped: bool,
}

/// Generates changelogs and version bumps from history and pull requests.
pub struct ChangelogGenerator {
    history: Arc<dyn HistorySource>,
    pull_requests: Arc<dyn PullRequestSource>,
    policy: Arc<ReleasePolicy>,
    config: GeneratorConfig,
    cache: Arc<ChangelogCache>,
}

impl ChangelogGenerator {
    /// Create a generator with its own cache.
    #[must_use]
    pub fn new(
        history: Arc<dyn HistorySource>,
        pull_requests: Arc<dyn PullRequestSource>,
        policy: ReleasePolicy,
        config: GeneratorConfig,
    ) -> Self {
        Self {
            history,
            pull_requests,
            policy: Arc::new(policy),
            config,
            cache: Arc::new(ChangelogCache::new()),
        }
    }

    /// Share `cache` with other generators.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<ChangelogCache>) -> Self {
        self.cache = cache;
        self
    }

    /// The cache holding this generator's results.
    #[must_use]
    pub const fn cache(&self) -> &Arc<ChangelogCache> {
        &self.cache
    }

    /// The release policy in use.
    #[must_use]
    pub fn policy(&self) -> &ReleasePolicy {
        &self.policy
    }

    /// Generate the changelog of the changes since `base`.
    ///
    /// Results are cached per `(base, max_leftovers)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the history or the pull request data cannot be read.
    pub async fn generate(&self, base: &str, max_leftovers: usize) -> Result<Arc<ChangelogResult>> {
        self.cache
            .get_or_try_init(base, max_leftovers, || self.run(base, max_leftovers, None))
            .await
    }

    /// Generate the changelog as it would look once `preview` is merged.
    ///
    /// The pull request is treated as the newest commit and its entries are
    /// highlighted. Previews are never cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the history or the pull request data cannot be read.
    pub async fn preview(
        &self,
        base: &str,
        max_leftovers: usize,
        preview: PullRequestPreview,
    ) -> Result<ChangelogResult> {
        self.run(base, max_leftovers, Some(preview)).await
    }

    /// Determine the version bump implied by the changes since `base`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCommits`] when there is no history since `base`,
    /// [`Error::NoBumpableCommits`] when no commit maps to a category with a
    /// bump, or the error of a failed lookup.
    pub async fn determine_bump(&self, base: &str) -> Result<BumpType> {
        let classification = self.classify(base, None).await?;
        if classification.total_commits == 0 {
            return Err(Error::no_commits(base));
        }
        classification
            .bump
            .bump()
            .ok_or_else(|| Error::no_bumpable_commits(base, classification.total_commits))
    }

    async fn run(
        &self,
        base: &str,
        max_leftovers: usize,
        preview: Option<PullRequestPreview>,
    ) -> Result<ChangelogResult> {
        let classification = self.classify(base, preview).await?;
        let changelog =
            MarkdownRenderer::new(&self.config.repo_url, max_leftovers).render(classification.document);

        let result = ChangelogResult {
            changelog,
            bump_type: classification.bump.bump(),
            total_commits: classification.total_commits,
            matched_commits_with_semver: classification.bump.matched(),
            pr_skipped: classification.pr_skipped,
        };
        info!(
            base,
            total_commits = result.total_commits,
            matched = result.matched_commits_with_semver,
            bump = ?result.bump_type,
            "Generated changelog"
        );
        Ok(result)
    }

    async fn classify(&self, base: &str, preview: Option<PullRequestPreview>) -> Result<Classification> {
        let raw = self.history.commits(base, None).await?;
        let total_commits = raw.len();
        debug!(base, total_commits, "Read commit history");

        let mut commits = self.correlate(raw).await?;

        let mut pr_skipped = false;
        let mut highlight = None;
        if let Some(preview) = preview {
            let commit = preview.into_commit();
            pr_skipped = commit.has_skip_marker()
                || self
                    .policy
                    .is_globally_excluded(&commit.labels(), commit.author());
            highlight = Some(commit.hash().to_string());
            commits.insert(0, commit);
        }

        let commits = cancel_reverts(commits);

        let mut bump = BumpTracker::new();
        let mut sections: BTreeMap<usize, CategorySection> = BTreeMap::new();
        let mut leftovers = Vec::new();

        for commit in commits {
            let labels = commit.labels();
            if self.policy.is_globally_excluded(&labels, commit.author()) {
                debug!(hash = %commit.hash(), "Commit excluded by release policy");
                continue;
            }

            let title = commit.display_title();
            let category = match_category(&labels, commit.author(), title, &self.policy);
            bump.record(category.and_then(|(_, c)| c.semver_bump));

            if commit.has_skip_marker() {
                debug!(hash = %commit.hash(), "Commit asks to be skipped in the changelog");
                continue;
            }

            let highlighted = highlight.as_deref() == Some(commit.hash());
            let item = change_item(&commit, highlighted);
            match (category, commit.pr_number()) {
                (Some((index, category)), Some(_)) => {
                    sections
                        .entry(index)
                        .or_insert_with(|| CategorySection {
                            title: category.title.clone(),
                            position: Some(index),
                            items: Vec::new(),
                        })
                        .items
                        .push((extract_scope(title), item));
                }
                _ => leftovers.push(item),
            }
        }

        Ok(Classification {
            document: ChangelogDocument {
                sections: sections.into_values().collect(),
                leftovers,
            },
            bump,
            total_commits,
            pr_skipped,
        })
    }

    async fn correlate(&self, raw: Vec<RawCommit>) -> Result<Vec<Commit>> {
        let hashes: Vec<String> = raw.iter().map(|c| c.hash.clone()).collect();
        let mut found: HashMap<String, Option<PrMetadata>> = HashMap::with_capacity(hashes.len());
        for chunk in hashes.chunks(self.config.chunk_size.max(1)) {
            debug!(hashes = chunk.len(), "Looking up pull requests");
            found.extend(self.pull_requests.fetch(chunk).await?);
        }

        Ok(raw
            .into_iter()
            .map(|commit| {
                let meta = found.remove(&commit.hash).unwrap_or_else(|| {
                    warn!(hash = %commit.hash, "No pull request data returned for commit");
                    None
                });
                Commit::new(commit, meta)
            })
            .collect())
    }
}

fn change_item(commit: &Commit, highlight: bool) -> ChangeItem {
    let entries = commit
        .pr_body()
        .and_then(changelog_entries)
        .unwrap_or_else(|| vec![EntryText::new(commit.display_title())]);

    let body = [commit.pr_body(), Some(commit.raw.body.as_str())]
        .into_iter()
        .flatten()
        .find_map(changelog_body);

    let item = ChangeItem::new(commit.hash(), entries)
        .with_body(body)
        .highlighted(highlight);
    match commit.pr_number() {
        Some(pr) => item.with_pull_request(pr, commit.author().map(str::to_string)),
        None => item,
    }
}
