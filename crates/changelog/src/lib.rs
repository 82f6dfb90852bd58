//! Changelog and version bump generation for relnote.
//!
//! This crate turns the commits merged since a base revision into a
//! categorized Markdown changelog and a semantic version bump, driven by a
//! repository release policy (`.github/release.yml`).
//!
//! # Architecture
//!
//! - [`source`] - collaborator traits for history and pull request data
//! - [`git`] - history read from a local repository
//! - [`policy`] - release policy loading and the conventional-commits default
//! - [`matcher`] - category assignment
//! - [`revert`] - cancellation of reverted commits
//! - [`scope`] - conventional-commit scope grouping
//! - [`entry`] - changelog text and markers found in pull request bodies
//! - [`render`] - Markdown serialization
//! - [`version`] - bump types and next-version calculation
//! - [`generator`] - the end-to-end pipeline
//! - [`cache`] - memoization of pipeline results
//! - [`changeset`] - locating and editing sections of an existing changelog
//!
//! # Example
//!
//! ```rust,ignore
//! use relnote_changelog::{ChangelogGenerator, GeneratorConfig, GitHistory, ReleasePolicy, TitleReferences};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let root = Path::new(".");
//! let history = GitHistory::new(root);
//! let commits = history.commits("v1.2.0", None).await?;
//!
//! let generator = ChangelogGenerator::new(
//!     Arc::new(history),
//!     Arc::new(TitleReferences::new(&commits)),
//!     ReleasePolicy::load(root),
//!     GeneratorConfig::new("https://github.com/owner/repo"),
//! );
//! let result = generator.generate("v1.2.0", 100).await?;
//! println!("{}", result.changelog);
//! ```

pub mod cache;
pub mod changeset;
pub mod commit;
pub mod entry;
pub mod error;
pub mod generator;
pub mod git;
pub mod matcher;
pub mod policy;
pub mod render;
pub mod revert;
pub mod scope;
pub mod source;
pub mod version;

use regex::Regex;

pub use cache::ChangelogCache;
pub use changeset::{Changeset, find_changeset, prepend_changeset, remove_changeset};
pub use commit::{Commit, PrMetadata, RawCommit};
pub use error::{Error, Result};
pub use generator::{
    ChangelogGenerator, ChangelogResult, DEFAULT_MAX_LEFTOVERS, GeneratorConfig, PullRequestPreview,
};
pub use git::GitHistory;
pub use policy::{Category, Exclusion, ReleasePolicy};
pub use source::{HistorySource, PullRequestSource, StaticHistory, StaticPullRequests, TitleReferences};
pub use version::{BumpType, next_version};

/// Compile a regex literal that is known to be valid.
#[allow(clippy::expect_used)]
pub(crate) fn static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static regex pattern is valid")
}
