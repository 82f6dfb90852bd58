//! Error types for changelog generation.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for changelog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating a changelog or a version bump.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Failed to read or write a changelog document.
    #[error("Changelog I/O error: {message}")]
    #[diagnostic(
        code(relnote::changelog::io),
        help("Check that the changelog file exists and is writable")
    )]
    ChangelogIo {
        /// The error message
        message: String,
        /// The path that caused the error
        path: Option<PathBuf>,
        /// The underlying source error
        #[source]
        source: Option<std::io::Error>,
    },

    /// Failed to parse or validate a version string.
    #[error("Invalid version: {version}")]
    #[diagnostic(
        code(relnote::changelog::invalid_version),
        help("Version must follow semantic versioning (e.g., 1.0.0, 2.1.0-beta.1)")
    )]
    InvalidVersion {
        /// The invalid version string
        version: String,
    },

    /// No commits exist between the base revision and HEAD.
    #[error("No commits found since {base}")]
    #[diagnostic(
        code(relnote::changelog::no_commits),
        help("Make sure the base revision is correct and that changes were merged since then")
    )]
    NoCommits {
        /// The base revision the history was read from
        base: String,
    },

    /// Commits exist but none of them maps to a category carrying a bump.
    #[error("Cannot determine version bump: none of the {total} commit(s) since {base} matched a category with a semver bump")]
    #[diagnostic(
        code(relnote::changelog::no_bumpable_commits),
        help(
            "Use conventional commit titles (feat:, fix:, ...) or add `semver` to the categories in .github/release.yml"
        )
    )]
    NoBumpableCommits {
        /// The base revision the history was read from
        base: String,
        /// Number of commits that were inspected
        total: usize,
    },

    /// Git operation error.
    #[error("Git error: {message}")]
    #[diagnostic(
        code(relnote::changelog::git),
        help("Ensure you are in a git repository and the revision exists")
    )]
    Git {
        /// The error message
        message: String,
    },

    /// No section of the changelog matches a tag.
    #[error("No changelog section found for {tag}")]
    #[diagnostic(
        code(relnote::changelog::changeset_not_found),
        help("Headings must be `## <version>` or a version underlined with `--`")
    )]
    ChangesetNotFound {
        /// The tag that was looked up
        tag: String,
    },

    /// Wrapped I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(relnote::changelog::io))]
    Io(#[from] std::io::Error),

    /// Wrapped JSON error.
    #[error("JSON error: {0}")]
    #[diagnostic(code(relnote::changelog::json))]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a new changelog I/O error with source.
    #[must_use]
    pub fn changelog_io_with_source(
        message: impl Into<String>,
        path: Option<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::ChangelogIo {
            message: message.into(),
            path,
            source: Some(source),
        }
    }

    /// Create a new invalid version error.
    #[must_use]
    pub fn invalid_version(version: impl Into<String>) -> Self {
        Self::InvalidVersion {
            version: version.into(),
        }
    }

    /// Create a new "no commits" error.
    #[must_use]
    pub fn no_commits(base: impl Into<String>) -> Self {
        Self::NoCommits { base: base.into() }
    }

    /// Create a new "no bumpable commits" error.
    #[must_use]
    pub fn no_bumpable_commits(base: impl Into<String>, total: usize) -> Self {
        Self::NoBumpableCommits {
            base: base.into(),
            total,
        }
    }

    /// Create a new "changeset not found" error.
    #[must_use]
    pub fn changeset_not_found(tag: impl Into<String>) -> Self {
        Self::ChangesetNotFound { tag: tag.into() }
    }

    /// Create a new git error.
    #[must_use]
    pub fn git(message: impl Into<String>) -> Self {
        Self::Git {
            message: message.into(),
        }
    }
}
