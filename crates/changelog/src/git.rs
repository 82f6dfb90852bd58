//! Commit history from a local git repository.

use crate::commit::RawCommit;
use crate::error::{Error, Result};
use crate::source::HistorySource;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

const FIELD_SEPARATOR: char = '\u{1f}';
const RECORD_SEPARATOR: char = '\u{1e}';

/// Reads commits by running `git log` in a working directory.
///
/// History is restricted to the working directory, so running from a package
/// directory in a monorepo only lists commits touching that package.
#[derive(Debug, Clone)]
pub struct GitHistory {
    root: PathBuf,
}

impl GitHistory {
    /// Create a history reader for the given directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn revision_range(from: &str, to: Option<&str>) -> String {
        let to = to.unwrap_or("HEAD");
        if from.is_empty() {
            to.to_string()
        } else {
            format!("{from}..{to}")
        }
    }

    fn parse_log(stdout: &str) -> Vec<RawCommit> {
        stdout
            .split(RECORD_SEPARATOR)
            .filter_map(|record| {
                let record = record.trim_start_matches(['\n', '\r']);
                if record.trim().is_empty() {
                    return None;
                }
                let mut fields = record.splitn(3, FIELD_SEPARATOR);
                let hash = fields.next()?.trim();
                let title = fields.next().unwrap_or_default().trim();
                let body = fields.next().unwrap_or_default().trim();
                Some(RawCommit::new(hash, title, body))
            })
            .collect()
    }
}

#[async_trait]
impl HistorySource for GitHistory {
    async fn commits(&self, from: &str, to: Option<&str>) -> Result<Vec<RawCommit>> {
        let range = Self::revision_range(from, to);
        // %x1f / %x1e keep multi-line bodies intact
        let output = Command::new("git")
            .args([
                "log",
                "--no-merges",
                "--format=%H%x1f%s%x1f%b%x1e",
                &range,
                "--",
                ".",
            ])
            .current_dir(&self.root)
            .output()
            .await
            .map_err(|e| Error::git(format!("Failed to run git log: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::git(format!("git log failed for {range}: {stderr}")));
        }

        let commits = Self::parse_log(&String::from_utf8_lossy(&output.stdout));
        debug!(range = %range, count = commits.len(), "Read commit history");
        Ok(commits)
    }
}
