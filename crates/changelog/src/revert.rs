//! Revert cancellation.
//!
//! A revert and the commit it reverts cancel each other out and are both
//! dropped from the changelog. Chains cancel pairwise starting from the
//! newest commit: in `A <- revert(A) <- revert(revert(A))` the two reverts
//! cancel and `A` survives.

use crate::commit::Commit;
use crate::static_regex;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

static REVERT_TITLE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r#"^Revert "(.*)"(?:\s*\(#\d+\))?$"#));

static REVERT_BODY: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)this reverts commit ([0-9a-f]{7,40})"));

static PR_SUFFIX: LazyLock<Regex> = LazyLock::new(|| static_regex(r"\s*\(#\d+\)$"));

/// What a revert commit points at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevertTarget {
    /// Hash named in the body (`This reverts commit <sha>`).
    pub hash: Option<String>,
    /// Normalized title quoted in `Revert "<title>"`.
    pub title: Option<String>,
}

/// Strip a trailing `(#123)` and surrounding whitespace.
#[must_use]
pub fn normalize_title(title: &str) -> String {
    PR_SUFFIX.replace(title.trim(), "").trim().to_string()
}

/// Describe the target of a revert, or `None` if the commit is not a revert.
#[must_use]
pub fn revert_target(commit: &Commit) -> Option<RevertTarget> {
    let title = [Some(commit.raw.title.as_str()), commit.pr_title()]
        .into_iter()
        .flatten()
        .find_map(|t| {
            REVERT_TITLE
                .captures(t.trim())
                .and_then(|caps| caps.get(1))
                .map(|m| normalize_title(m.as_str()))
        });

    let hash = [Some(commit.raw.body.as_str()), commit.pr_body()]
        .into_iter()
        .flatten()
        .find_map(|b| {
            REVERT_BODY
                .captures(b)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_lowercase())
        });

    if title.is_none() && hash.is_none() {
        return None;
    }
    Some(RevertTarget { hash, title })
}

/// Index of the commit named by `target`.
///
/// Revert messages may name an abbreviated hash, which resolves to the only
/// commit whose hash starts with it. An ambiguous prefix resolves to nothing.
fn resolve_hash(by_hash: &HashMap<String, usize>, target: &str) -> Option<usize> {
    if let Some(&exact) = by_hash.get(target) {
        return Some(exact);
    }
    let mut matching = by_hash
        .iter()
        .filter(|(hash, _)| hash.starts_with(target))
        .map(|(_, &i)| i);
    let first = matching.next()?;
    matching.next().is_none().then_some(first)
}

/// Drop commits that are cancelled out by a later revert.
///
/// `commits` must be ordered newest first. A revert whose target is not in
/// the list (for example because it shipped in an earlier release) is kept
/// as a regular change.
#[must_use]
pub fn cancel_reverts(commits: Vec<Commit>) -> Vec<Commit> {
    let by_hash: HashMap<String, usize> = commits
        .iter()
        .enumerate()
        .map(|(i, c)| (c.hash().to_lowercase(), i))
        .collect();

    let mut by_title: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, commit) in commits.iter().enumerate() {
        let own = normalize_title(&commit.raw.title);
        let pr = commit.pr_title().map(normalize_title);
        by_title.entry(own.clone()).or_default().push(i);
        if let Some(pr) = pr.filter(|t| *t != own) {
            by_title.entry(pr).or_default().push(i);
        }
    }

    let mut removed = vec![false; commits.len()];
    for (i, commit) in commits.iter().enumerate() {
        if removed[i] {
            continue;
        }
        let Some(target) = revert_target(commit) else {
            continue;
        };

        let by_sha = target
            .hash
            .as_ref()
            .and_then(|h| resolve_hash(&by_hash, h))
            .filter(|&j| j != i && !removed[j]);
        let found = by_sha.or_else(|| {
            let candidates = by_title.get(target.title.as_ref()?)?;
            candidates.iter().copied().find(|&j| j > i && !removed[j])
        });

        if let Some(j) = found {
            debug!(
                revert = %commit.hash(),
                reverted = %commits[j].hash(),
                "Revert cancels an earlier commit"
            );
            removed[i] = true;
            removed[j] = true;
        }
    }

    commits
        .into_iter()
        .zip(removed)
        .filter_map(|(commit, removed)| (!removed).then_some(commit))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::{PrMetadata, RawCommit};

    fn commit(hash: &str, title: &str, body: &str) -> Commit {
        Commit::new(RawCommit::new(hash, title, body), None)
    }

    fn hashes(commits: &[Commit]) -> Vec<&str> {
        commits.iter().map(Commit::hash).collect()
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  feat: x (#12) "), "feat: x");
        assert_eq!(normalize_title("feat: x"), "feat: x");
    }

    #[test]
    fn test_revert_target_from_title_and_body() {
        let by_title = commit("b", r#"Revert "feat: x (#1)" (#2)"#, "");
        assert_eq!(
            revert_target(&by_title),
            Some(RevertTarget {
                hash: None,
                title: Some("feat: x".to_string()),
            })
        );

        let by_body = commit(
            "b",
            "undo the thing",
            "THIS REVERTS COMMIT ABCDEF1234567.\n\nIt broke the build.",
        );
        assert_eq!(
            revert_target(&by_body).and_then(|t| t.hash),
            Some("abcdef1234567".to_string())
        );

        assert!(revert_target(&commit("c", "feat: x", "")).is_none());
    }

    #[test]
    fn test_revert_pair_cancels_by_hash() {
        let commits = vec![
            commit("bbbbbbb", r#"Revert "feat: X""#, "This reverts commit aaaaaaa."),
            commit("aaaaaaa", "feat: X", ""),
        ];
        assert!(cancel_reverts(commits).is_empty());
    }

    #[test]
    fn test_revert_pair_cancels_by_title() {
        let commits = vec![
            commit("c2", "fix: unrelated", ""),
            commit("b2", r#"Revert "feat: X (#1)" (#2)"#, ""),
            commit("a2", "feat: X (#1)", ""),
        ];
        assert_eq!(hashes(&cancel_reverts(commits)), vec!["c2"]);
    }

    #[test]
    fn test_revert_matches_pull_request_title() {
        let commits = vec![
            commit("b3", r#"Revert "Add the endpoint""#, ""),
            Commit::new(
                RawCommit::new("a3", "feat: add endpoint (#5)", ""),
                Some(PrMetadata::pull_request(5).with_title("Add the endpoint")),
            ),
        ];
        assert!(cancel_reverts(commits).is_empty());
    }

    #[test]
    fn test_odd_chain_keeps_original() {
        // oldest -> newest: A, B = revert(A), C = revert(B)
        let commits = vec![
            commit("ccc0000", r#"Revert "Revert "feat: X"""#, "This reverts commit bbb0000."),
            commit("bbb0000", r#"Revert "feat: X""#, "This reverts commit aaa0000."),
            commit("aaa0000", "feat: X", ""),
        ];
        assert_eq!(hashes(&cancel_reverts(commits)), vec!["aaa0000"]);
    }

    #[test]
    fn test_even_chain_cancels_completely_by_title() {
        let commits = vec![
            commit("d", r#"Revert "Revert "Revert "feat: X""" (#4)"#, ""),
            commit("c", r#"Revert "Revert "feat: X"" (#3)"#, ""),
            commit("b", r#"Revert "feat: X" (#2)"#, ""),
            commit("a", "feat: X (#1)", ""),
        ];
        assert!(cancel_reverts(commits).is_empty());
    }

    #[test]
    fn test_identical_titles_disambiguated_by_hash() {
        let commits = vec![
            commit("rrrrrrr", r#"Revert "feat: X""#, "This reverts commit 1111111."),
            commit("2222222", "feat: X", ""),
            commit("1111111", "feat: X", ""),
        ];
        assert_eq!(hashes(&cancel_reverts(commits)), vec!["2222222"]);
    }

    #[test]
    fn test_abbreviated_hash_disambiguates_identical_titles() {
        let first = format!("1111111{}", "a".repeat(33));
        let second = format!("2222222{}", "b".repeat(33));
        let commits = vec![
            commit("rrrrrrr", r#"Revert "feat: X""#, "This reverts commit 1111111."),
            commit(&second, "feat: X", ""),
            commit(&first, "feat: X", ""),
        ];
        assert_eq!(hashes(&cancel_reverts(commits)), vec![second.as_str()]);
    }

    #[test]
    fn test_ambiguous_abbreviation_falls_back_to_title() {
        let commits = vec![
            commit("rrrrrrr", r#"Revert "feat: X""#, "This reverts commit abcdef0."),
            commit("abcdef01", "feat: Y", ""),
            commit("abcdef02", "feat: X", ""),
        ];
        assert_eq!(hashes(&cancel_reverts(commits)), vec!["abcdef01"]);
    }

    #[test]
    fn test_revert_of_commit_outside_window_is_kept() {
        // The reverted commit exists in history but shipped in an earlier release
        let commits = vec![
            commit("bbbbbbb", r#"Revert "feat: old thing""#, "This reverts commit 0123456."),
            commit("ccccccc", "fix: something else", ""),
        ];
        assert_eq!(hashes(&cancel_reverts(commits)), vec!["bbbbbbb", "ccccccc"]);
    }

    #[test]
    fn test_unknown_hash_falls_back_to_title() {
        let commits = vec![
            commit("bbbbbbb", r#"Revert "feat: X""#, "This reverts commit 9999999."),
            commit("aaaaaaa", "feat: X", ""),
        ];
        assert!(cancel_reverts(commits).is_empty());
    }

    #[test]
    fn test_revert_never_cancels_newer_commit_by_title() {
        let commits = vec![
            commit("b", "feat: X", ""),
            commit("a", r#"Revert "feat: X""#, ""),
        ];
        assert_eq!(hashes(&cancel_reverts(commits)), vec!["b", "a"]);
    }
}
