//! Property-based tests for changelog editing and revert cancellation.
//!
//! These tests verify:
//! - Round trip: a prepended section is found again with the same body
//! - Reversibility: removing a prepended section restores the document
//! - Parity: revert chains of even length cancel out, odd ones keep the original

use proptest::prelude::*;
use relnote_changelog::changeset::EMPTY_CHANGESET_BODY;
use relnote_changelog::commit::Commit;
use relnote_changelog::revert::cancel_reverts;
use relnote_changelog::{
    BumpType, Changeset, ChangelogGenerator, GeneratorConfig, RawCommit, ReleasePolicy,
    StaticHistory, StaticPullRequests, find_changeset, prepend_changeset, remove_changeset,
};
use std::sync::Arc;

// =============================================================================
// Strategies for generating test data
// =============================================================================

/// Versions below 9.0.0, so they never collide with the inserted section
fn existing_version_strategy() -> impl Strategy<Value = String> {
    (0u8..9, 0u8..20, 0u8..20).prop_map(|(major, minor, patch)| format!("{major}.{minor}.{patch}"))
}

fn new_version_strategy() -> impl Strategy<Value = String> {
    (0u8..20, 0u8..20).prop_map(|(minor, patch)| format!("9.{minor}.{patch}"))
}

/// Section names as users write them, optionally with a `#` or a release date
fn section_name_strategy() -> impl Strategy<Value = String> {
    (
        new_version_strategy(),
        prop_oneof![Just(""), Just("C# "), Just("v")],
        prop::option::of((1u8..13, 1u8..29)),
    )
        .prop_map(|(version, prefix, date)| match date {
            Some((month, day)) => format!("{prefix}{version} (2024-{month:02}-{day:02})"),
            None => format!("{prefix}{version}"),
        })
}

/// Bullet lines that cannot be mistaken for headings
fn body_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("- [a-z]{1,10}( [a-z]{1,10}){0,3}", 0..5).prop_map(|lines| lines.join("\n"))
}

#[derive(Debug, Clone, Copy)]
enum Style {
    Atx,
    Setext,
}

fn style_strategy() -> impl Strategy<Value = Style> {
    prop_oneof![Just(Style::Atx), Just(Style::Setext)]
}

/// A changelog document made of sections in one heading style
fn document_strategy() -> impl Strategy<Value = String> {
    (
        style_strategy(),
        any::<bool>(),
        prop::collection::vec((existing_version_strategy(), body_strategy()), 0..4),
    )
        .prop_map(|(style, preamble, sections)| {
            let mut document = String::new();
            if preamble {
                document.push_str(match style {
                    Style::Atx => "# Changelog\n\n",
                    Style::Setext => "Changelog\n=========\n\n",
                });
            }
            for (version, body) in sections {
                let heading = match style {
                    Style::Atx => format!("## {version}"),
                    Style::Setext => format!("{version}\n{}", "-".repeat(version.len())),
                };
                let body = if body.is_empty() { EMPTY_CHANGESET_BODY.to_string() } else { body };
                document.push_str(&format!("{heading}\n\n{body}\n\n"));
            }
            document
        })
}

fn revert_chain(length: usize) -> Vec<RawCommit> {
    let hash = |k: usize| format!("{k:040x}");
    (0..length)
        .rev()
        .map(|k| {
            let title = format!("{}feat: X{}", "Revert \"".repeat(k), "\"".repeat(k));
            let body = if k == 0 {
                String::new()
            } else {
                format!("This reverts commit {}.", hash(k - 1))
            };
            RawCommit::new(hash(k), title, body)
        })
        .collect()
}

// =============================================================================
// Changeset editing
// =============================================================================

proptest! {
    #[test]
    fn prop_prepend_then_find_returns_body(
        document in document_strategy(),
        name in new_version_strategy(),
        body in body_strategy(),
    ) {
        let changeset = Changeset::new(name.clone(), body.clone());
        let updated = prepend_changeset(&document, &changeset);

        let found = find_changeset(&updated, &format!("v{name}"), false);
        prop_assert!(found.is_some());
        let found = found.unwrap();
        let expected = if body.is_empty() { EMPTY_CHANGESET_BODY.to_string() } else { body };
        prop_assert_eq!(found.name, name);
        prop_assert_eq!(found.body, expected);
    }

    #[test]
    fn prop_prepend_then_remove_restores_document(
        document in document_strategy(),
        name in section_name_strategy(),
        body in body_strategy(),
    ) {
        let updated = prepend_changeset(&document, &Changeset::new(name.clone(), body));
        prop_assert_ne!(&updated, &document);
        prop_assert_eq!(remove_changeset(&updated, &name), document);
    }

    #[test]
    fn prop_existing_sections_survive_prepend(
        document in document_strategy(),
        name in new_version_strategy(),
    ) {
        let updated = prepend_changeset(&document, &Changeset::new(name, "- new"));
        for version in ["0.0.0", "1.2.3", "8.19.19"] {
            prop_assert_eq!(
                find_changeset(&updated, version, false),
                find_changeset(&document, version, false)
            );
        }
    }
}

// =============================================================================
// Revert parity
// =============================================================================

proptest! {
    #[test]
    fn prop_revert_chain_parity(length in 1usize..10) {
        let commits: Vec<Commit> = revert_chain(length)
            .into_iter()
            .map(|raw| Commit::new(raw, None))
            .collect();
        let remaining = cancel_reverts(commits);

        if length % 2 == 0 {
            prop_assert!(remaining.is_empty());
        } else {
            prop_assert_eq!(remaining.len(), 1);
            prop_assert_eq!(remaining[0].raw.title.as_str(), "feat: X");
        }
    }

    #[test]
    fn prop_revert_chain_bump(length in 1usize..8) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let generator = ChangelogGenerator::new(
            Arc::new(StaticHistory::new(revert_chain(length))),
            Arc::new(StaticPullRequests::default()),
            ReleasePolicy::conventional(),
            GeneratorConfig::new("https://github.com/acme/widgets"),
        );
        let result = runtime.block_on(generator.generate("v1.0.0", 10)).unwrap();

        let expected = if length % 2 == 0 { None } else { Some(BumpType::Minor) };
        prop_assert_eq!(result.bump_type, expected);
        prop_assert_eq!(result.total_commits, length);
    }
}
