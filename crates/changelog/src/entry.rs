//! Changelog text supplied by pull request authors.
//!
//! A pull request body may contain a `Changelog Entry` heading. Its content
//! replaces the pull request title in the changelog:
//!
//! ```markdown
//! ### Changelog Entry
//!
//! - Add the `--json` flag
//!   - works with every subcommand
//! - Deprecate `--raw`
//! ```
//!
//! Every top-level bullet becomes its own entry and nested lines are kept as
//! a continuation of the bullet above them. A section without bullets becomes
//! a single entry.

use crate::commit::BODY_IN_CHANGELOG_MARKER;
use crate::static_regex;
use regex::Regex;
use std::sync::LazyLock;

static ENTRY_HEADING: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?im)^[ \t]*#{1,6}[ \t]+changelog entry[ \t]*#*[ \t]*$"));

static ANY_HEADING: LazyLock<Regex> = LazyLock::new(|| static_regex(r"(?m)^[ \t]*#{1,6}(?:[ \t]|$)"));

static TOP_BULLET: LazyLock<Regex> = LazyLock::new(|| static_regex(r"^[-*+][ \t]+(.*)$"));

/// One changelog entry: a line of text and optional nested lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryText {
    /// The entry text.
    pub text: String,
    /// Nested lines, dedented, rendered as an indented continuation.
    pub details: Vec<String>,
}

impl EntryText {
    /// An entry with no nested content.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            details: Vec::new(),
        }
    }
}

/// Extract the entries of a `Changelog Entry` section.
///
/// Returns `None` when the body has no such section or the section is empty.
#[must_use]
pub fn changelog_entries(body: &str) -> Option<Vec<EntryText>> {
    let body = body.replace("\r\n", "\n");
    let heading = ENTRY_HEADING.find(&body)?;
    let rest = &body[heading.end()..];
    let section = ANY_HEADING
        .find(rest)
        .map_or(rest, |next| &rest[..next.start()]);

    let entries = parse_bullets(section);
    if !entries.is_empty() {
        return Some(entries);
    }

    let paragraph = section
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if paragraph.is_empty() {
        None
    } else {
        Some(vec![EntryText::new(paragraph)])
    }
}

/// The body to render below an entry.
///
/// Only bodies carrying the `#body-in-changelog` marker are rendered; the
/// marker itself is removed.
#[must_use]
pub fn changelog_body(body: &str) -> Option<String> {
    if !body.contains(BODY_IN_CHANGELOG_MARKER) {
        return None;
    }
    let stripped = body.replace("\r\n", "\n").replace(BODY_IN_CHANGELOG_MARKER, "");
    let trimmed = stripped.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_bullets(section: &str) -> Vec<EntryText> {
    let mut entries: Vec<EntryText> = Vec::new();
    let mut nested: Vec<&str> = Vec::new();

    for line in section.lines() {
        if let Some(caps) = TOP_BULLET.captures(line) {
            if let Some(last) = entries.last_mut() {
                last.details = dedent(&nested);
            }
            nested.clear();
            let text = caps.get(1).map_or("", |m| m.as_str()).trim();
            entries.push(EntryText::new(text));
        } else if !entries.is_empty() && line.starts_with([' ', '\t']) && !line.trim().is_empty() {
            nested.push(line);
        }
    }
    if let Some(last) = entries.last_mut() {
        last.details = dedent(&nested);
    }
    entries
}

fn dedent(lines: &[&str]) -> Vec<String> {
    let indent = lines
        .iter()
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|line| line[indent..].trim_end().to_string())
        .collect()
}
