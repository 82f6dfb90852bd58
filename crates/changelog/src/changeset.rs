//! Locating and editing version sections in a changelog document.
//!
//! A changeset is one `## <version>` section of a `CHANGELOG.md`. Both ATX
//! (`## 1.2.0`) and Setext (`1.2.0` underlined with `--`) level-two headings
//! are recognized, optionally indented and optionally carrying a trailing
//! date such as `1.2.0 (2024-05-01)`.

use crate::render::escape_heading;
use crate::static_regex;
use crate::version::extract_version;
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Body written for a section that has no content.
pub const EMPTY_CHANGESET_BODY: &str = "- No documented changes.";

/// Title of the section collecting changes not yet released.
pub const UNRELEASED_TITLE: &str = "Unreleased";

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(?m)^( *)(?:## +([^\n]*?) *#*|([^\n]+)\n *-{2,}) *(?:\n+|$)")
});

static TRAILING_DATE: LazyLock<Regex> = LazyLock::new(|| static_regex(r"\s*\([^()]*\)\s*$"));

static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| static_regex(r"^(?:[-*+]|\d+[.)])(?:\s|$)"));

/// Heading title as it is compared: trailing date stripped and `#` unescaped.
fn heading_name(title: &str) -> String {
    TRAILING_DATE
        .replace(title.trim(), "")
        .trim()
        .replace("&#35;", "#")
}

/// A named section of a changelog document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changeset {
    /// Heading title without a trailing date, with `#` unescaped.
    pub name: String,
    /// Section content, trimmed.
    pub body: String,
}

impl Changeset {
    /// Create a changeset.
    #[must_use]
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }
}

#[derive(Debug)]
struct Heading {
    start: usize,
    content_start: usize,
    name: String,
    indent: String,
    setext: bool,
}

impl Heading {
    fn from_captures(caps: &Captures<'_>) -> Option<Self> {
        let whole = caps.get(0)?;
        let (title, setext) = match (caps.get(2), caps.get(3)) {
            (Some(atx), _) => (atx.as_str(), false),
            // a list item above a thematic break is not a heading
            (None, Some(setext)) if LIST_MARKER.is_match(setext.as_str().trim_start()) => {
                return None;
            }
            (None, Some(setext)) => (setext.as_str(), true),
            (None, None) => return None,
        };
        Some(Self {
            start: whole.start(),
            content_start: whole.end(),
            name: heading_name(title),
            indent: caps.get(1).map_or("", |m| m.as_str()).to_string(),
            setext,
        })
    }
}

fn headings(document: &str) -> Vec<Heading> {
    HEADING
        .captures_iter(document)
        .filter_map(|caps| Heading::from_captures(&caps))
        .collect()
}

/// First heading accepted by `predicate` and the offset where its section ends.
fn locate<F>(document: &str, mut predicate: F) -> Option<(Heading, usize)>
where
    F: FnMut(&Heading) -> bool,
{
    let mut found = headings(document).into_iter();
    let heading = found.find(|h| predicate(h))?;
    let end = found.next().map_or(document.len(), |next| next.start);
    Some((heading, end))
}

fn section(document: &str, heading: &Heading, end: usize) -> Changeset {
    let body = document
        .get(heading.content_start..end)
        .unwrap_or_default()
        .trim();
    Changeset::new(heading.name.clone(), body)
}

/// Find the section whose heading carries the version of `tag`.
///
/// `tag` may be prefixed, for example `v1.2.3` or `release/1.2.3`. Returns
/// `None` when the tag has no semantic version or no heading matches. With
/// `fallback_to_unreleased`, a heading titled `Unreleased` is returned when
/// no version heading matches.
#[must_use]
pub fn find_changeset(document: &str, tag: &str, fallback_to_unreleased: bool) -> Option<Changeset> {
    let version = extract_version(tag)?;
    if let Some((heading, end)) = locate(document, |h| {
        extract_version(&h.name).is_some_and(|v| v == version)
    }) {
        return Some(section(document, &heading, end));
    }

    if fallback_to_unreleased {
        return locate(document, |h| h.name == UNRELEASED_TITLE)
            .map(|(heading, end)| section(document, &heading, end));
    }
    None
}

/// Remove the section titled `header`, including its content.
///
/// `header` is compared the way headings are read, so a trailing date or a
/// `#` written by [`prepend_changeset`] still matches. Everything outside the
/// section is left untouched. An empty or unknown header returns the document
/// unchanged.
#[must_use]
pub fn remove_changeset(document: &str, header: &str) -> String {
    let header = heading_name(header);
    if header.is_empty() {
        return document.to_string();
    }

    match locate(document, |h| h.name == header) {
        Some((heading, end)) => {
            let mut output = String::with_capacity(document.len());
            output.push_str(&document[..heading.start]);
            output.push_str(&document[end..]);
            output
        }
        None => document.to_string(),
    }
}

/// Insert `changeset` before the first section of the document.
///
/// The new heading copies the style and indentation of the first existing
/// heading. Documents without headings get the section appended as an ATX
/// heading.
#[must_use]
pub fn prepend_changeset(document: &str, changeset: &Changeset) -> String {
    let first = headings(document).into_iter().next();
    let (indent, setext) = first
        .as_ref()
        .map_or(("", false), |h| (h.indent.as_str(), h.setext));

    let title = escape_heading(changeset.name.trim());
    let heading = if setext {
        format!("{indent}{title}\n{indent}{}", "-".repeat(title.chars().count().max(2)))
    } else {
        format!("{indent}## {title}")
    };

    let body = match changeset.body.trim() {
        "" => EMPTY_CHANGESET_BODY,
        body => body,
    };
    let body = body
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{indent}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    let new_section = format!("{heading}\n\n{body}\n\n");
    let at = first.as_ref().map_or(document.len(), |h| h.start);

    let mut output = String::with_capacity(document.len() + new_section.len() + 1);
    output.push_str(&document[..at]);
    if first.is_none() && !document.is_empty() && !document.ends_with('\n') {
        output.push('\n');
    }
    output.push_str(&new_section);
    output.push_str(&document[at..]);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATX: &str = "# Changelog\n\n## Unreleased\n\n- pending\n\n## 1.1.0 (2024-02-01)\n\n- second\n- more\n\n## v1.0.0 ##\n\nfirst\n";

    const SETEXT: &str = "Changelog\n=========\n\n1.1.0\n-----\n\n- second\n\n1.0.0\n-----\n\n- first\n";

    #[test]
    fn test_find_atx() {
        let found = find_changeset(ATX, "v1.1.0", false).unwrap();
        assert_eq!(found, Changeset::new("1.1.0", "- second\n- more"));

        let found = find_changeset(ATX, "release/1.0.0", false).unwrap();
        assert_eq!(found, Changeset::new("v1.0.0", "first"));
    }

    #[test]
    fn test_find_setext() {
        let found = find_changeset(SETEXT, "1.1.0", false).unwrap();
        assert_eq!(found, Changeset::new("1.1.0", "- second"));
        let found = find_changeset(SETEXT, "1.0.0", false).unwrap();
        assert_eq!(found.body, "- first");
    }

    #[test]
    fn test_find_misses() {
        assert!(find_changeset(ATX, "2.0.0", false).is_none());
        assert!(find_changeset(ATX, "latest", true).is_none());
        assert!(find_changeset("", "1.0.0", true).is_none());
    }

    #[test]
    fn test_find_falls_back_to_unreleased() {
        let found = find_changeset(ATX, "2.0.0", true).unwrap();
        assert_eq!(found, Changeset::new("Unreleased", "- pending"));
    }

    #[test]
    fn test_find_does_not_confuse_similar_versions() {
        let doc = "## 1.0.10\n\nten\n\n## 1.0.1\n\none\n";
        assert_eq!(find_changeset(doc, "1.0.1", false).unwrap().body, "one");
    }

    #[test]
    fn test_remove_section() {
        let removed = remove_changeset(ATX, "1.1.0");
        assert_eq!(
            removed,
            "# Changelog\n\n## Unreleased\n\n- pending\n\n## v1.0.0 ##\n\nfirst\n"
        );

        let removed = remove_changeset(ATX, "v1.0.0");
        assert_eq!(
            removed,
            "# Changelog\n\n## Unreleased\n\n- pending\n\n## 1.1.0 (2024-02-01)\n\n- second\n- more\n\n"
        );
    }

    #[test]
    fn test_remove_noop() {
        assert_eq!(remove_changeset(ATX, ""), ATX);
        assert_eq!(remove_changeset(ATX, "9.9.9"), ATX);
    }

    #[test]
    fn test_prepend_atx() {
        let doc = "# Changelog\n\n## 1.0.0\n\n- first\n";
        let output = prepend_changeset(doc, &Changeset::new("1.1.0", "- second"));
        assert_eq!(output, "# Changelog\n\n## 1.1.0\n\n- second\n\n## 1.0.0\n\n- first\n");
    }

    #[test]
    fn test_prepend_setext_and_indent() {
        let output = prepend_changeset(SETEXT, &Changeset::new("1.2.0", "- third"));
        assert!(output.starts_with("Changelog\n=========\n\n1.2.0\n-----\n\n- third\n\n1.1.0\n-----"));

        let indented = "  ## 1.0.0\n\n  - first\n";
        let output = prepend_changeset(indented, &Changeset::new("1.1.0", "- a\n- b"));
        assert_eq!(output, "  ## 1.1.0\n\n  - a\n  - b\n\n  ## 1.0.0\n\n  - first\n");
    }

    #[test]
    fn test_prepend_without_headings_appends() {
        let output = prepend_changeset("# Changelog", &Changeset::new("1.0.0", ""));
        assert_eq!(output, "# Changelog\n## 1.0.0\n\n- No documented changes.\n\n");
        assert_eq!(
            find_changeset(&output, "1.0.0", false).unwrap().body,
            EMPTY_CHANGESET_BODY
        );
    }

    #[test]
    fn test_prepend_escapes_hash() {
        let output = prepend_changeset("", &Changeset::new("C# 1.0.0", "x"));
        assert_eq!(output, "## C&#35; 1.0.0\n\nx\n\n");
    }

    #[test]
    fn test_remove_decorated_names() {
        let doc = "# Changelog\n\n## 1.0.0\n\n- first\n";
        for name in ["1.1.0 (2024-05-01)", "C# 1.1.0"] {
            let prepended = prepend_changeset(doc, &Changeset::new(name, "- second"));
            assert_eq!(remove_changeset(&prepended, name), doc);
        }
        assert_eq!(remove_changeset(ATX, "1.1.0 (2024-02-01)"), remove_changeset(ATX, "1.1.0"));
    }

    #[test]
    fn test_escaped_heading_is_read_unescaped() {
        let output = prepend_changeset("", &Changeset::new("C# 1.0.0", "x"));
        assert_eq!(find_changeset(&output, "1.0.0", false).unwrap().name, "C# 1.0.0");
    }

    #[test]
    fn test_thematic_break_after_list_is_not_a_heading() {
        let doc = "## 1.1.0\n\n- second\n---\n\n1. numbered\n--\n\n## 1.0.0\n\n- first\n";
        let found = find_changeset(doc, "1.1.0", false).unwrap();
        assert_eq!(found.body, "- second\n---\n\n1. numbered\n--");
        assert_eq!(remove_changeset(doc, "1.1.0"), "## 1.0.0\n\n- first\n");
    }

    #[test]
    fn test_prepend_then_remove_restores_document() {
        let changeset = Changeset::new("2.0.0", "- breaking");
        for doc in [ATX, SETEXT] {
            let prepended = prepend_changeset(doc, &changeset);
            assert_eq!(find_changeset(&prepended, "2.0.0", false).unwrap().body, "- breaking");
            assert_eq!(remove_changeset(&prepended, "2.0.0"), doc);
        }
    }
}
