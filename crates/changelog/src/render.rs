//! Markdown rendering of a classified changelog.
//!
//! Output layout:
//!
//! ```markdown
//! ### New Features ✨
//!
//! #### Api
//!
//! - feat(api): add endpoint by @octocat in [#12](https://github.com/o/r/pull/12)
//! - feat(api): add filter by @octocat in [#14](https://github.com/o/r/pull/14)
//!
//! #### Other
//!
//! - feat: faster startup in [0123abcd](https://github.com/o/r/commit/0123abcd...)
//!
//! ### Other
//!
//! - unrelated change in [#15](https://github.com/o/r/pull/15)
//! ```

use crate::entry::EntryText;
use crate::scope::{OTHER_SCOPE_TITLE, group_by_scope};
use crate::static_regex;
use regex::Regex;
use std::fmt::Write;
use std::sync::LazyLock;

/// Heading of the uncategorized block.
pub const LEFTOVERS_TITLE: &str = "Other";

const SHORT_HASH_LEN: usize = 8;

static LEADING_UNDERSCORE: LazyLock<Regex> = LazyLock::new(|| static_regex(r"(^|\s)_"));

static TRAILING_PR: LazyLock<Regex> = LazyLock::new(|| static_regex(r"\s*\(#(\d+)\)\s*$"));

/// Escape `#` in a heading title so it cannot close or nest the heading.
#[must_use]
pub fn escape_heading(title: &str) -> String {
    title.replace('#', "&#35;")
}

/// Escape underscores that start a word, which Markdown would read as emphasis.
#[must_use]
pub fn escape_leading_underscore(text: &str) -> String {
    LEADING_UNDERSCORE.replace_all(text, r"${1}\_").into_owned()
}

fn heading(level: usize, title: &str) -> String {
    format!("{} {}", "#".repeat(level), escape_heading(title))
}

fn strip_pr_suffix(text: &str, pr_number: Option<u64>) -> &str {
    let Some(pr) = pr_number else {
        return text;
    };
    match TRAILING_PR.captures(text) {
        Some(caps) if caps[1].parse::<u64>().ok() == Some(pr) => {
            caps.get(0).map_or(text, |m| &text[..m.start()])
        }
        _ => text,
    }
}

fn indent(line: &str) -> String {
    if line.is_empty() {
        String::new()
    } else {
        format!("  {line}")
    }
}

fn blockquote(line: &str) -> String {
    if line.is_empty() {
        ">".to_string()
    } else {
        format!("> {line}")
    }
}

/// One commit or pull request as it appears in the changelog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeItem {
    /// Commit hash, used for the link when there is no pull request.
    pub hash: String,
    /// Pull request number.
    pub pr_number: Option<u64>,
    /// Pull request author login.
    pub author: Option<String>,
    /// Lines to render; a pull request may contribute several.
    pub entries: Vec<EntryText>,
    /// Body appended below the entries.
    pub body: Option<String>,
    /// Render as a blockquote.
    pub highlight: bool,
}

impl ChangeItem {
    /// An item rendered with a commit link.
    #[must_use]
    pub fn new(hash: impl Into<String>, entries: Vec<EntryText>) -> Self {
        Self {
            hash: hash.into(),
            pr_number: None,
            author: None,
            entries,
            body: None,
            highlight: false,
        }
    }

    /// Link the item to a pull request.
    #[must_use]
    pub fn with_pull_request(mut self, number: u64, author: Option<String>) -> Self {
        self.pr_number = Some(number);
        self.author = author.filter(|a| !a.trim().is_empty());
        self
    }

    /// Append a body below the entries.
    #[must_use]
    pub fn with_body(mut self, body: Option<String>) -> Self {
        self.body = body;
        self
    }

    /// Set highlight mode.
    #[must_use]
    pub const fn highlighted(mut self, highlight: bool) -> Self {
        self.highlight = highlight;
        self
    }
}

/// The items of one category, each with its scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySection {
    /// Category title.
    pub title: String,
    /// Index in the policy; sections without one go last.
    pub position: Option<usize>,
    /// Items with their normalized scope.
    pub items: Vec<(Option<String>, ChangeItem)>,
}

/// Everything a changelog is rendered from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangelogDocument {
    /// Category sections in any order.
    pub sections: Vec<CategorySection>,
    /// Items that belong to no category, newest first.
    pub leftovers: Vec<ChangeItem>,
}

impl ChangelogDocument {
    /// Whether nothing would be rendered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leftovers.is_empty() && self.sections.iter().all(|s| s.items.is_empty())
    }
}

/// Renders a [`ChangelogDocument`] to Markdown.
#[derive(Debug, Clone)]
pub struct MarkdownRenderer<'a> {
    repo_url: &'a str,
    max_leftovers: usize,
}

impl<'a> MarkdownRenderer<'a> {
    /// Create a renderer linking into `repo_url`.
    #[must_use]
    pub fn new(repo_url: &'a str, max_leftovers: usize) -> Self {
        Self {
            repo_url: repo_url.trim_end_matches('/'),
            max_leftovers,
        }
    }

    /// Render the document. An empty document renders as `""`.
    #[must_use]
    pub fn render(&self, document: ChangelogDocument) -> String {
        let mut sections = document.sections;
        sections.retain(|s| !s.items.is_empty());
        sections.sort_by_key(|s| s.position.unwrap_or(usize::MAX));

        let mut blocks: Vec<String> = sections
            .into_iter()
            .map(|section| self.render_category(section))
            .collect();

        if !document.leftovers.is_empty() {
            let leftovers = self.render_leftovers(&document.leftovers);
            if blocks.is_empty() {
                blocks.push(leftovers);
            } else {
                blocks.push(format!("{}\n\n{leftovers}", heading(3, LEFTOVERS_TITLE)));
            }
        }

        blocks.join("\n\n")
    }

    fn render_category(&self, section: CategorySection) -> String {
        let mut output = String::new();
        let _ = write!(output, "{}\n\n", heading(3, &section.title));

        let groups = group_by_scope(section.items);
        let needs_other = groups.needs_other_heading();
        let mut blocks = Vec::new();
        for (scope, items) in &groups.headed {
            blocks.push(format!("{}\n\n{}", heading(4, scope), self.render_items(items)));
        }
        if needs_other {
            blocks.push(format!(
                "{}\n\n{}",
                heading(4, OTHER_SCOPE_TITLE),
                self.render_items(&groups.ungrouped)
            ));
        } else if !groups.ungrouped.is_empty() {
            blocks.push(self.render_items(&groups.ungrouped));
        }

        output.push_str(&blocks.join("\n\n"));
        output
    }

    fn render_leftovers(&self, items: &[ChangeItem]) -> String {
        let shown = items.len().min(self.max_leftovers);
        let rest = items.len() - shown;
        let list = self.render_items(&items[..shown]);
        match (list.is_empty(), rest) {
            (_, 0) => list,
            (true, _) => format!("_Plus {rest} more_"),
            (false, _) => format!("{list}\n\n_Plus {rest} more_"),
        }
    }

    fn render_items(&self, items: &[ChangeItem]) -> String {
        items
            .iter()
            .map(|item| self.format_item(item))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn format_item(&self, item: &ChangeItem) -> String {
        let suffix = match item.pr_number {
            Some(pr) => {
                let by = item
                    .author
                    .as_deref()
                    .map(|author| format!(" by @{author}"))
                    .unwrap_or_default();
                format!("{by} in [#{pr}]({}/pull/{pr})", self.repo_url)
            }
            None => {
                let short: String = item.hash.chars().take(SHORT_HASH_LEN).collect();
                format!(" in [{short}]({}/commit/{})", self.repo_url, item.hash)
            }
        };

        let mut lines = Vec::new();
        for entry in &item.entries {
            let text = escape_leading_underscore(strip_pr_suffix(entry.text.trim(), item.pr_number));
            lines.push(format!("- {text}{suffix}"));
            lines.extend(entry.details.iter().map(|line| indent(line)));
        }
        if let Some(body) = &item.body {
            lines.extend(body.lines().map(|line| indent(line.trim_end())));
        }

        if item.highlight {
            lines = lines.iter().map(|line| blockquote(line)).collect();
        }
        lines.join("\n")
    }
}
