//! Conventional-commit scope extraction and grouping.

use crate::static_regex;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static SCOPE: LazyLock<Regex> = LazyLock::new(|| static_regex(r"^\w+\(([^)]+)\)!?:"));

/// Heading used for ungrouped entries next to scope headings.
pub const OTHER_SCOPE_TITLE: &str = "Other";

/// Extract the normalized scope of a `type(scope): message` title.
///
/// Scopes are lowercased and `_` is unified with `-`, so `My_Component`
/// and `my-component` land in the same group.
#[must_use]
pub fn extract_scope(title: &str) -> Option<String> {
    let scope = SCOPE.captures(title.trim())?.get(1)?.as_str().trim();
    if scope.is_empty() {
        return None;
    }
    Some(scope.to_lowercase().replace('_', "-"))
}

/// Format a normalized scope as a heading: `my-component` becomes `My Component`.
#[must_use]
pub fn format_scope_title(scope: &str) -> String {
    scope
        .split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Entries of one category after scope grouping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeGroups<T> {
    /// Scopes with at least two entries, sorted by formatted title.
    pub headed: Vec<(String, Vec<T>)>,
    /// Entries without a scope or alone in their scope, in input order.
    pub ungrouped: Vec<T>,
}

impl<T> ScopeGroups<T> {
    /// Whether the ungrouped block needs an "Other" heading.
    #[must_use]
    pub fn needs_other_heading(&self) -> bool {
        !self.headed.is_empty() && !self.ungrouped.is_empty()
    }
}

/// Group entries by scope.
///
/// Scopes holding at least two entries get their own group; everything else
/// is collected, in input order, into the ungrouped block.
#[must_use]
pub fn group_by_scope<T>(entries: Vec<(Option<String>, T)>) -> ScopeGroups<T> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for scope in entries.iter().filter_map(|(scope, _)| scope.as_ref()) {
        *counts.entry(scope.clone()).or_default() += 1;
    }

    let mut headed: BTreeMap<String, Vec<T>> = BTreeMap::new();
    let mut ungrouped = Vec::new();
    for (scope, entry) in entries {
        match scope {
            Some(scope) if counts.get(&scope).copied().unwrap_or(0) >= 2 => {
                headed.entry(format_scope_title(&scope)).or_default().push(entry);
            }
            _ => ungrouped.push(entry),
        }
    }

    ScopeGroups {
        headed: headed.into_iter().collect(),
        ungrouped,
    }
}
