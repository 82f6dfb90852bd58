//! Category matching.
//!
//! A change is assigned to at most one category, in this order:
//! 1. the first regular category sharing a label with the change
//! 2. the first regular category with a title pattern matching the change
//! 3. the wildcard category
//!
//! At every step a category that excludes the change (by label or author) is
//! passed over, so the change may still land in a later category.

use crate::policy::{Category, ReleasePolicy};
use std::collections::BTreeSet;

/// Find the category of a change.
///
/// Returns the index of the category in `policy.categories` along with the
/// category itself. Global exclusion is not checked here, see
/// [`ReleasePolicy::is_globally_excluded`].
#[must_use]
pub fn match_category<'p>(
    labels: &BTreeSet<String>,
    author: Option<&str>,
    title: &str,
    policy: &'p ReleasePolicy,
) -> Option<(usize, &'p Category)> {
    let accepts = |category: &Category| !category.exclude.excludes(labels, author);

    if !labels.is_empty()
        && let Some(found) = policy
            .regular_categories()
            .find(|(_, c)| c.matches_labels(labels) && accepts(c))
    {
        return Some(found);
    }

    if let Some(found) = policy
        .regular_categories()
        .find(|(_, c)| c.matches_title(title) && accepts(c))
    {
        return Some(found);
    }

    policy.wildcard_category().filter(|(_, c)| accepts(c))
}
