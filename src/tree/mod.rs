//! Title-based view of a tenant's page tree.
//!
//! The [`TreeResolver`] maps titles and title paths (`Parent/Child`) onto page
//! ids below an endpoint's root page, and builds breadcrumbs and
//! depth-limited subtree listings. Nothing is cached: each call walks the
//! upstream graph again.

pub mod resolver;

pub use resolver::TreeResolver;

use crate::confluence::PageRef;
use crate::error::{ConflagentError, ConflagentResult};
use serde::{Deserialize, Serialize};

/// Upper bound on parent hops when checking that a page sits under the root.
pub const MAX_ANCESTRY_DEPTH: usize = 64;

/// A page in a tree listing.
///
/// `path` runs from the root (exclusive) to this page (inclusive), so the root
/// itself has an empty path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: String,
    pub title: String,
    pub path: Vec<String>,
    pub children: Vec<TreeNode>,
}

/// A direct child together with its path from the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildEntry {
    pub id: String,
    pub title: String,
    pub path: Vec<String>,
}

/// Parent link and breadcrumb of a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    /// `None` only for the root page
    pub parent: Option<PageRef>,
    pub path: Vec<String>,
}

/// Body of a resolved page in storage format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    pub id: String,
    pub title: String,
    pub body: String,
}

/// Split a title reference into its path segments.
///
/// Leading and trailing slashes are ignored. An empty reference or an empty
/// segment (`A//B`) is invalid input.
pub fn split_title_path(reference: &str) -> ConflagentResult<Vec<&str>> {
    let trimmed = reference.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Err(ConflagentError::invalid_input("Title must not be empty"));
    }
    let segments: Vec<&str> = trimmed.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(ConflagentError::invalid_input(format!(
            "Title path '{}' contains an empty segment",
            reference
        )));
    }
    Ok(segments)
}
