//! Typed errors for the search and resolution path.
//!
//! Most of the crate propagates `anyhow::Result`, but course resolution
//! needs a typed distinction: a fuzzy course name that cannot be resolved
//! is a different outcome from a backend failure, and callers (the search
//! tool, ingestion) branch on it. An empty search result is neither: it
//! is returned as an empty `SearchResults`, never as an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    /// Fuzzy course-name resolution failed: the catalog is empty or
    /// returned no candidates.
    #[error("No course found matching '{0}'")]
    CourseNotFound(String),

    /// The embedding or vector backend failed.
    #[error("search backend error: {0}")]
    Backend(#[from] anyhow::Error),
}
