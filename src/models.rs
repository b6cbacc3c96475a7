//! Core data models used throughout coursechat.
//!
//! These types represent the courses, lessons, and chunks that flow through
//! the ingestion pipeline, plus the search results and chat responses
//! produced at query time.

use serde::{Deserialize, Serialize};

/// A course parsed from a source document. The title is the canonical
/// identity: both vector collections key on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub title: String,
    pub link: Option<String>,
    pub instructor: Option<String>,
    pub lessons: Vec<Lesson>,
}

/// A single lesson within a course. Numbers are unique within a course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub number: u32,
    pub title: String,
    pub link: Option<String>,
}

/// A context-enriched slice of lesson text, the unit of semantic retrieval.
///
/// `text` carries the full enriched form (context prefix + chunk body) so
/// each chunk is self-describing without a join back to its course.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseChunk {
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub chunk_index: usize,
    pub text: String,
}

/// One hit from a content search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub text: String,
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub lesson_link: Option<String>,
    pub score: f32,
}

/// Ordered results of a content search. May be empty; an empty result is
/// a valid outcome, not an error.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }
}

/// A rendered citation for display, e.g. `"Intro to Rust - Lesson 1"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    pub label: String,
    pub link: Option<String>,
}

/// The outcome of one conversation turn.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<Source>,
    pub session_id: String,
}
