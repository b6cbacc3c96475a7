//! Course catalog: fuzzy course-name resolution over a vector collection.
//!
//! Each course is stored once, keyed by its exact title, with the full
//! course metadata (link, instructor, lesson list) as the entry metadata.
//! [`CourseCatalog::resolve`] maps a free-text name fragment to the single
//! closest stored title. There is deliberately no confidence threshold and
//! no substring fallback: a poor match is returned rather than failing.
//! Only an empty catalog (or a backend failure) produces an error.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::error::SearchError;
use crate::models::Course;
use crate::store::{MetadataFilter, VectorStore};

pub struct CourseCatalog {
    store: Arc<dyn VectorStore>,
}

impl CourseCatalog {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    /// Insert or replace a course entry, keyed by exact title.
    pub async fn add_course(&self, course: &Course) -> Result<()> {
        let metadata = serde_json::to_value(course).context("Failed to serialize course")?;
        self.store.upsert(&course.title, &course.title, metadata).await
    }

    /// Resolve a name fragment to the single best-matching exact title.
    pub async fn resolve(&self, name_fragment: &str) -> Result<String, SearchError> {
        let hits = self
            .store
            .query(name_fragment, &MetadataFilter::none(), 1)
            .await?;

        match hits.into_iter().next() {
            Some(hit) => Ok(hit.id),
            None => Err(SearchError::CourseNotFound(name_fragment.to_string())),
        }
    }

    /// Exact titles of every stored course, in ingestion order.
    pub async fn titles(&self) -> Result<Vec<String>> {
        self.store.ids().await
    }

    pub async fn count(&self) -> Result<usize> {
        self.store.count().await
    }

    /// Full course metadata for an exact title.
    pub async fn course(&self, title: &str) -> Result<Option<Course>> {
        let Some(metadata) = self.store.get(title).await? else {
            return Ok(None);
        };
        let course =
            serde_json::from_value(metadata).context("Malformed course metadata in catalog")?;
        Ok(Some(course))
    }

    /// Link for one lesson of a course, when both are known.
    pub async fn lesson_link(&self, title: &str, lesson_number: u32) -> Result<Option<String>> {
        let Some(course) = self.course(title).await? else {
            return Ok(None);
        };
        Ok(course
            .lessons
            .into_iter()
            .find(|l| l.number == lesson_number)
            .and_then(|l| l.link))
    }

    /// Remove every course entry.
    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await
    }
}
