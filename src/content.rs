//! Content index: semantic retrieval over enriched course chunks.
//!
//! Chunks are stored with `(course_title, lesson_number, chunk_index)`
//! metadata so queries can be restricted to an exact course title and/or a
//! lesson number. Filters are ANDed when both are present. A query that
//! matches nothing returns an empty [`SearchResults`], never an error.

use anyhow::Result;
use std::sync::Arc;

use crate::models::{CourseChunk, SearchHit, SearchResults};
use crate::store::{MetadataFilter, VectorStore};

pub struct ContentIndex {
    store: Arc<dyn VectorStore>,
}

impl ContentIndex {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    /// Index a batch of chunks. Chunk identity is
    /// `(course title, lesson number, sequence index)`.
    pub async fn add_chunks(&self, chunks: &[CourseChunk]) -> Result<usize> {
        for chunk in chunks {
            let lesson_part = chunk
                .lesson_number
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string());
            let id = format!("{}::{}::{}", chunk.course_title, lesson_part, chunk.chunk_index);

            let metadata = serde_json::json!({
                "course_title": chunk.course_title,
                "lesson_number": chunk.lesson_number,
                "chunk_index": chunk.chunk_index,
            });

            self.store.upsert(&id, &chunk.text, metadata).await?;
        }
        Ok(chunks.len())
    }

    /// Semantic query, optionally restricted to an exact course title
    /// and/or a lesson number.
    pub async fn query(
        &self,
        query_text: &str,
        course_title: Option<&str>,
        lesson_number: Option<u32>,
        max_results: usize,
    ) -> Result<SearchResults> {
        let mut filter = MetadataFilter::none();
        if let Some(title) = course_title {
            filter = filter.with("course_title", title);
        }
        if let Some(n) = lesson_number {
            filter = filter.with("lesson_number", n);
        }

        let entries = self.store.query(query_text, &filter, max_results).await?;

        let hits = entries
            .into_iter()
            .map(|e| SearchHit {
                text: e.text,
                course_title: e.metadata["course_title"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string(),
                lesson_number: e.metadata["lesson_number"].as_u64().map(|n| n as u32),
                lesson_link: None,
                score: e.score,
            })
            .collect();

        Ok(SearchResults { hits })
    }

    pub async fn count(&self) -> Result<usize> {
        self.store.count().await
    }

    /// Remove every indexed chunk.
    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await
    }
}
