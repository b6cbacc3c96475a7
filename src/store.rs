//! Vector store abstraction and in-memory implementation.
//!
//! The [`VectorStore`] trait is the seam between the retrieval logic and
//! whatever embedding database sits behind it: `upsert` text with JSON
//! metadata under a stable id, `query` by text with an ANDed metadata
//! equality filter. The course catalog and the content index each hold
//! their own collection.
//!
//! [`MemoryStore`] is the in-process implementation: brute-force cosine
//! similarity over all stored vectors, `std::sync::RwLock` for thread
//! safety, insertion order preserved so equal scores rank stably.

use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::embedding::{cosine_similarity, EmbeddingProvider};

/// Conjunction of metadata equality clauses. An empty filter matches
/// every entry.
#[derive(Debug, Clone, Default)]
pub struct MetadataFilter {
    clauses: Vec<(String, serde_json::Value)>,
}

impl MetadataFilter {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.clauses.push((key.to_string(), value.into()));
        self
    }

    pub fn matches(&self, metadata: &serde_json::Value) -> bool {
        self.clauses
            .iter()
            .all(|(key, expected)| metadata.get(key) == Some(expected))
    }
}

/// One ranked entry returned from a query.
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub id: String,
    pub text: String,
    pub metadata: serde_json::Value,
    pub score: f32,
}

/// An embedding-backed collection of text entries.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace the entry stored under `id`.
    async fn upsert(&self, id: &str, text: &str, metadata: serde_json::Value) -> Result<()>;

    /// Nearest-neighbor query restricted to entries matching `filter`,
    /// ranked by descending relevance. Returns at most `top_k` entries;
    /// an empty result is not an error.
    async fn query(
        &self,
        text: &str,
        filter: &MetadataFilter,
        top_k: usize,
    ) -> Result<Vec<ScoredEntry>>;

    /// Metadata of the entry stored under `id`, if present.
    async fn get(&self, id: &str) -> Result<Option<serde_json::Value>>;

    /// All entry ids, in insertion order.
    async fn ids(&self) -> Result<Vec<String>>;

    /// Number of stored entries.
    async fn count(&self) -> Result<usize>;

    /// Remove every entry.
    async fn clear(&self) -> Result<()>;
}

struct Entry {
    id: String,
    text: String,
    metadata: serde_json::Value,
    vector: Vec<f32>,
}

/// In-memory [`VectorStore`] over a shared [`EmbeddingProvider`].
pub struct MemoryStore {
    embedder: Arc<dyn EmbeddingProvider>,
    entries: RwLock<Vec<Entry>>,
}

impl MemoryStore {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn upsert(&self, id: &str, text: &str, metadata: serde_json::Value) -> Result<()> {
        let vector = self.embedder.embed_one(text).await?;
        let mut entries = self.entries.write().unwrap();
        let entry = Entry {
            id: id.to_string(),
            text: text.to_string(),
            metadata,
            vector,
        };
        // Replacement keeps the original position so tie-breaking stays
        // in ingestion order.
        match entries.iter_mut().find(|e| e.id == id) {
            Some(slot) => *slot = entry,
            None => entries.push(entry),
        }
        Ok(())
    }

    async fn query(
        &self,
        text: &str,
        filter: &MetadataFilter,
        top_k: usize,
    ) -> Result<Vec<ScoredEntry>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query_vec = self.embedder.embed_one(text).await?;
        let entries = self.entries.read().unwrap();

        let mut scored: Vec<ScoredEntry> = entries
            .iter()
            .filter(|e| filter.matches(&e.metadata))
            .map(|e| ScoredEntry {
                id: e.id.clone(),
                text: e.text.clone(),
                metadata: e.metadata.clone(),
                score: cosine_similarity(&query_vec, &e.vector),
            })
            .collect();

        // Stable sort: equal scores keep insertion order.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);

        Ok(scored)
    }

    async fn get(&self, id: &str) -> Result<Option<serde_json::Value>> {
        let entries = self.entries.read().unwrap();
        Ok(entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.metadata.clone()))
    }

    async fn ids(&self) -> Result<Vec<String>> {
        let entries = self.entries.read().unwrap();
        Ok(entries.iter().map(|e| e.id.clone()).collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().unwrap().len())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().unwrap().clear();
        Ok(())
    }
}
