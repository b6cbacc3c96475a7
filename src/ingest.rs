//! Ingestion pipeline: course documents on disk to catalog and index.
//!
//! Walks the docs directory for `.txt` and `.md` files, parses each into a
//! course, and indexes its chunked lessons. A course whose exact title is
//! already in the catalog is skipped, so re-running ingestion after adding
//! one file only processes the new file. A file that fails to parse or
//! read is logged and skipped; it never aborts the run.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::catalog::CourseCatalog;
use crate::chunk::chunk_lesson;
use crate::config::Config;
use crate::content::ContentIndex;
use crate::document::parse_course_file;

/// What an ingestion run did.
#[derive(Debug, Default, Clone, Copy)]
pub struct IngestStats {
    pub courses_added: usize,
    pub courses_skipped: usize,
    pub chunks_indexed: usize,
}

pub struct Ingestor {
    catalog: Arc<CourseCatalog>,
    index: Arc<ContentIndex>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Ingestor {
    pub fn new(catalog: Arc<CourseCatalog>, index: Arc<ContentIndex>, config: &Config) -> Self {
        Self {
            catalog,
            index,
            chunk_size: config.chunking.chunk_size,
            chunk_overlap: config.chunking.chunk_overlap,
        }
    }

    /// Ingest every course document under `docs_dir`. With `clear` set,
    /// both collections are emptied first so everything is re-indexed.
    pub async fn ingest_dir(&self, docs_dir: &Path, clear: bool) -> Result<IngestStats> {
        if clear {
            info!("clearing existing catalog and content index");
            self.catalog.clear().await?;
            self.index.clear().await?;
        }

        if !docs_dir.is_dir() {
            anyhow::bail!("docs directory not found: {}", docs_dir.display());
        }

        let existing = self.catalog.titles().await?;
        let mut stats = IngestStats::default();

        let mut files: Vec<_> = WalkDir::new(docs_dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.file_type().is_file()
                    && matches!(
                        entry.path().extension().and_then(|e| e.to_str()),
                        Some("txt") | Some("md")
                    )
            })
            .map(|entry| entry.into_path())
            .collect();
        files.sort();

        for path in files {
            match self.ingest_file(&path, &existing).await {
                Ok(Some(chunks)) => {
                    stats.courses_added += 1;
                    stats.chunks_indexed += chunks;
                }
                Ok(None) => stats.courses_skipped += 1,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping course file");
                }
            }
        }

        info!(
            added = stats.courses_added,
            skipped = stats.courses_skipped,
            chunks = stats.chunks_indexed,
            "ingestion complete"
        );
        Ok(stats)
    }

    /// Ingest one file. Returns the number of chunks indexed, or `None`
    /// when the course title is already present.
    async fn ingest_file(&self, path: &Path, existing: &[String]) -> Result<Option<usize>> {
        let doc = parse_course_file(path)?;

        if existing.iter().any(|t| t == &doc.title) {
            info!(course = %doc.title, "already ingested, skipping");
            return Ok(None);
        }

        let course = doc.course();
        self.catalog
            .add_course(&course)
            .await
            .with_context(|| format!("Failed to catalog course '{}'", course.title))?;

        let mut chunks = Vec::new();
        if !doc.preamble.trim().is_empty() {
            chunks.extend(chunk_lesson(
                &doc.title,
                None,
                &doc.preamble,
                self.chunk_size,
                self.chunk_overlap,
            ));
        }
        for lesson in &doc.lessons {
            chunks.extend(chunk_lesson(
                &doc.title,
                Some(lesson.number),
                &lesson.body,
                self.chunk_size,
                self.chunk_overlap,
            ));
        }

        let indexed = self.index.add_chunks(&chunks).await?;
        info!(course = %course.title, chunks = indexed, "ingested course");
        Ok(Some(indexed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashedEmbedder;
    use crate::store::MemoryStore;
    use std::io::Write as _;

    const DOC: &str = "\
Course Title: Test Course
Course Link: https://example.com/course
Course Instructor: Kim

Lesson 0: Getting Started
Lesson Link: https://example.com/l0
Welcome to the course. This lesson covers setup and goals.

Lesson 1: Core Concepts
The main ideas are explained here with several worked examples.
";

    fn fixtures() -> (Arc<CourseCatalog>, Arc<ContentIndex>, Config) {
        let embedder = Arc::new(HashedEmbedder::new(256));
        let catalog = Arc::new(CourseCatalog::new(Arc::new(MemoryStore::new(
            embedder.clone(),
        ))));
        let index = Arc::new(ContentIndex::new(Arc::new(MemoryStore::new(embedder))));
        (catalog, index, Config::minimal())
    }

    fn write_doc(dir: &Path, name: &str, body: &str) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(body.as_bytes()).unwrap();
    }

    #[tokio::test]
    async fn ingests_courses_and_chunks() {
        let dir = tempfile::tempdir().unwrap();
        write_doc(dir.path(), "course1.txt", DOC);

        let (catalog, index, config) = fixtures();
        let ingestor = Ingestor::new(catalog.clone(), index.clone(), &config);

        let stats = ingestor.ingest_dir(dir.path(), false).await.unwrap();
        assert_eq!(stats.courses_added, 1);
        assert!(stats.chunks_indexed > 0);
        assert_eq!(catalog.titles().await.unwrap(), vec!["Test Course"]);
        assert_eq!(index.count().await.unwrap(), stats.chunks_indexed);
    }

    #[tokio::test]
    async fn rerun_skips_existing_titles() {
        let dir = tempfile::tempdir().unwrap();
        write_doc(dir.path(), "course1.txt", DOC);

        let (catalog, index, config) = fixtures();
        let ingestor = Ingestor::new(catalog, index.clone(), &config);

        let first = ingestor.ingest_dir(dir.path(), false).await.unwrap();
        let second = ingestor.ingest_dir(dir.path(), false).await.unwrap();
        assert_eq!(second.courses_added, 0);
        assert_eq!(second.courses_skipped, 1);
        assert_eq!(index.count().await.unwrap(), first.chunks_indexed);
    }

    #[tokio::test]
    async fn clear_reindexes_everything() {
        let dir = tempfile::tempdir().unwrap();
        write_doc(dir.path(), "course1.txt", DOC);

        let (catalog, index, config) = fixtures();
        let ingestor = Ingestor::new(catalog.clone(), index, &config);

        ingestor.ingest_dir(dir.path(), false).await.unwrap();
        let stats = ingestor.ingest_dir(dir.path(), true).await.unwrap();
        assert_eq!(stats.courses_added, 1);
        assert_eq!(catalog.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn non_course_extensions_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write_doc(dir.path(), "course1.txt", DOC);
        write_doc(dir.path(), "notes.pdf", "binary-ish");
        write_doc(dir.path(), "data.json", "{}");

        let (catalog, index, config) = fixtures();
        let ingestor = Ingestor::new(catalog, index, &config);

        let stats = ingestor.ingest_dir(dir.path(), false).await.unwrap();
        assert_eq!(stats.courses_added, 1);
    }

    #[tokio::test]
    async fn missing_docs_dir_is_an_error() {
        let (catalog, index, config) = fixtures();
        let ingestor = Ingestor::new(catalog, index, &config);
        assert!(ingestor
            .ingest_dir(Path::new("/nonexistent/docs"), false)
            .await
            .is_err());
    }
}
