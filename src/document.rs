//! Course document parser.
//!
//! Course files use a fixed text layout: a metadata block, then lesson
//! sections introduced by `Lesson <n>: <title>` headers:
//!
//! ```text
//! Course Title: Intro to Rust
//! Course Link: https://example.com/rust      (optional)
//! Course Instructor: Jane Doe                (optional)
//!
//! Lesson 0: Getting Started
//! Lesson Link: https://example.com/rust/0    (optional)
//! lesson body text...
//! Lesson 1: Ownership
//! lesson body text...
//! ```
//!
//! A missing title falls back to the source file name. Undecodable bytes
//! are dropped with a warning rather than failing the whole ingestion.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::warn;

use crate::models::{Course, Lesson};

/// A lesson section with its raw body text.
#[derive(Debug, Clone)]
pub struct ParsedLesson {
    pub number: u32,
    pub title: String,
    pub link: Option<String>,
    pub body: String,
}

/// A fully parsed course document.
#[derive(Debug, Clone)]
pub struct CourseDocument {
    pub title: String,
    pub link: Option<String>,
    pub instructor: Option<String>,
    /// Text between the metadata block and the first lesson header.
    pub preamble: String,
    pub lessons: Vec<ParsedLesson>,
}

impl CourseDocument {
    /// The catalog-facing view of this document.
    pub fn course(&self) -> Course {
        Course {
            title: self.title.clone(),
            link: self.link.clone(),
            instructor: self.instructor.clone(),
            lessons: self
                .lessons
                .iter()
                .map(|l| Lesson {
                    number: l.number,
                    title: l.title.clone(),
                    link: l.link.clone(),
                })
                .collect(),
        }
    }
}

/// Read and parse a course file. Invalid UTF-8 is tolerated by dropping
/// the undecodable bytes (logged, non-fatal).
pub fn parse_course_file(path: &Path) -> Result<CourseDocument> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read course file: {}", path.display()))?;

    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            warn!(
                file = %path.display(),
                "course file contains invalid UTF-8; undecodable bytes dropped"
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };

    let fallback = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(parse_course_document(&text, &fallback))
}

/// Parse course text. `fallback_title` is used when no `Course Title:`
/// line is present.
pub fn parse_course_document(text: &str, fallback_title: &str) -> CourseDocument {
    let mut title: Option<String> = None;
    let mut link: Option<String> = None;
    let mut instructor: Option<String> = None;

    let mut lessons: Vec<ParsedLesson> = Vec::new();
    let mut preamble = String::new();
    let mut current: Option<ParsedLesson> = None;
    let mut in_header = true;

    for line in text.lines() {
        if in_header {
            let trimmed = line.trim();
            if let Some(v) = trimmed.strip_prefix("Course Title:") {
                title = Some(v.trim().to_string());
                continue;
            }
            if let Some(v) = trimmed.strip_prefix("Course Link:") {
                link = Some(v.trim().to_string());
                continue;
            }
            if let Some(v) = trimmed.strip_prefix("Course Instructor:") {
                instructor = Some(v.trim().to_string());
                continue;
            }
            if trimmed.is_empty() {
                in_header = false;
                continue;
            }
            // Anything else ends the metadata block and is parsed as body.
            in_header = false;
        }

        if let Some((number, lesson_title)) = parse_lesson_header(line) {
            if let Some(done) = current.take() {
                push_lesson(&mut lessons, done);
            }
            current = Some(ParsedLesson {
                number,
                title: lesson_title,
                link: None,
                body: String::new(),
            });
            continue;
        }

        if let Some(lesson) = current.as_mut() {
            let trimmed = line.trim();
            if lesson.body.is_empty() && lesson.link.is_none() {
                if let Some(v) = trimmed.strip_prefix("Lesson Link:") {
                    lesson.link = Some(v.trim().to_string());
                    continue;
                }
            }
            lesson.body.push_str(line);
            lesson.body.push('\n');
        } else {
            preamble.push_str(line);
            preamble.push('\n');
        }
    }

    if let Some(done) = current.take() {
        push_lesson(&mut lessons, done);
    }

    CourseDocument {
        title: title.unwrap_or_else(|| fallback_title.to_string()),
        link,
        instructor,
        preamble: preamble.trim().to_string(),
        lessons,
    }
}

/// Lesson numbers must be unique within a course; later duplicates are
/// dropped with a warning.
fn push_lesson(lessons: &mut Vec<ParsedLesson>, mut lesson: ParsedLesson) {
    if lessons.iter().any(|l| l.number == lesson.number) {
        warn!(
            number = lesson.number,
            "duplicate lesson number in course document; keeping the first occurrence"
        );
        return;
    }
    lesson.body = lesson.body.trim().to_string();
    lessons.push(lesson);
}

/// Match a `Lesson <integer>: <title>` header line.
fn parse_lesson_header(line: &str) -> Option<(u32, String)> {
    let rest = line.trim().strip_prefix("Lesson ")?;
    let colon = rest.find(':')?;
    let number: u32 = rest[..colon].trim().parse().ok()?;
    let title = rest[colon + 1..].trim().to_string();
    Some((number, title))
}
