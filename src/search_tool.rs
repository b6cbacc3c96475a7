//! The search and outline tools exposed to the LLM.
//!
//! [`SearchTool`] composes the course catalog and the content index into a
//! single `search_course_content` capability with two-stage resolution:
//! a fuzzy course name is first resolved to its exact indexed title, and
//! only then is the content index queried, filtered on that exact title.
//! This lets a user say "the MCP course" in free text while the content
//! filter stays exact, avoiding cross-course contamination. An unresolved
//! course name short-circuits the whole search; there is no unfiltered
//! fallback.
//!
//! [`OutlineTool`] answers course-structure questions: title, link, and
//! the numbered lesson list straight from the catalog metadata.

use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

use crate::catalog::CourseCatalog;
use crate::content::ContentIndex;
use crate::error::SearchError;
use crate::models::{SearchResults, Source};
use crate::tools::Tool;

pub struct SearchTool {
    catalog: Arc<CourseCatalog>,
    index: Arc<ContentIndex>,
    max_results: usize,
    last_sources: Mutex<Vec<Source>>,
}

impl SearchTool {
    pub fn new(catalog: Arc<CourseCatalog>, index: Arc<ContentIndex>, max_results: usize) -> Self {
        Self {
            catalog,
            index,
            max_results,
            last_sources: Mutex::new(Vec::new()),
        }
    }

    /// Two-stage search: resolve the course name (if given) to an exact
    /// title, then query the content index filtered on it. Hits are
    /// annotated with lesson links from the catalog.
    pub async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> Result<SearchResults, SearchError> {
        let resolved = match course_name {
            Some(name) => Some(self.catalog.resolve(name).await?),
            None => None,
        };

        let mut results = self
            .index
            .query(query, resolved.as_deref(), lesson_number, self.max_results)
            .await?;

        for hit in &mut results.hits {
            if let Some(n) = hit.lesson_number {
                hit.lesson_link = self.catalog.lesson_link(&hit.course_title, n).await?;
            }
        }

        Ok(results)
    }

    /// Render hits into `[{course} - Lesson {n}]` blocks for the LLM and
    /// record the matching citation list for the caller.
    fn format_results(&self, results: &SearchResults) -> String {
        let mut blocks = Vec::with_capacity(results.len());
        let mut sources = Vec::with_capacity(results.len());

        for hit in &results.hits {
            let label = match hit.lesson_number {
                Some(n) => format!("{} - Lesson {}", hit.course_title, n),
                None => hit.course_title.clone(),
            };
            blocks.push(format!("[{label}]\n{}", hit.text));
            sources.push(Source {
                label,
                link: hit.lesson_link.clone(),
            });
        }

        *self.last_sources.lock().unwrap() = sources;
        blocks.join("\n\n")
    }

    fn empty_message(course_name: Option<&str>, lesson_number: Option<u32>) -> String {
        let mut msg = String::from("No relevant content found");
        if let Some(name) = course_name {
            let _ = write!(msg, " in course '{name}'");
        }
        if let Some(n) = lesson_number {
            let _ = write!(msg, " in lesson {n}");
        }
        msg
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search_course_content"
    }

    fn definition(&self) -> serde_json::Value {
        serde_json::json!({
            "name": "search_course_content",
            "description": "Search course materials with smart course name matching and lesson filtering",
            "input_schema": {
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for in course content"
                    },
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    },
                    "lesson_number": {
                        "type": "integer",
                        "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                    }
                },
                "required": ["query"]
            }
        })
    }

    async fn execute(&self, args: &serde_json::Value) -> Result<String> {
        let query = args["query"].as_str().unwrap_or_default();
        let course_name = args["course_name"].as_str();
        let lesson_number = args["lesson_number"].as_u64().map(|n| n as u32);

        match self.search(query, course_name, lesson_number).await {
            Ok(results) if results.is_empty() => {
                self.reset_sources();
                Ok(Self::empty_message(course_name, lesson_number))
            }
            Ok(results) => Ok(self.format_results(&results)),
            // An unresolvable course name is relayed to the LLM as a
            // tool-result string so it can inform the user.
            Err(err @ SearchError::CourseNotFound(_)) => {
                self.reset_sources();
                Ok(err.to_string())
            }
            Err(SearchError::Backend(e)) => Err(e),
        }
    }

    fn last_sources(&self) -> Vec<Source> {
        self.last_sources.lock().unwrap().clone()
    }

    fn reset_sources(&self) {
        self.last_sources.lock().unwrap().clear();
    }
}

/// Tool answering course-structure questions from catalog metadata.
pub struct OutlineTool {
    catalog: Arc<CourseCatalog>,
}

impl OutlineTool {
    pub fn new(catalog: Arc<CourseCatalog>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for OutlineTool {
    fn name(&self) -> &str {
        "get_course_outline"
    }

    fn definition(&self) -> serde_json::Value {
        serde_json::json!({
            "name": "get_course_outline",
            "description": "Get the outline of a course: its title, link, and complete lesson list",
            "input_schema": {
                "type": "object",
                "properties": {
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work)"
                    }
                },
                "required": ["course_name"]
            }
        })
    }

    async fn execute(&self, args: &serde_json::Value) -> Result<String> {
        let name = args["course_name"].as_str().unwrap_or_default();

        let title = match self.catalog.resolve(name).await {
            Ok(title) => title,
            Err(SearchError::CourseNotFound(_)) => {
                return Ok(format!("No course found matching '{name}'"));
            }
            Err(SearchError::Backend(e)) => return Err(e),
        };

        let Some(course) = self.catalog.course(&title).await? else {
            return Ok(format!("No course found matching '{name}'"));
        };

        let mut out = format!("Course: {}", course.title);
        if let Some(link) = &course.link {
            let _ = write!(out, "\nCourse Link: {link}");
        }
        out.push_str("\nLessons:");
        for lesson in &course.lessons {
            let _ = write!(out, "\n  Lesson {}: {}", lesson.number, lesson.title);
        }
        Ok(out)
    }
}
