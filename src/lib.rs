//! coursechat: a retrieval-augmented chatbot for course materials.
//!
//! Course documents are parsed, chunked, and embedded into two vector
//! collections: a course catalog for fuzzy title resolution and a content
//! index for filtered semantic search. A tool-calling conversation loop
//! lets an LLM decide per question whether to search, and every answer
//! carries the citations of the material it drew on.

pub mod catalog;
pub mod chat;
pub mod chunk;
pub mod config;
pub mod content;
pub mod document;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod search_tool;
pub mod session;
pub mod store;
pub mod tools;
