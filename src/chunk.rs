//! Sentence-boundary text chunker with overlap and context enrichment.
//!
//! Lesson text is split into sentences by a boundary detector that
//! tolerates common abbreviations ("Mr.", "e.g.", initials), then packed
//! greedily into chunks of at most `chunk_size` characters. A sentence is
//! never split mid-way. Adjacent chunks overlap: the next chunk starts by
//! stepping back `overlap` characters from the end of the previous one,
//! rounded to a sentence boundary. Each chunk always starts at least one
//! sentence past the previous chunk's start, so chunking terminates even
//! when `overlap >= chunk_size`.
//!
//! Every stored chunk is prefixed with a context string naming its course
//! and lesson, making it self-describing for retrieval without a join.

use crate::models::CourseChunk;

/// Sentence-final abbreviations that must not end a sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr.", "mrs.", "ms.", "dr.", "prof.", "sr.", "jr.", "st.", "vs.", "etc.", "e.g.", "i.e.",
    "cf.", "al.", "inc.", "ltd.", "fig.", "no.", "vol.", "approx.",
];

/// Split text into sentences. Whitespace is normalized to single spaces
/// first, so sentence text never contains newlines.
pub fn split_sentences(text: &str) -> Vec<String> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        return Vec::new();
    }

    let mut sentences = Vec::new();
    let mut start = 0usize;
    let chars: Vec<(usize, char)> = normalized.char_indices().collect();

    for (pos, &(i, c)) in chars.iter().enumerate() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        // A boundary needs trailing whitespace; end-of-text is handled below.
        if chars.get(pos + 1).map(|&(_, ch)| ch) != Some(' ') {
            continue;
        }
        let candidate = &normalized[start..i + 1];
        if c == '.' {
            let last_word = candidate.rsplit(' ').next().unwrap_or(candidate);
            if is_abbreviation(last_word) {
                continue;
            }
        }
        let trimmed = candidate.trim();
        if !trimmed.is_empty() {
            sentences.push(trimmed.to_string());
        }
        start = i + 1;
    }

    let tail = normalized[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }

    sentences
}

fn is_abbreviation(word: &str) -> bool {
    let w: String = word
        .trim_start_matches(|c: char| matches!(c, '(' | '"' | '\'' | '['))
        .to_lowercase();
    if ABBREVIATIONS.contains(&w.as_str()) {
        return true;
    }
    // Single-letter initials ("A.") and dotted forms like "u.s." or "j.r."
    let stripped = w.trim_end_matches('.');
    stripped.chars().count() == 1 || (w.matches('.').count() > 1 && w.chars().count() <= 6)
}

/// Split text into chunk bodies of at most `chunk_size` characters, packed
/// on sentence boundaries, with `overlap` characters of content shared
/// between adjacent chunks.
///
/// A sentence longer than `chunk_size` becomes a chunk on its own rather
/// than being split. Empty text yields no chunks.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < sentences.len() {
        let mut end = start;
        let mut size = 0usize;
        while end < sentences.len() {
            // Budget is in characters, not bytes, so multi-byte text
            // fills chunks the same as ASCII.
            let add = sentences[end].chars().count() + if end > start { 1 } else { 0 };
            if size + add > chunk_size && end > start {
                break;
            }
            size += add;
            end += 1;
        }

        chunks.push(sentences[start..end].join(" "));

        if end >= sentences.len() {
            break;
        }

        // Step back `overlap` characters from the chunk end, whole
        // sentences only. The next start stays strictly past the previous
        // start so progress is guaranteed for any overlap value.
        let mut next = end;
        let mut back = 0usize;
        while next > start + 1 {
            let cand = sentences[next - 1].chars().count() + 1;
            if back + cand > overlap {
                break;
            }
            back += cand;
            next -= 1;
        }
        start = next;
    }

    chunks
}

/// Chunk one lesson's text and wrap each body with its context prefix.
pub fn chunk_lesson(
    course_title: &str,
    lesson_number: Option<u32>,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<CourseChunk> {
    chunk_text(text, chunk_size, overlap)
        .into_iter()
        .enumerate()
        .map(|(i, body)| CourseChunk {
            course_title: course_title.to_string(),
            lesson_number,
            chunk_index: i,
            text: match lesson_number {
                Some(n) => format!("Course {course_title} Lesson {n} content: {body}"),
                None => format!("Course {course_title} content: {body}"),
            },
        })
        .collect()
}
