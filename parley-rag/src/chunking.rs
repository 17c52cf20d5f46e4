//! Recursive character chunking.
//!
//! Text is split on the first separator (in preference order) that occurs in
//! it, and the resulting units are greedily packed into chunks of at most
//! `chunk_size` characters. A unit that alone exceeds `chunk_size` is split
//! again with the next separator; the final, empty separator splits into
//! single characters. When a chunk is emitted, up to `chunk_overlap`
//! characters of trailing units are carried into the next chunk.
//!
//! Lengths are counted in `char`s, so multi-byte text never splits inside a
//! code point.

use std::collections::VecDeque;

/// Separators in preference order: paragraph, line, word, character.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// A strategy for splitting document text into chunks.
pub trait Chunker: Send + Sync {
    /// Split text into ordered chunks. Returns an empty `Vec` for blank text.
    fn split(&self, text: &str) -> Vec<String>;
}

/// Splits text hierarchically: paragraphs → lines → words → characters.
///
/// # Example
///
/// ```rust,ignore
/// use parley_rag::{Chunker, RecursiveChunker};
///
/// let chunker = RecursiveChunker::new(1000, 200);
/// let chunks = chunker.split(&text);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker` with the default separators.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of characters per chunk
    /// * `chunk_overlap` — maximum number of characters shared by consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replace the separator preference list.
    pub fn with_separators<S: Into<String>>(mut self, separators: impl IntoIterator<Item = S>) -> Self {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }
}

impl Chunker for RecursiveChunker {
    fn split(&self, text: &str) -> Vec<String> {
        let separators: Vec<&str> = self.separators.iter().map(String::as_str).collect();
        split_recursive(text, self.chunk_size.max(1), self.chunk_overlap, &separators)
    }
}

/// Split `text` with the default separators.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    split_recursive(text, chunk_size.max(1), chunk_overlap, &DEFAULT_SEPARATORS)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn split_recursive(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if char_len(trimmed) <= chunk_size {
        return vec![trimmed.to_string()];
    }

    // First separator present in the text; the empty separator always matches.
    let position = separators
        .iter()
        .position(|sep| sep.is_empty() || text.contains(sep))
        .unwrap_or(separators.len().saturating_sub(1));
    let separator = separators.get(position).copied().unwrap_or("");
    let remaining = separators.get(position + 1..).unwrap_or(&[]);

    let units: Vec<&str> = if separator.is_empty() {
        text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect()
    } else {
        text.split(separator).collect()
    };

    let mut chunks = Vec::new();
    let mut pending: Vec<&str> = Vec::new();

    for unit in units {
        if char_len(unit) <= chunk_size {
            pending.push(unit);
            continue;
        }

        if !pending.is_empty() {
            chunks.extend(merge_units(&pending, separator, chunk_size, chunk_overlap));
            pending.clear();
        }
        if remaining.is_empty() {
            let oversized = unit.trim();
            if !oversized.is_empty() {
                chunks.push(oversized.to_string());
            }
        } else {
            chunks.extend(split_recursive(unit, chunk_size, chunk_overlap, remaining));
        }
    }

    if !pending.is_empty() {
        chunks.extend(merge_units(&pending, separator, chunk_size, chunk_overlap));
    }

    chunks
}

/// Greedily pack units (each at most `chunk_size`) into chunks, carrying up to
/// `chunk_overlap` characters of trailing units into the next chunk.
fn merge_units(
    units: &[&str],
    separator: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<String> {
    let separator_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut current: VecDeque<&str> = VecDeque::new();
    // Length of `current` joined with `separator`.
    let mut total = 0;

    for unit in units {
        let len = char_len(unit);
        let joiner = if current.is_empty() { 0 } else { separator_len };

        if total + joiner + len > chunk_size && !current.is_empty() {
            push_joined(&mut chunks, &current, separator);

            while let Some(first) = current.front() {
                let joiner = if current.is_empty() { 0 } else { separator_len };
                let too_long = total + joiner + len > chunk_size;
                if total <= chunk_overlap && !too_long {
                    break;
                }
                let first_len = char_len(first);
                current.pop_front();
                total -= first_len + if current.is_empty() { 0 } else { separator_len };
            }
        }

        if !current.is_empty() {
            total += separator_len;
        }
        total += len;
        current.push_back(unit);
    }

    push_joined(&mut chunks, &current, separator);
    chunks
}

fn push_joined(chunks: &mut Vec<String>, units: &VecDeque<&str>, separator: &str) {
    let joined = units.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}
