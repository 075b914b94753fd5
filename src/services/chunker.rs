//! Sentence-aware chunking for index construction.

use crate::models::{Document, DocumentChunk};

/// Splits a document into sentence-aligned chunks bounded by a size budget.
///
/// Sentence units are packed greedily: a chunk grows until adding the next
/// sentence would exceed the budget. A single sentence larger than the budget
/// becomes its own oversized chunk rather than being truncated.
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    /// Chunk size budget in approximate tokens.
    chunk_size: usize,
}

impl SentenceChunker {
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    /// Split a document into ordered, non-overlapping chunks. A document
    /// with no extractable text yields an empty sequence, not an error.
    pub fn split(&self, document: &Document) -> Vec<DocumentChunk> {
        let sentences = split_sentences(&document.text);
        if sentences.is_empty() {
            return Vec::new();
        }

        let mut texts: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_size = 0usize;

        for sentence in sentences {
            let size = estimate_tokens(sentence);
            if !current.is_empty() && current_size + size > self.chunk_size {
                texts.push(std::mem::take(&mut current));
                current_size = 0;
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(sentence);
            current_size += size;
        }
        if !current.is_empty() {
            texts.push(current);
        }

        let total_chunks = texts.len() as u32;
        texts
            .into_iter()
            .enumerate()
            .map(|(idx, text)| {
                DocumentChunk::from_document(document, text, idx as u32, total_chunks)
            })
            .collect()
    }
}

/// Split text into sentence-like units. A unit ends at `.`, `!`, or `?`
/// followed by whitespace or end of input; trailing text without a
/// terminator forms a final unit. Units are trimmed.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut start = 0usize;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = match chars.peek() {
                Some((_, next)) => next.is_whitespace(),
                None => true,
            };
            if at_boundary {
                let end = i + c.len_utf8();
                let unit = text[start..end].trim();
                if !unit.is_empty() {
                    units.push(unit);
                }
                start = end;
            }
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        units.push(tail);
    }
    units
}

/// Estimate the number of tokens in a text.
/// Uses a simple heuristic: ~4 characters per token on average.
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}
