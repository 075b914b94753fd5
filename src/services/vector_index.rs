//! In-process vector index, built once at startup and read-only afterwards.

use std::str::FromStr;

use crate::error::IndexError;
use crate::models::DocumentChunk;

/// Ranking mode for index queries. Only cosine ranking is supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryMode {
    #[default]
    Default,
}

impl FromStr for QueryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(QueryMode::Default),
            _ => Err(format!("unknown query mode: {}", s)),
        }
    }
}

impl std::fmt::Display for QueryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryMode::Default => write!(f, "default"),
        }
    }
}

/// A chunk and its embedding as stored in the index. `id` is the insertion
/// ordinal, opaque to callers.
#[derive(Debug, Clone)]
pub struct IndexedRecord {
    pub id: u64,
    pub chunk: DocumentChunk,
    pub vector: Vec<f32>,
}

/// A query hit: the stored chunk with an optional similarity score.
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub chunk: DocumentChunk,
    pub score: Option<f32>,
}

/// Immutable-after-build nearest-neighbor index over chunk embeddings.
///
/// Built exactly once before any request is served and injected into every
/// request's dependency set; concurrent readers are safe because nothing
/// mutates it during serving.
pub struct VectorIndex {
    collection: String,
    dimension: usize,
    records: Vec<IndexedRecord>,
}

impl VectorIndex {
    /// Bulk-load the index from (chunk, vector) pairs. Every vector must
    /// match the declared dimension.
    pub fn build(
        collection: impl Into<String>,
        dimension: usize,
        entries: Vec<(DocumentChunk, Vec<f32>)>,
    ) -> Result<Self, IndexError> {
        let mut records = Vec::with_capacity(entries.len());
        for (i, (chunk, vector)) in entries.into_iter().enumerate() {
            if vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            records.push(IndexedRecord {
                id: i as u64,
                chunk,
                vector,
            });
        }
        Ok(Self {
            collection: collection.into(),
            dimension,
            records,
        })
    }

    /// Return up to `top_k` nearest records by cosine similarity, descending.
    ///
    /// Ordering is deterministic: equal scores keep insertion order (the sort
    /// is stable over records iterated in insertion order). Asking for more
    /// records than exist returns everything, ranked, without error.
    pub fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        _mode: QueryMode,
    ) -> Result<Vec<ScoredRecord>, IndexError> {
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        let mut scored: Vec<(f32, &IndexedRecord)> = self
            .records
            .iter()
            .map(|record| (cosine_similarity(&record.vector, vector), record))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(score, record)| ScoredRecord {
                chunk: record.chunk.clone(),
                score: Some(score),
            })
            .collect())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

/// Cosine similarity between two vectors; 0.0 if either has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, DocumentMetadata};

    fn chunk(text: &str, index: u32) -> DocumentChunk {
        let doc = Document::new(
            text.to_string(),
            DocumentMetadata {
                path: "/corpus/test.txt".to_string(),
                file_name: Some("test.txt".to_string()),
            },
        );
        DocumentChunk::from_document(&doc, text.to_string(), index, 1)
    }

    fn build_index(vectors: Vec<Vec<f32>>) -> VectorIndex {
        let entries = vectors
            .into_iter()
            .enumerate()
            .map(|(i, v)| (chunk(&format!("chunk {}", i), i as u32), v))
            .collect();
        VectorIndex::build("test", 2, entries).unwrap()
    }

    #[test]
    fn test_query_orders_by_descending_similarity() {
        let index = build_index(vec![
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![0.7, 0.7],
        ]);
        let results = index.query(&[1.0, 0.0], 3, QueryMode::Default).unwrap();

        assert_eq!(results.len(), 3);
        let scores: Vec<f32> = results.iter().map(|r| r.score.unwrap()).collect();
        assert!(scores[0] >= scores[1] && scores[1] >= scores[2]);
        assert_eq!(results[0].chunk.text, "chunk 1");
    }

    #[test]
    fn test_query_ties_keep_insertion_order() {
        // Identical vectors score identically; insertion order must decide.
        let index = build_index(vec![
            vec![1.0, 0.0],
            vec![1.0, 0.0],
            vec![1.0, 0.0],
        ]);
        let results = index.query(&[1.0, 0.0], 3, QueryMode::Default).unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["chunk 0", "chunk 1", "chunk 2"]);

        let again = index.query(&[1.0, 0.0], 3, QueryMode::Default).unwrap();
        let texts_again: Vec<&str> = again.iter().map(|r| r.chunk.text.as_str()).collect();
        assert_eq!(texts, texts_again);
    }

    #[test]
    fn test_query_with_top_k_beyond_size_returns_all() {
        let index = build_index(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        let results = index.query(&[1.0, 0.0], 10, QueryMode::Default).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].score.unwrap() >= results[1].score.unwrap());
    }

    #[test]
    fn test_build_rejects_dimension_mismatch() {
        let entries = vec![(chunk("a", 0), vec![1.0, 0.0, 0.0])];
        match VectorIndex::build("test", 2, entries) {
            Err(IndexError::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, 2);
                assert_eq!(actual, 3);
            }
            other => panic!("expected DimensionMismatch, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_query_rejects_dimension_mismatch() {
        let index = build_index(vec![vec![1.0, 0.0]]);
        assert!(index.query(&[1.0], 1, QueryMode::Default).is_err());
    }

    #[test]
    fn test_empty_index_returns_no_results() {
        let index = VectorIndex::build("test", 2, Vec::new()).unwrap();
        assert!(index.is_empty());
        let results = index.query(&[1.0, 0.0], 5, QueryMode::Default).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_query_mode_parse() {
        assert_eq!("default".parse::<QueryMode>().unwrap(), QueryMode::Default);
        assert!("hybrid".parse::<QueryMode>().is_err());
    }
}
