//! Query-to-chunks retrieval over the shared embedding provider and index.

use std::sync::Arc;

use crate::error::{PipelineError, RetrievalError};
use crate::models::{DocumentChunk, RetrievalConfig};
use crate::services::embedding::EmbeddingProvider;
use crate::services::vector_index::{QueryMode, VectorIndex};

/// A retrieval request: the query text and how many chunks to return.
#[derive(Debug, Clone)]
pub struct RetrieveRequest {
    pub query: String,
    pub top_k: usize,
}

/// Ranked retrieval output, at most `top_k` chunks in descending similarity.
#[derive(Debug, Clone)]
pub struct RetrieveResponse {
    pub chunks: Vec<RetrievedChunk>,
}

/// A retrieved chunk paired with its similarity score. The score is `None`
/// when the index cannot supply one; ranking order still holds.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub chunk: DocumentChunk,
    pub score: Option<f32>,
}

/// Maps a query to ranked relevant chunks.
pub trait Retriever: Send + Sync {
    fn retrieve(&self, request: &RetrieveRequest) -> Result<RetrieveResponse, RetrievalError>;
}

/// Retriever backed by the shared embedding provider and the vector index.
///
/// The provider must be the same instance used at index-build time; the
/// index's ranking order is passed through untouched.
pub struct VectorRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
    mode: QueryMode,
    min_score: Option<f32>,
}

impl VectorRetriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<VectorIndex>,
        mode: QueryMode,
        min_score: Option<f32>,
    ) -> Self {
        Self {
            embedder,
            index,
            mode,
            min_score,
        }
    }
}

impl Retriever for VectorRetriever {
    fn retrieve(&self, request: &RetrieveRequest) -> Result<RetrieveResponse, RetrievalError> {
        let query_embedding = self.embedder.embed_query(&request.query)?;
        let hits = self
            .index
            .query(&query_embedding, request.top_k, self.mode)?;

        // Keep the index's order; no client-side re-sort.
        let mut chunks: Vec<RetrievedChunk> = hits
            .into_iter()
            .map(|hit| RetrievedChunk {
                chunk: hit.chunk,
                score: hit.score,
            })
            .collect();

        if let Some(threshold) = self.min_score {
            chunks.retain(|c| c.score.is_none_or(|s| s >= threshold));
        }

        Ok(RetrieveResponse { chunks })
    }
}

/// Build the retriever named by the config selector. An unknown selector is
/// an initialization failure, caught at prepare time.
pub fn build_retriever(
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
    config: &RetrievalConfig,
) -> Result<Box<dyn Retriever>, PipelineError> {
    let mode: QueryMode = config
        .mode
        .parse()
        .map_err(PipelineError::Initialization)?;

    match config.retriever.as_str() {
        "doc_retriever" => Ok(Box::new(VectorRetriever::new(
            embedder,
            index,
            mode,
            config.min_score,
        ))),
        other => Err(PipelineError::Initialization(format!(
            "retriever value {} in config is invalid",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmbeddingError;
    use crate::models::{Document, DocumentMetadata};

    /// Deterministic two-dimensional embedder: the vector depends only on
    /// whether the text mentions cells or light.
    struct KeywordEmbedder;

    impl EmbeddingProvider for KeywordEmbedder {
        fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts
                .iter()
                .map(|t| {
                    let lowered = t.to_lowercase();
                    let cell = if lowered.contains("cell") { 1.0 } else { 0.1 };
                    let light = if lowered.contains("light") { 1.0 } else { 0.1 };
                    vec![cell, light]
                })
                .collect())
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    fn chunk(text: &str, index: u32) -> DocumentChunk {
        let doc = Document::new(
            text.to_string(),
            DocumentMetadata {
                path: "/corpus/test.txt".to_string(),
                file_name: None,
            },
        );
        DocumentChunk::from_document(&doc, text.to_string(), index, 2)
    }

    fn test_index() -> Arc<VectorIndex> {
        let embedder = KeywordEmbedder;
        let texts = [
            "Cells are the basic unit of life.",
            "Photosynthesis converts light to energy.",
        ];
        let entries = texts
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let vector = embedder.embed_query(t).unwrap();
                (chunk(t, i as u32), vector)
            })
            .collect();
        Arc::new(VectorIndex::build("test", 2, entries).unwrap())
    }

    #[test]
    fn test_retrieve_ranks_relevant_chunk_first() {
        let retriever = VectorRetriever::new(
            Arc::new(KeywordEmbedder),
            test_index(),
            QueryMode::Default,
            None,
        );
        let response = retriever
            .retrieve(&RetrieveRequest {
                query: "What is a cell?".to_string(),
                top_k: 2,
            })
            .unwrap();

        assert_eq!(response.chunks.len(), 2);
        assert!(response.chunks[0].chunk.text.contains("Cells"));
        assert!(response.chunks[0].score.is_some());
        let first = response.chunks[0].score.unwrap();
        let second = response.chunks[1].score.unwrap();
        assert!(first >= second);
    }

    #[test]
    fn test_retrieve_caps_at_available_records() {
        let retriever = VectorRetriever::new(
            Arc::new(KeywordEmbedder),
            test_index(),
            QueryMode::Default,
            None,
        );
        let response = retriever
            .retrieve(&RetrieveRequest {
                query: "light".to_string(),
                top_k: 50,
            })
            .unwrap();
        assert_eq!(response.chunks.len(), 2);
    }

    #[test]
    fn test_min_score_filters_low_similarity() {
        let retriever = VectorRetriever::new(
            Arc::new(KeywordEmbedder),
            test_index(),
            QueryMode::Default,
            Some(0.95),
        );
        let response = retriever
            .retrieve(&RetrieveRequest {
                query: "tell me about the cell".to_string(),
                top_k: 2,
            })
            .unwrap();
        assert!(!response.chunks.is_empty());
        for retrieved in &response.chunks {
            assert!(retrieved.score.unwrap() >= 0.95);
        }
    }

    #[test]
    fn test_build_retriever_rejects_unknown_selector() {
        let config = RetrievalConfig {
            retriever: "graph_retriever".to_string(),
            ..Default::default()
        };
        let result = build_retriever(Arc::new(KeywordEmbedder), test_index(), &config);
        match result {
            Err(PipelineError::Initialization(msg)) => {
                assert!(msg.contains("graph_retriever"));
            }
            _ => panic!("expected initialization error"),
        }
    }

    #[test]
    fn test_build_retriever_rejects_unknown_mode() {
        let config = RetrievalConfig {
            mode: "hybrid".to_string(),
            ..Default::default()
        };
        let result = build_retriever(Arc::new(KeywordEmbedder), test_index(), &config);
        assert!(matches!(result, Err(PipelineError::Initialization(_))));
    }
}
