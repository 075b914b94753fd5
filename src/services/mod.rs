mod answerer;
mod chunker;
mod embedding;
mod index_builder;
mod llm;
mod retriever;
mod vector_index;

pub use answerer::{Answerer, CompactAnswerer, EMPTY_CONTEXT_REPLY, GuardedAnswerer, build_answerer};
pub use chunker::{SentenceChunker, estimate_tokens, split_sentences};
pub use embedding::{EmbeddingProvider, OnnxEmbedder};
pub use index_builder::{build_index, load_corpus};
pub use llm::{LanguageModel, LlamaServerClient, SUPPORTED_MODELS, acquire_model};
pub use retriever::{
    RetrieveRequest, RetrieveResponse, RetrievedChunk, Retriever, VectorRetriever, build_retriever,
};
pub use vector_index::{IndexedRecord, QueryMode, ScoredRecord, VectorIndex};
