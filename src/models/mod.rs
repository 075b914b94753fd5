mod config;
mod document;
mod request;

pub use config::{
    Config, DEFAULT_COLLECTION, DEFAULT_LLM_URL, DEFAULT_MODEL_ID, DEPLOYMENT_ENV_VAR,
    DocumentConfig, EmbeddingConfig, IndexingConfig, LlmConfig, PromptStyle, RetrievalConfig,
    ServiceConfig,
};
pub use document::{Document, DocumentChunk, DocumentMetadata};
pub use request::{ErrorBody, QnaResponse, ValidatedInputs};
