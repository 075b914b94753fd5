//! Error types for the QA service.

use thiserror::Error;

/// Errors related to loading and running the embedding model.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("model not found: {0}")]
    NotFound(String),

    #[error("failed to load model: {0}")]
    LoadError(String),

    #[error("tokenizer error: {0}")]
    TokenizerError(String),

    #[error("inference error: {0}")]
    InferenceError(String),
}

/// Errors related to loading the extracted document corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("directory walk error: {0}")]
    WalkError(String),

    #[error("no extractable documents under {0}")]
    NoDocuments(String),
}

/// Errors related to the in-process vector index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("corpus error: {0}")]
    CorpusError(#[from] CorpusError),

    #[error("embedding error: {0}")]
    EmbeddingError(#[from] EmbeddingError),
}

/// Errors related to retrieval operations.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("embedding error: {0}")]
    EmbeddingError(#[from] EmbeddingError),

    #[error("index error: {0}")]
    IndexError(#[from] IndexError),
}

/// Errors related to the language-model backend.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("failed to connect to model server: {0}")]
    ConnectionError(String),

    #[error("model server error: {0}")]
    ServerError(String),

    #[error("completion request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid completion response: {0}")]
    InvalidResponse(String),

    #[error("completion timeout")]
    Timeout,
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Errors related to the offline evaluation command.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("line {0}: JSON parse error: {1}")]
    JsonParseError(usize, serde_json::Error),

    #[error("no records found")]
    NoRecords,
}

/// Request-facing error taxonomy for the QA pipeline.
///
/// Components return their own domain errors; the pipeline folds them into
/// this taxonomy, and only the HTTP handler maps variants to response codes
/// and client-visible error names.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed or missing client input. Always client-facing.
    #[error("{message}")]
    Validation { code: u16, message: String },

    /// Retriever, model, or index construction failure at prepare time.
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// Unsupported model selector, caught before any handle construction.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Failure during retrieval or generation. The underlying cause stays in
    /// the server logs; clients see only this message plus the debug id.
    #[error("{message}")]
    Service { code: u16, message: String },

    /// Anything unclassified, caught at the outermost boundary.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn validation(code: u16, message: impl Into<String>) -> Self {
        PipelineError::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn service(message: impl Into<String>) -> Self {
        PipelineError::Service {
            code: 500,
            message: message.into(),
        }
    }

    /// Error name reported to clients.
    pub fn name(&self) -> &'static str {
        match self {
            PipelineError::Validation { .. } => "VALIDATION_ERROR",
            PipelineError::Internal(_) => "INTERNAL_EXCEPTION",
            PipelineError::Initialization(_)
            | PipelineError::InvalidParameters(_)
            | PipelineError::Service { .. } => "CUSTOM_EXCEPTION",
        }
    }

    /// HTTP status code carried by the error.
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::Validation { code, .. } | PipelineError::Service { code, .. } => *code,
            PipelineError::InvalidParameters(_) => 422,
            PipelineError::Initialization(_) | PipelineError::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_mapping() {
        let err = PipelineError::validation(422, "user_query cannot be empty string");
        assert_eq!(err.name(), "VALIDATION_ERROR");
        assert_eq!(err.status_code(), 422);
        assert_eq!(err.to_string(), "user_query cannot be empty string");
    }

    #[test]
    fn test_invalid_parameters_distinguishable_from_validation() {
        let err = PipelineError::InvalidParameters("invalid model value: x".to_string());
        assert_eq!(err.name(), "CUSTOM_EXCEPTION");
        assert_ne!(err.status_code(), 500);
    }

    #[test]
    fn test_service_defaults_to_500() {
        let err = PipelineError::service("answer generation failed");
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.name(), "CUSTOM_EXCEPTION");
    }

    #[test]
    fn test_internal_mapping() {
        let err = PipelineError::Internal("boom".to_string());
        assert_eq!(err.name(), "INTERNAL_EXCEPTION");
        assert_eq!(err.status_code(), 500);
    }
}
