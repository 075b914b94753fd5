//! Per-request state for the QA pipeline.

use std::sync::Arc;
use std::time::Instant;

use crate::models::ValidatedInputs;
use crate::services::{LanguageModel, RetrievedChunk, Retriever};

/// Lifecycle stages of a single request. `Failed` is terminal and reachable
/// from any non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Created,
    Prepared,
    Answered,
    Packaged,
    Failed,
}

/// Identity, validated inputs, and interim outputs of one request.
///
/// Owned by exactly one request and discarded at its end. Concurrent
/// requests share only the read-only vector index and embedding provider;
/// nothing in this struct crosses request boundaries.
pub struct RequestState {
    pub answer_id: String,
    pub started_at: Instant,
    pub inputs: ValidatedInputs,
    pub stage: Stage,
    pub(crate) retriever: Option<Box<dyn Retriever>>,
    pub(crate) model: Option<Arc<dyn LanguageModel>>,
    pub(crate) retrieved: Option<Vec<RetrievedChunk>>,
    pub(crate) response: Option<String>,
    pub(crate) error: Option<String>,
}

impl RequestState {
    pub fn new(answer_id: String, inputs: ValidatedInputs) -> Self {
        Self {
            answer_id,
            started_at: Instant::now(),
            inputs,
            stage: Stage::Created,
            retriever: None,
            model: None,
            retrieved: None,
            response: None,
            error: None,
        }
    }

    /// Last recorded failure message, if the request failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
