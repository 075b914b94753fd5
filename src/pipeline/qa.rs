//! Request-scoped orchestration: prepare, generate, package.

use std::sync::Arc;

use tracing::{error, info};

use crate::error::PipelineError;
use crate::models::{Config, QnaResponse, ValidatedInputs};
use crate::pipeline::state::{RequestState, Stage};
use crate::services::{
    EmbeddingProvider, RetrieveRequest, VectorIndex, acquire_model, build_answerer,
    build_retriever,
};

/// Shared, read-only dependencies injected into every request. The index is
/// built before serving starts and never mutated afterwards; the embedding
/// provider is the same instance used at index-build time.
#[derive(Clone)]
pub struct SharedServices {
    pub config: Arc<Config>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub index: Arc<VectorIndex>,
}

/// One request's pass through the pipeline.
///
/// Stages run strictly in order (prepare, generate, package) and none is
/// retried; retry policy belongs to the caller at the HTTP boundary. Any
/// stage failure moves the request to the terminal `Failed` stage and
/// propagates.
pub struct QaPipeline {
    services: SharedServices,
    state: RequestState,
}

impl QaPipeline {
    pub fn new(services: SharedServices, answer_id: String, inputs: ValidatedInputs) -> Self {
        Self {
            services,
            state: RequestState::new(answer_id, inputs),
        }
    }

    pub fn stage(&self) -> Stage {
        self.state.stage
    }

    pub fn answer_id(&self) -> &str {
        &self.state.answer_id
    }

    pub fn response(&self) -> Option<&str> {
        self.state.response.as_deref()
    }

    pub fn retrieved_chunks(&self) -> &[crate::services::RetrievedChunk] {
        self.state.retrieved.as_deref().unwrap_or_default()
    }

    /// CREATED → PREPARED: acquire the retriever and language-model handles.
    pub fn prepare(&mut self) -> Result<(), PipelineError> {
        if self.state.stage != Stage::Created {
            return self.fail(PipelineError::Initialization(format!(
                "prepare called in stage {:?}",
                self.state.stage
            )));
        }

        let config = Arc::clone(&self.services.config);
        let embedder = Arc::clone(&self.services.embedder);
        let index = Arc::clone(&self.services.index);

        let retriever = match build_retriever(embedder, index, &config.retrieval) {
            Ok(retriever) => retriever,
            Err(e) => return self.fail(e),
        };
        let model = match acquire_model(&self.state.inputs.model_id, &config.llm) {
            Ok(model) => model,
            Err(e) => return self.fail(e),
        };

        self.state.retriever = Some(retriever);
        self.state.model = Some(model);
        self.state.stage = Stage::Prepared;
        Ok(())
    }

    /// PREPARED → ANSWERED: retrieve context with the prepared handles and
    /// generate the answer.
    ///
    /// Failures here are logged with the request id and re-raised as a
    /// generic service error; the underlying cause never reaches the client.
    pub async fn generate(&mut self) -> Result<(), PipelineError> {
        if self.state.stage != Stage::Prepared {
            return self.fail(PipelineError::Initialization(format!(
                "no handles available: generate called in stage {:?}",
                self.state.stage
            )));
        }
        let (Some(retriever), Some(model)) =
            (self.state.retriever.take(), self.state.model.clone())
        else {
            return self.fail(PipelineError::Initialization(
                "no handles available: prepare did not run".to_string(),
            ));
        };

        let config = Arc::clone(&self.services.config);
        let request = RetrieveRequest {
            query: self.state.inputs.user_query.clone(),
            top_k: config.retrieval.top_k as usize,
        };

        let retrieval = match retriever.retrieve(&request) {
            Ok(retrieval) => retrieval,
            Err(e) => {
                error!(answer_id = %self.state.answer_id, error = %e, "retrieval failed");
                return self.fail(PipelineError::service("answer generation failed"));
            }
        };

        let context_budget = config
            .llm
            .context_window
            .saturating_sub(config.llm.max_new_tokens) as usize;
        let answerer = build_answerer(config.llm.prompt_style, model, context_budget);
        let response = match answerer
            .answer(&self.state.inputs.user_query, &retrieval.chunks)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(answer_id = %self.state.answer_id, error = %e, "generation failed");
                return self.fail(PipelineError::service("answer generation failed"));
            }
        };

        info!(
            answer_id = %self.state.answer_id,
            elapsed_ms = self.state.started_at.elapsed().as_millis() as u64,
            retrieved = retrieval.chunks.len(),
            "time taken to generate result"
        );

        self.state.retrieved = Some(retrieval.chunks);
        self.state.response = Some(response);
        self.state.stage = Stage::Answered;
        Ok(())
    }

    /// ANSWERED → PACKAGED: serialize `{response, user_query, answer_id}`.
    ///
    /// Pure data transformation with no failure path: missing interim values
    /// become empty strings, and repeated calls yield byte-identical output.
    pub fn package(&mut self) -> String {
        let payload = QnaResponse {
            response: self.state.response.clone().unwrap_or_default(),
            user_query: self.state.inputs.user_query.clone(),
            answer_id: self.state.answer_id.clone(),
        };
        if self.state.stage == Stage::Answered {
            self.state.stage = Stage::Packaged;
        }
        serde_json::to_string(&payload).unwrap_or_default()
    }

    fn fail(&mut self, error: PipelineError) -> Result<(), PipelineError> {
        self.state.stage = Stage::Failed;
        self.state.error = Some(error.to_string());
        Err(error)
    }
}
