//! Prompt assembly and answer generation over retrieved context.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::models::PromptStyle;
use crate::services::chunker::estimate_tokens;
use crate::services::llm::LanguageModel;
use crate::services::retriever::RetrievedChunk;

/// Canned reply used by the guarded prompt when no context is available.
pub const EMPTY_CONTEXT_REPLY: &str = "I am unable to help you with this query.";

/// Produces a natural-language answer grounded in the retrieved chunks.
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn answer(&self, query: &str, context: &[RetrievedChunk]) -> Result<String, LlmError>;
}

/// Compact context-and-question prompt.
pub struct CompactAnswerer {
    model: Arc<dyn LanguageModel>,
    context_budget: usize,
}

impl CompactAnswerer {
    pub fn new(model: Arc<dyn LanguageModel>, context_budget: usize) -> Self {
        Self {
            model,
            context_budget,
        }
    }
}

#[async_trait]
impl Answerer for CompactAnswerer {
    async fn answer(&self, query: &str, context: &[RetrievedChunk]) -> Result<String, LlmError> {
        let context_text = join_context(context, self.context_budget);
        let prompt = format!(
            "Context information is below.\n\
             ---------------------\n\
             {}\n\
             ---------------------\n\
             Given the context information and not prior knowledge, \
             answer the query.\n\
             Query: {}\n\
             Answer: ",
            context_text, query
        );
        self.model.complete(&prompt).await
    }
}

/// Explicitly guarded prompt that forbids answers outside the supplied
/// context. With no context at all it short-circuits to the canned reply
/// without calling the model.
pub struct GuardedAnswerer {
    model: Arc<dyn LanguageModel>,
    context_budget: usize,
}

impl GuardedAnswerer {
    pub fn new(model: Arc<dyn LanguageModel>, context_budget: usize) -> Self {
        Self {
            model,
            context_budget,
        }
    }
}

#[async_trait]
impl Answerer for GuardedAnswerer {
    async fn answer(&self, query: &str, context: &[RetrievedChunk]) -> Result<String, LlmError> {
        if context.is_empty() {
            return Ok(EMPTY_CONTEXT_REPLY.to_string());
        }

        let context_text = join_context(context, self.context_budget);
        let prompt = format!(
            "You are a search system with expertise in the supplied subject \
             matter. Your task is to correctly answer the query mentioned \
             below within quotes. Remember that you can only formulate an \
             answer based on the context mentioned below between ###. If the \
             context is empty, you simply say \"{}\"\n\
             context:###{}###\n\
             query:'''{}'''",
            EMPTY_CONTEXT_REPLY, context_text, query
        );
        self.model.complete(&prompt).await
    }
}

/// Build the answerer for the configured prompt style.
pub fn build_answerer(
    style: PromptStyle,
    model: Arc<dyn LanguageModel>,
    context_budget: usize,
) -> Box<dyn Answerer> {
    match style {
        PromptStyle::Compact => Box::new(CompactAnswerer::new(model, context_budget)),
        PromptStyle::Guarded => Box::new(GuardedAnswerer::new(model, context_budget)),
    }
}

/// Join chunk texts in rank order, stopping once the token budget is spent.
/// The top-ranked chunk is always included, even if oversized.
fn join_context(context: &[RetrievedChunk], budget: usize) -> String {
    let mut parts: Vec<&str> = Vec::new();
    let mut used = 0usize;
    for retrieved in context {
        let cost = estimate_tokens(&retrieved.chunk.text);
        if !parts.is_empty() && used + cost > budget {
            break;
        }
        parts.push(&retrieved.chunk.text);
        used += cost;
    }
    parts.join("\n\n")
}
