//! Wire types for the `/v1/custom_rag_qna` endpoint.

use serde::{Deserialize, Serialize};

/// Success payload: `{response, user_query, answer_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QnaResponse {
    pub response: String,
    pub user_query: String,
    pub answer_id: String,
}

/// Error payload returned for every failed request. `debug_id` is the
/// per-request correlation id also present in the server logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub name: String,
    pub message: String,
    pub debug_id: String,
}

/// Request fields that survived validation.
#[derive(Debug, Clone)]
pub struct ValidatedInputs {
    pub user_query: String,
    pub model_id: String,
}
