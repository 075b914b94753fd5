//! Route handlers and request validation for the QA endpoint.

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde_json::Value;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::models::{DEFAULT_MODEL_ID, ErrorBody, ValidatedInputs};
use crate::pipeline::{QaPipeline, SharedServices};

/// Shared handler state: the read-only services built at startup.
#[derive(Clone)]
pub struct AppState {
    pub services: SharedServices,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/custom_rag_qna", post(qna_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Endpoint for QA responses. Generates the per-request `answer_id` at
/// entry; every log line and error payload for the request carries it.
async fn qna_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let answer_id = Uuid::new_v4().to_string();
    info!(%answer_id, "starting to serve request");

    match handle_qna(state, &answer_id, &body).await {
        Ok(payload) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            payload,
        )
            .into_response(),
        Err(e) => error_response(&e, &answer_id),
    }
}

async fn handle_qna(
    state: AppState,
    answer_id: &str,
    body: &[u8],
) -> Result<String, PipelineError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| PipelineError::Internal(format!("invalid request body: {}", e)))?;
    let inputs = validate_request(&value)?;

    let mut pipeline = QaPipeline::new(state.services, answer_id.to_string(), inputs);
    pipeline.prepare()?;
    pipeline.generate().await?;
    Ok(pipeline.package())
}

/// Validate the request body: `user_query` must be present (400) and a
/// non-empty string (422); `model_id` falls back to the default backend with
/// a warning when missing or not a string.
pub(crate) fn validate_request(body: &Value) -> Result<ValidatedInputs, PipelineError> {
    let object = body.as_object().ok_or_else(|| {
        PipelineError::validation(400, "request body must be a JSON object")
    })?;

    if !object.contains_key("user_query") {
        return Err(PipelineError::validation(400, "user_query field missing"));
    }
    let user_query = match object.get("user_query").and_then(Value::as_str) {
        Some(q) if !q.trim().is_empty() => q.to_string(),
        _ => {
            return Err(PipelineError::validation(
                422,
                "user_query cannot be empty string",
            ));
        }
    };

    let model_id = match object.get("model_id").and_then(Value::as_str) {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => {
            warn!("defaulting model to {}", DEFAULT_MODEL_ID);
            DEFAULT_MODEL_ID.to_string()
        }
    };

    Ok(ValidatedInputs {
        user_query,
        model_id,
    })
}

fn error_response(error: &PipelineError, answer_id: &str) -> Response {
    match error {
        PipelineError::Validation { code, message } => {
            error!(%answer_id, "ValidationError: {} - {}", code, message);
        }
        other => {
            error!(%answer_id, "{}: {} - {}", other.name(), other.status_code(), other);
        }
    }

    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = ErrorBody {
        name: error.name().to_string(),
        message: error.to_string(),
        debug_id: answer_id.to_string(),
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmbeddingError;
    use crate::models::{Config, Document, DocumentChunk, DocumentMetadata};
    use crate::services::{EmbeddingProvider, VectorIndex};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct UnitEmbedder;

    impl EmbeddingProvider for UnitEmbedder {
        fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    fn test_state() -> AppState {
        let doc = Document::new(
            "Cells are the basic unit of life.".to_string(),
            DocumentMetadata {
                path: "/corpus/test.txt".to_string(),
                file_name: None,
            },
        );
        let chunk = DocumentChunk::from_document(&doc, doc.text.clone(), 0, 1);
        let index = VectorIndex::build("test", 2, vec![(chunk, vec![1.0, 0.0])]).unwrap();
        AppState {
            services: SharedServices {
                config: Arc::new(Config::default()),
                embedder: Arc::new(UnitEmbedder),
                index: Arc::new(index),
            },
        }
    }

    async fn post_body(body: &str) -> (StatusCode, ErrorBody) {
        let app = router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/custom_rag_qna")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[test]
    fn test_validate_request_missing_field() {
        let body: Value = serde_json::json!({"model_id": "oss_llama-13b"});
        let err = validate_request(&body).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("user_query field missing"));
    }

    #[test]
    fn test_validate_request_empty_query() {
        let body: Value = serde_json::json!({"user_query": "   "});
        let err = validate_request(&body).unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn test_validate_request_null_query_rejected() {
        let body: Value = serde_json::json!({"user_query": null});
        let err = validate_request(&body).unwrap_err();
        assert_eq!(err.status_code(), 422);
    }

    #[test]
    fn test_validate_request_defaults_model_id() {
        let body: Value = serde_json::json!({"user_query": "What is a cell?", "model_id": null});
        let inputs = validate_request(&body).unwrap();
        assert_eq!(inputs.model_id, DEFAULT_MODEL_ID);
        assert_eq!(inputs.user_query, "What is a cell?");
    }

    #[tokio::test]
    async fn test_endpoint_empty_query_returns_422() {
        let (status, body) = post_body(r#"{"user_query": ""}"#).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.name, "VALIDATION_ERROR");
        assert!(!body.debug_id.is_empty());
    }

    #[tokio::test]
    async fn test_endpoint_missing_field_returns_400() {
        let (status, body) = post_body(r#"{}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.name, "VALIDATION_ERROR");
        assert!(body.message.contains("user_query"));
    }

    #[tokio::test]
    async fn test_endpoint_unsupported_model_is_distinguishable() {
        let (status, body) =
            post_body(r#"{"user_query": "What is a cell?", "model_id": "oss_gpt-j"}"#).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.name, "CUSTOM_EXCEPTION");
        assert!(body.message.contains("invalid model value"));
    }

    #[tokio::test]
    async fn test_endpoint_malformed_json_returns_500_internal() {
        let (status, body) = post_body("not json").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.name, "INTERNAL_EXCEPTION");
    }
}
