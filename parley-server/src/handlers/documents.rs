//! Document ingestion and question answering.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Multipart, State, rejection::JsonRejection},
};
use parley_rag::{DocumentSource, DocumentStats};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};

use super::{require, timestamp};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: Option<String>,
    pub context_limit: Option<usize>,
}

struct Upload {
    file_name: String,
    data: Vec<u8>,
}

/// `POST /api/upload-document`
///
/// Multipart fields: `document` (the file) and optional `metadata`, a JSON
/// object whose values are attached to every chunk.
pub async fn upload_document(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<Json<Value>> {
    let mut upload = None;
    let mut metadata = HashMap::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "document" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                if data.len() > state.max_upload_bytes {
                    return Err(ApiError::PayloadTooLarge);
                }
                upload = Some(Upload { file_name, data: data.to_vec() });
            }
            "metadata" => metadata = parse_metadata(&field.text().await?)?,
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| ApiError::BadRequest("No document file provided".into()))?;
    if upload.file_name.trim().is_empty() {
        return Err(ApiError::BadRequest("No file selected".into()));
    }
    let file_name = sanitize_file_name(&upload.file_name);
    if file_name.is_empty() {
        return Err(ApiError::UnsupportedFile);
    }

    let ingested = state
        .documents
        .add_document(DocumentSource::bytes(file_name.clone(), upload.data), metadata)
        .await?;

    if let Some(dir) = &state.index_path {
        if let Err(e) = state.documents.persist(dir).await {
            error!(error = %e, path = %dir.display(), "failed to persist index");
        }
    }

    info!(document.id = %ingested.id, file_name = %file_name, chunk_count = ingested.chunk_count, "document uploaded");
    Ok(Json(json!({
        "document_id": ingested.id,
        "filename": file_name,
        "chunk_count": ingested.chunk_count,
        "message": "Document processed successfully",
    })))
}

/// `POST /api/ask-question`
pub async fn ask_question(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let question = require(request.question, "Question")?;
    let context_limit = request.context_limit.unwrap_or(state.documents.config().top_k);

    let answer = state.answers.answer(&question, context_limit).await;
    Ok(Json(json!({
        "question": question,
        "answer": answer.answer,
        "sources": answer.sources,
        "confidence": answer.confidence,
        "timestamp": timestamp(),
    })))
}

/// `GET /api/document-stats`
pub async fn document_stats(State(state): State<AppState>) -> Json<DocumentStats> {
    Json(state.documents.get_stats().await)
}

/// Metadata values are stored as strings; non-string JSON values keep their JSON text.
fn parse_metadata(raw: &str) -> ApiResult<HashMap<String, String>> {
    if raw.trim().is_empty() {
        return Ok(HashMap::new());
    }
    let object: serde_json::Map<String, Value> = serde_json::from_str(raw)
        .map_err(|_| ApiError::BadRequest("Metadata must be a JSON object".into()))?;

    Ok(object
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}

/// Keep only the final path component, with spaces as underscores and
/// anything outside `[A-Za-z0-9._-]` removed.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}
