//! Single-shot language tasks.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use parley_chat::{DEFAULT_CODE_LANGUAGE, DEFAULT_SUMMARY_WORDS, analyze_sentiment, generate_code, summarize};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{require, timestamp};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub text: Option<String>,
    pub max_length: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SentimentRequest {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateCodeRequest {
    pub description: Option<String>,
    pub language: Option<String>,
}

/// `POST /api/summarize`
pub async fn summarize_text(
    State(state): State<AppState>,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let text = require(request.text, "Text")?;
    let max_words = request.max_length.filter(|n| *n > 0).unwrap_or(DEFAULT_SUMMARY_WORDS);

    let summary = summarize(state.backend.as_ref(), &text, max_words).await?;
    Ok(Json(json!({
        "summary": summary,
        "original_length": text.chars().count(),
        "summary_length": summary.chars().count(),
        "timestamp": timestamp(),
    })))
}

/// `POST /api/sentiment`
pub async fn sentiment(
    State(state): State<AppState>,
    payload: Result<Json<SentimentRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let text = require(request.text, "Text")?;

    let analysis = analyze_sentiment(state.backend.as_ref(), &text).await?;
    Ok(Json(json!({ "sentiment_analysis": analysis, "timestamp": timestamp() })))
}

/// `POST /api/generate-code`
pub async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateCodeRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload?;
    let description = require(request.description, "Description")?;
    let language = request
        .language
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CODE_LANGUAGE.to_string());

    let code = generate_code(state.backend.as_ref(), &description, &language).await?;
    Ok(Json(json!({ "generated_code": code, "language": language, "timestamp": timestamp() })))
}
