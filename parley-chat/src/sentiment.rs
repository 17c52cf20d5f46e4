//! Sentiment analysis through the completion backend.
//!
//! The model is asked for a JSON object and its reply is parsed against a
//! strict schema. Replies that do not fit degrade to
//! [`SentimentAnalysis::fallback`] instead of failing the request.

use std::sync::LazyLock;

use parley_core::{CompletionBackend, CompletionRequest};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::{ChatError, Result};

const SENTIMENT_PROMPT: &str = "You are a sentiment analysis expert. Analyze the sentiment of the \
provided text and return your response as a JSON object with the following structure:
{
    \"sentiment\": \"positive|negative|neutral\",
    \"confidence\": 0.0-1.0,
    \"emotions\": [\"emotion1\", \"emotion2\"],
    \"explanation\": \"brief explanation\"
}
Respond with the JSON object only.";

const SENTIMENT_MAX_TOKENS: u32 = 300;
const SENTIMENT_TEMPERATURE: f32 = 0.1;

/// A reply wrapped in a markdown code fence, optionally tagged `json`.
static CODE_FENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*```(?:json|JSON)?\s*(.*?)\s*```\s*$").ok());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SentimentAnalysis {
    pub sentiment: Sentiment,
    /// In `[0, 1]`.
    pub confidence: f32,
    #[serde(default)]
    pub emotions: Vec<String>,
    #[serde(default)]
    pub explanation: String,
}

impl SentimentAnalysis {
    /// Result reported when the model's reply cannot be understood.
    pub fn fallback() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            confidence: 0.0,
            emotions: Vec::new(),
            explanation: "Analysis failed".to_string(),
        }
    }
}

/// Parse a model reply, tolerating a surrounding code fence.
///
/// # Errors
///
/// Returns [`ChatError::Parse`] if the reply is not a JSON object matching
/// [`SentimentAnalysis`] or its confidence lies outside `[0, 1]`.
pub fn parse_sentiment(raw: &str) -> Result<SentimentAnalysis> {
    let body = CODE_FENCE
        .as_ref()
        .and_then(|fence| fence.captures(raw))
        .and_then(|captures| captures.get(1))
        .map_or(raw.trim(), |m| m.as_str());

    let analysis: SentimentAnalysis =
        serde_json::from_str(body).map_err(|e| ChatError::Parse(e.to_string()))?;

    if !(0.0..=1.0).contains(&analysis.confidence) {
        return Err(ChatError::Parse(format!(
            "confidence {} is outside [0, 1]",
            analysis.confidence
        )));
    }
    Ok(analysis)
}

/// Ask the backend for the sentiment of `text`.
///
/// # Errors
///
/// Backend failures propagate; unparseable replies become
/// [`SentimentAnalysis::fallback`].
pub async fn analyze_sentiment(
    backend: &dyn CompletionBackend,
    text: &str,
) -> Result<SentimentAnalysis> {
    let request = CompletionRequest::with_system(SENTIMENT_PROMPT, format!("Analyze sentiment: {text}"))
        .max_tokens(SENTIMENT_MAX_TOKENS)
        .temperature(SENTIMENT_TEMPERATURE);

    let reply = backend.complete(request).await.map_err(|e| {
        error!(error = %e, "sentiment analysis failed");
        ChatError::Backend(e)
    })?;

    Ok(parse_sentiment(&reply).unwrap_or_else(|e| {
        warn!(error = %e, "failed to parse sentiment analysis");
        SentimentAnalysis::fallback()
    }))
}
