//! Conversation endpoints.

use std::convert::Infallible;

use async_stream::stream;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::StreamExt;
use parley_chat::{ChatOptions, ReplyStream};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use super::{require, session_id, timestamp};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub stream: bool,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl ChatRequest {
    fn options(&self) -> ChatOptions {
        let defaults = ChatOptions::default();
        ChatOptions {
            system_prompt: self.system_prompt.clone().filter(|p| !p.trim().is_empty()),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: self.temperature.unwrap_or(defaults.temperature),
        }
    }
}

/// `POST /api/chat`
pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let options = request.options();
    let message = require(request.message, "Message")?;
    let session = session_id(&headers);
    info!(session.id = %session, stream = request.stream, "chat request");

    if request.stream {
        let replies = state.sessions.send_stream(&session, message, options).await;
        return Ok(Sse::new(reply_events(replies)).keep_alive(KeepAlive::default()).into_response());
    }

    let response = state.sessions.send(&session, &message, &options).await?;
    Ok(Json(json!({ "response": response, "timestamp": timestamp() })).into_response())
}

/// Fragments as `{"content"}` events, then `{"done": true}` or `{"error"}`.
fn reply_events(
    mut replies: ReplyStream,
) -> impl futures::Stream<Item = Result<Event, Infallible>> + Send + 'static {
    stream! {
        let mut failed = false;
        while let Some(item) = replies.next().await {
            match item {
                Ok(content) => {
                    yield Ok::<_, Infallible>(Event::default().data(json!({ "content": content }).to_string()));
                }
                Err(e) => {
                    error!(error = %e, "streamed chat failed");
                    yield Ok::<_, Infallible>(Event::default().data(json!({ "error": e.to_string() }).to_string()));
                    failed = true;
                    break;
                }
            }
        }
        if !failed {
            yield Ok::<_, Infallible>(Event::default().data(json!({ "done": true }).to_string()));
        }
    }
}

/// `GET /api/conversation`
pub async fn conversation_summary(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let summary = state.sessions.summary(&session_id(&headers)).await;
    Json(json!({ "conversation_summary": summary, "timestamp": timestamp() }))
}

/// `DELETE /api/conversation`
pub async fn clear_conversation(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let session = session_id(&headers);
    state.sessions.clear(&session).await;
    info!(session.id = %session, "conversation cleared");
    Json(json!({ "message": "Conversation history cleared", "timestamp": timestamp() }))
}
