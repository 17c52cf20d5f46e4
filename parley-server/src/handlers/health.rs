use axum::{Json, extract::State, http::StatusCode};
use parley_chat::check_connection;
use serde_json::{Value, json};
use tracing::error;

use super::timestamp;
use crate::state::AppState;

/// `GET /api/health`: a live round trip to the completion backend.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match check_connection(state.backend.as_ref()).await {
        Ok(reply) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "backend": "connected",
                "test_response": reply,
                "timestamp": timestamp(),
            })),
        ),
        Err(e) => {
            error!(error = %e, "health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "unhealthy", "error": e.to_string(), "timestamp": timestamp() })),
            )
        }
    }
}
