use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{SecondsFormat, Utc};
use serde_json::json;

/// `GET /api/health`: connects to the database if needed and reports the
/// outcome. Failures go into the body, not the log.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.connect().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                "environment": state.config.environment
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "error": e.message()
            })),
        ),
    }
}
