use crate::dtos::{
    CreateSessionRequest, SessionListParams, SessionListResponse, SessionResponse,
    SessionSummary, UpdateSessionRequest,
};
use crate::models::{Session, SessionUpdate};
use crate::startup::AppState;
use crate::utils::{ApiQuery, ValidatedJson};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use service_core::error::AppError;

/// Routes mounted under `/api/sessions`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_session).get(list_sessions))
        .route(
            "/:session_id",
            get(get_session)
                .patch(update_session)
                .delete(delete_session),
        )
}

fn session_not_found(session_id: &str) -> AppError {
    AppError::NotFound(anyhow::anyhow!("Session {} not found", session_id))
}

pub async fn create_session(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let store = state.store().await?;

    let session = Session::new(req.title, req.system_prompt);
    store.insert_session(&session).await?;

    tracing::info!(session_id = %session.session_id, "Created session");

    Ok((StatusCode::CREATED, Json(SessionResponse::from(session))))
}

pub async fn list_sessions(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SessionListParams>,
) -> Result<Json<SessionListResponse>, AppError> {
    let store = state.store().await?;

    let sessions: Vec<SessionSummary> = store
        .list_sessions(params.limit())
        .await?
        .into_iter()
        .map(SessionSummary::from)
        .collect();

    Ok(Json(SessionListResponse {
        count: sessions.len(),
        sessions,
    }))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let store = state.store().await?;

    let session = store
        .find_session(&session_id)
        .await?
        .ok_or_else(|| session_not_found(&session_id))?;

    Ok(Json(SessionResponse::from(session)))
}

pub async fn update_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateSessionRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    if req.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Nothing to update: provide title or system_prompt"
        )));
    }

    let store = state.store().await?;

    let update = SessionUpdate {
        title: req.title,
        system_prompt: req.system_prompt,
    };

    let session = store
        .update_session(&session_id, &update)
        .await?
        .ok_or_else(|| session_not_found(&session_id))?;

    Ok(Json(SessionResponse::from(session)))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let store = state.store().await?;

    if !store.delete_session(&session_id).await? {
        return Err(session_not_found(&session_id));
    }

    tracing::info!(session_id = %session_id, "Deleted session");
    Ok(StatusCode::NO_CONTENT)
}
