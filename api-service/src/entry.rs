//! The serverless entry point.
//!
//! [`app`] is the single service the hosting platform invokes for every
//! request. Before anything else it makes sure the shared database
//! connection exists; connection failures are answered here because they
//! happen before the request reaches the application router.

use crate::{build_router, AppState, HEALTH_PATH};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state, Next},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;
use service_core::middleware::tracing::{request_id_middleware, REQUEST_ID_HEADER};
use tower_http::trace::TraceLayer;

/// Full application: request id, tracing span, database gate, then the
/// application router.
pub fn app(state: AppState) -> Router {
    build_router(state.clone())
        .layer(from_fn_with_state(state, ensure_database))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
}

/// Connect (once) before delegating to the router.
///
/// The health endpoint is let through untouched: it performs the same
/// connect itself and reports failures with its own 503 body.
pub async fn ensure_database(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if request.uri().path() == HEALTH_PATH {
        return next.run(request).await;
    }

    match state.db.connect().await {
        Ok(_) => next.run(request).await,
        Err(e) => {
            let message = e.message();
            tracing::error!(error = %message, "Error connecting to database");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Internal server error",
                    "message": message
                })),
            )
                .into_response()
        }
    }
}
