pub mod config;
pub mod dtos;
pub mod entry;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

pub use entry::app;
pub use startup::{AppState, Application};

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use crate::config::{ApiConfig, ANY_ORIGIN};
use serde_json::json;
use service_core::middleware::rate_limit::ip_rate_limit_middleware;
use std::any::Any;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
};

pub const HEALTH_PATH: &str = "/api/health";
pub const SESSIONS_PREFIX: &str = "/api/sessions";
pub const AI_PREFIX: &str = "/api/ai";

/// The application router, without the database gate.
///
/// Requests pass CORS, then the JSON body limit, then the per-IP rate
/// limiter, then route dispatch; panics in handlers become JSON 500s.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.json_body_limit_bytes;
    let cors = cors_layer(&state.config);
    let rate_limiter = state.rate_limiter.clone();

    Router::new()
        .route(HEALTH_PATH, get(handlers::health_check))
        .nest(SESSIONS_PREFIX, handlers::sessions::router())
        .nest(AI_PREFIX, handlers::ai::router())
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(from_fn_with_state(rate_limiter, ip_rate_limit_middleware))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
}

/// CORS policy for `FRONTEND_URL`. A concrete origin also allows credentials;
/// the wildcard cannot.
pub fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::HEAD,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let base = CorsLayer::new()
        .allow_methods(methods)
        .allow_headers(AllowHeaders::mirror_request());

    let origin = config.cors_origin();
    if origin == ANY_ORIGIN {
        return base.allow_origin(AllowOrigin::any());
    }

    match origin.parse::<HeaderValue>() {
        Ok(value) => base
            .allow_origin(AllowOrigin::exact(value))
            .allow_credentials(true),
        Err(e) => {
            tracing::error!("Invalid CORS origin '{}': {}. Using fallback.", origin, e);
            base.allow_origin(AllowOrigin::any())
        }
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    tracing::error!(panic = %detail, "Request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn panicking_handler_becomes_json_500() {
        let router = Router::new()
            .route("/boom", get(|| async {
                panic!("boom");
                #[allow(unreachable_code)]
                ()
            }))
            .layer(CatchPanicLayer::custom(handle_panic));

        let response = router
            .oneshot(Request::get("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "error": "Internal server error" }));
    }

    #[test]
    fn invalid_frontend_url_falls_back_to_wildcard() {
        let mut config = ApiConfig::default();
        config.frontend_url = Some("bad\norigin".to_string());

        // Building must not panic.
        let _ = cors_layer(&config);
    }
}
