//! AWS Lambda runtime for the API.
//!
//! State is built once per container at cold start; the database connects on
//! the first request and stays connected while the container is warm.

use api_service::{app, config::ApiConfig, AppState};
use lambda_http::{run, Error};
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = ApiConfig::load()
        .map_err(|e| Error::from(format!("Configuration error: {}", e)))?;

    init_tracing(
        "api-service",
        &config.common.log_level,
        config.otlp_endpoint.as_deref(),
    );

    let state = AppState::from_config(config)
        .map_err(|e| Error::from(format!("App initialization error: {}", e)))?;

    tracing::info!("API Lambda ready to serve requests");

    run(app(state)).await
}
