//! Tests against the real TCP listener.

mod common;

use api_service::{services::providers::mock::MockTextProvider, AppState, Application};
use common::{test_config, TestConnector};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;

/// Spawn the application on a random port and return the port number.
async fn spawn_app(max_requests: u32) -> u16 {
    let mut config = test_config();
    config.common.port = 0;
    config.rate_limit.max_requests = max_requests;

    let state = AppState::new(
        config,
        TestConnector::healthy(),
        Arc::new(MockTextProvider::new(true)),
    );
    let app = Application::build_with_state(state)
        .await
        .expect("Failed to build application");

    assert_eq!(app.state().config.rate_limit.max_requests, max_requests);
    let port = app.port();
    assert_ne!(port, 0);

    tokio::spawn(async move {
        let _ = app.run_until_stopped().await;
    });

    port
}

#[tokio::test]
async fn serves_health_over_tcp() {
    let port = spawn_app(100).await;

    let response = Client::new()
        .get(format!("http://127.0.0.1:{}/api/health", port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn rate_limits_by_socket_address() {
    let port = spawn_app(1).await;
    let client = Client::new();
    let url = format!("http://127.0.0.1:{}/api/sessions", port);

    let first = client.get(&url).send().await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = client.get(&url).send().await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(second.headers().contains_key("retry-after"));
}
