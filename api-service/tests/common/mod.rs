//! Test helpers for api-service router tests.
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`; MongoDB
//! and Gemini are replaced by the in-memory store and the mock provider.

#![allow(dead_code)]

use api_service::{
    app,
    config::ApiConfig,
    services::{
        providers::{mock::MockTextProvider, TextProvider},
        ConnectError, DatabaseConnector, InMemorySessionStore, SessionStore,
    },
    AppState,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use http_body_util::BodyExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// Connector that counts attempts and fails the first `failures` of them.
pub struct TestConnector {
    calls: AtomicUsize,
    failures: usize,
    error: ConnectError,
    delay: Duration,
    store: Arc<InMemorySessionStore>,
}

impl TestConnector {
    pub fn healthy() -> Arc<Self> {
        Self::failing_times(0, ConnectError::Unknown)
    }

    pub fn failing(error: ConnectError) -> Arc<Self> {
        Self::failing_times(usize::MAX, error)
    }

    pub fn failing_times(failures: usize, error: ConnectError) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            failures,
            error,
            delay: Duration::ZERO,
            store: Arc::new(InMemorySessionStore::new()),
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            failures: 0,
            error: ConnectError::Unknown,
            delay,
            store: Arc::new(InMemorySessionStore::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn store(&self) -> Arc<InMemorySessionStore> {
        self.store.clone()
    }
}

#[async_trait]
impl DatabaseConnector for TestConnector {
    async fn connect(&self) -> Result<Arc<dyn SessionStore>, ConnectError> {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if attempt < self.failures {
            return Err(self.error.clone());
        }
        Ok(self.store.clone())
    }
}

pub fn test_config() -> ApiConfig {
    ApiConfig::default()
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub connector: Arc<TestConnector>,
}

impl TestApp {
    pub fn spawn() -> Self {
        Self::build(test_config(), TestConnector::healthy())
    }

    pub fn with_config(config: ApiConfig) -> Self {
        Self::build(config, TestConnector::healthy())
    }

    pub fn with_connector(connector: Arc<TestConnector>) -> Self {
        Self::build(test_config(), connector)
    }

    pub fn build(config: ApiConfig, connector: Arc<TestConnector>) -> Self {
        Self::build_with_provider(config, connector, Arc::new(MockTextProvider::new(true)))
    }

    pub fn build_with_provider(
        config: ApiConfig,
        connector: Arc<TestConnector>,
        provider: Arc<dyn TextProvider>,
    ) -> Self {
        let state = AppState::new(config, connector.clone(), provider);
        Self {
            router: app(state.clone()),
            state,
            connector,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn delete(&self, uri: &str) -> Response<Body> {
        self.send(Request::delete(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.send(json_request("POST", uri, body)).await
    }

    pub async fn patch_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.send(json_request("PATCH", uri, body)).await
    }
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}
