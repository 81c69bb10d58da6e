//! Application state and the local HTTP server lifecycle.

use crate::config::ApiConfig;
use crate::entry;
use crate::services::providers::{self, TextProvider};
use crate::services::{DatabaseConnector, DatabaseHandle, MongoConnector, SessionStore};
use axum::Router;
use service_core::error::AppError;
use service_core::middleware::rate_limit::ApiRateLimiter;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

/// Shared application state, built once per process and cloned into every
/// request.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub db: DatabaseHandle,
    pub text_provider: Arc<dyn TextProvider>,
    pub rate_limiter: ApiRateLimiter,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        connector: Arc<dyn DatabaseConnector>,
        text_provider: Arc<dyn TextProvider>,
    ) -> Self {
        let rate_limiter = ApiRateLimiter::new(
            config.rate_limit.max_requests,
            config.rate_limit.window_seconds,
        );

        Self {
            config,
            db: DatabaseHandle::new(connector),
            text_provider,
            rate_limiter,
        }
    }

    /// Production wiring: MongoDB plus the configured AI provider. No I/O
    /// happens here; the database connects on first use.
    pub fn from_config(config: ApiConfig) -> Result<Self, AppError> {
        let connector = Arc::new(MongoConnector::new(config.mongodb.clone()));
        let text_provider = providers::from_config(&config.ai)?;

        tracing::info!(
            provider = text_provider.name(),
            model = %text_provider.model(),
            "Initialized text provider"
        );

        Ok(Self::new(config, connector, text_provider))
    }

    /// The connected session store.
    pub async fn store(&self) -> Result<Arc<dyn SessionStore>, AppError> {
        Ok(self.db.connect().await?)
    }
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    state: AppState,
}

impl Application {
    pub async fn build(config: ApiConfig) -> Result<Self, AppError> {
        let state = AppState::from_config(config)?;
        Self::build_with_state(state).await
    }

    pub async fn build_with_state(state: AppState) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], state.config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        Ok(Self {
            port,
            listener,
            router: entry::app(state.clone()),
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
