//! Database connector seam.
//!
//! A connector turns configuration into a ready [`SessionStore`]. The entry
//! point never calls it directly; it goes through
//! [`DatabaseHandle`](super::DatabaseHandle), which connects at most once.

use super::SessionStore;
use async_trait::async_trait;
use service_core::error::AppError;
use std::sync::Arc;
use thiserror::Error;

/// Message reported when a failure carries no usable text.
pub const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, Clone, Error)]
pub enum ConnectError {
    #[error("{0}")]
    NotConfigured(String),

    #[error("{0}")]
    Driver(String),

    #[error("Unknown error")]
    Unknown,
}

impl ConnectError {
    /// Text safe to put in a response body. Never empty.
    pub fn message(&self) -> String {
        match self {
            ConnectError::NotConfigured(msg) | ConnectError::Driver(msg)
                if !msg.trim().is_empty() =>
            {
                msg.clone()
            }
            _ => UNKNOWN_ERROR.to_string(),
        }
    }
}

impl From<mongodb::error::Error> for ConnectError {
    fn from(err: mongodb::error::Error) -> Self {
        ConnectError::Driver(err.to_string())
    }
}

impl From<ConnectError> for AppError {
    fn from(err: ConnectError) -> Self {
        AppError::ServiceUnavailable(err.message())
    }
}

#[async_trait]
pub trait DatabaseConnector: Send + Sync {
    /// Establish a connection. Called again after a failure, so
    /// implementations must not leave half-initialized state behind.
    async fn connect(&self) -> Result<Arc<dyn SessionStore>, ConnectError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_passes_through_text() {
        assert_eq!(ConnectError::Driver("timeout".into()).message(), "timeout");
        assert_eq!(
            ConnectError::NotConfigured("MONGODB_URI is not set".into()).message(),
            "MONGODB_URI is not set"
        );
    }

    #[test]
    fn empty_or_unknown_falls_back() {
        assert_eq!(ConnectError::Driver(String::new()).message(), UNKNOWN_ERROR);
        assert_eq!(ConnectError::Driver("   ".into()).message(), UNKNOWN_ERROR);
        assert_eq!(ConnectError::Unknown.message(), UNKNOWN_ERROR);
    }

    #[test]
    fn converts_to_service_unavailable() {
        let err: AppError = ConnectError::Driver("refused".into()).into();
        assert!(matches!(err, AppError::ServiceUnavailable(msg) if msg == "refused"));
    }
}
