use crate::models::{Session, SessionExchange, SessionUpdate};
use async_trait::async_trait;
use service_core::error::AppError;

/// Persistence operations the route groups need.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, session: &Session) -> Result<(), AppError>;

    /// Most recently updated first.
    async fn list_sessions(&self, limit: i64) -> Result<Vec<Session>, AppError>;

    async fn find_session(&self, session_id: &str) -> Result<Option<Session>, AppError>;

    /// Returns the updated session, or `None` if it does not exist.
    async fn update_session(
        &self,
        session_id: &str,
        update: &SessionUpdate,
    ) -> Result<Option<Session>, AppError>;

    async fn delete_session(&self, session_id: &str) -> Result<bool, AppError>;

    /// Append a prompt/reply pair and bump the counters. Returns `false` if the
    /// session does not exist.
    async fn append_exchange(
        &self,
        session_id: &str,
        exchange: &SessionExchange,
    ) -> Result<bool, AppError>;
}
