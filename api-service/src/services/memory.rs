//! In-process session storage for tests and local runs without MongoDB.

use super::{ConnectError, DatabaseConnector, SessionStore};
use crate::models::{Session, SessionExchange, SessionUpdate};
use async_trait::async_trait;
use chrono::Utc;
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert_session(&self, session: &Session) -> Result<(), AppError> {
        self.sessions
            .write()
            .await
            .insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn list_sessions(&self, limit: i64) -> Result<Vec<Session>, AppError> {
        let mut sessions: Vec<Session> = self.sessions.read().await.values().cloned().collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        sessions.truncate(limit.max(0) as usize);
        Ok(sessions)
    }

    async fn find_session(&self, session_id: &str) -> Result<Option<Session>, AppError> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn update_session(
        &self,
        session_id: &str,
        update: &SessionUpdate,
    ) -> Result<Option<Session>, AppError> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(session_id) else {
            return Ok(None);
        };

        if let Some(title) = &update.title {
            session.title = title.clone();
        }
        if let Some(system_prompt) = &update.system_prompt {
            session.system_prompt = Some(system_prompt.clone());
        }
        session.updated_at = Utc::now();

        Ok(Some(session.clone()))
    }

    async fn delete_session(&self, session_id: &str) -> Result<bool, AppError> {
        Ok(self.sessions.write().await.remove(session_id).is_some())
    }

    async fn append_exchange(
        &self,
        session_id: &str,
        exchange: &SessionExchange,
    ) -> Result<bool, AppError> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(session_id) else {
            return Ok(false);
        };

        session.messages.push(exchange.prompt.clone());
        session.messages.push(exchange.reply.clone());
        session.message_count += 2;
        session.total_input_tokens += exchange.input_tokens;
        session.total_output_tokens += exchange.output_tokens;
        session.updated_at = Utc::now();

        Ok(true)
    }
}

/// Connector that always hands out the same in-memory store.
#[derive(Clone, Default)]
pub struct InMemoryConnector {
    store: Arc<InMemorySessionStore>,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> Arc<InMemorySessionStore> {
        self.store.clone()
    }
}

#[async_trait]
impl DatabaseConnector for InMemoryConnector {
    async fn connect(&self) -> Result<Arc<dyn SessionStore>, ConnectError> {
        Ok(self.store.clone())
    }
}
