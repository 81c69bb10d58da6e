//! MongoDB-backed session storage.

use super::{ConnectError, DatabaseConnector, SessionStore};
use crate::config::MongoConfig;
use crate::models::{Session, SessionExchange, SessionUpdate};
use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    options::{ClientOptions, FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;
use std::sync::Arc;
use std::time::Duration;

const APP_NAME: &str = "api-service";
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Connects to MongoDB using `MONGODB_URI`.
pub struct MongoConnector {
    config: MongoConfig,
}

impl MongoConnector {
    pub fn new(config: MongoConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DatabaseConnector for MongoConnector {
    async fn connect(&self) -> Result<Arc<dyn SessionStore>, ConnectError> {
        let uri = self
            .config
            .uri
            .as_deref()
            .ok_or_else(|| ConnectError::NotConfigured("MONGODB_URI is not set".to_string()))?;

        tracing::info!(database = %self.config.database, "Connecting to MongoDB");

        let mut options = ClientOptions::parse(uri).await.map_err(|e| {
            tracing::error!("Invalid MongoDB connection string: {}", e);
            ConnectError::from(e)
        })?;
        options.app_name = Some(APP_NAME.to_string());
        options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);

        let client = MongoClient::with_options(options)?;

        // The driver connects lazily; ping so a bad URI or unreachable cluster
        // fails here rather than inside a route handler.
        client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB ping failed: {}", e);
                ConnectError::from(e)
            })?;

        let store = MongoSessionStore::new(client.database(&self.config.database));
        store.initialize_indexes().await?;

        tracing::info!(database = %self.config.database, "Successfully connected to MongoDB database");
        Ok(Arc::new(store))
    }
}

#[derive(Clone)]
pub struct MongoSessionStore {
    db: Database,
}

impl MongoSessionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn sessions(&self) -> Collection<Session> {
        self.db.collection("sessions")
    }

    pub async fn initialize_indexes(&self) -> Result<(), mongodb::error::Error> {
        let session_id_index = IndexModel::builder()
            .keys(doc! { "session_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("session_id_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        let updated_at_index = IndexModel::builder()
            .keys(doc! { "updated_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("updated_at_idx".to_string())
                    .build(),
            )
            .build();

        self.sessions()
            .create_indexes(vec![session_id_index, updated_at_index], None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create session indexes: {}", e);
                e
            })?;

        Ok(())
    }
}

fn database_error(context: &str, err: impl std::fmt::Display) -> AppError {
    tracing::error!("{}: {}", context, err);
    AppError::DatabaseError(anyhow::anyhow!("{}: {}", context, err))
}

#[async_trait]
impl SessionStore for MongoSessionStore {
    async fn insert_session(&self, session: &Session) -> Result<(), AppError> {
        self.sessions()
            .insert_one(session, None)
            .await
            .map_err(|e| database_error("Failed to insert session", e))?;
        Ok(())
    }

    async fn list_sessions(&self, limit: i64) -> Result<Vec<Session>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { "updated_at": -1 })
            .limit(limit)
            .build();

        let cursor = self
            .sessions()
            .find(None, options)
            .await
            .map_err(|e| database_error("Failed to list sessions", e))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| database_error("Failed to read sessions", e))
    }

    async fn find_session(&self, session_id: &str) -> Result<Option<Session>, AppError> {
        self.sessions()
            .find_one(doc! { "session_id": session_id }, None)
            .await
            .map_err(|e| database_error("Failed to find session", e))
    }

    async fn update_session(
        &self,
        session_id: &str,
        update: &SessionUpdate,
    ) -> Result<Option<Session>, AppError> {
        let mut set = Document::new();
        if let Some(title) = &update.title {
            set.insert("title", title);
        }
        if let Some(system_prompt) = &update.system_prompt {
            set.insert("system_prompt", system_prompt);
        }
        set.insert("updated_at", Utc::now().timestamp_millis());

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.sessions()
            .find_one_and_update(doc! { "session_id": session_id }, doc! { "$set": set }, options)
            .await
            .map_err(|e| database_error("Failed to update session", e))
    }

    async fn delete_session(&self, session_id: &str) -> Result<bool, AppError> {
        let result = self
            .sessions()
            .delete_one(doc! { "session_id": session_id }, None)
            .await
            .map_err(|e| database_error("Failed to delete session", e))?;

        Ok(result.deleted_count > 0)
    }

    async fn append_exchange(
        &self,
        session_id: &str,
        exchange: &SessionExchange,
    ) -> Result<bool, AppError> {
        let prompt = mongodb::bson::to_document(&exchange.prompt)
            .map_err(|e| database_error("Failed to serialize message", e))?;
        let reply = mongodb::bson::to_document(&exchange.reply)
            .map_err(|e| database_error("Failed to serialize message", e))?;

        let result = self
            .sessions()
            .update_one(
                doc! { "session_id": session_id },
                doc! {
                    "$push": { "messages": { "$each": [prompt, reply] } },
                    "$inc": {
                        "message_count": 2,
                        "total_input_tokens": exchange.input_tokens,
                        "total_output_tokens": exchange.output_tokens
                    },
                    "$set": { "updated_at": Utc::now().timestamp_millis() }
                },
                None,
            )
            .await
            .map_err(|e| database_error("Failed to add messages to session", e))?;

        Ok(result.matched_count > 0)
    }
}
