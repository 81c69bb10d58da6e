//! Session model for conversation context persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A conversation session that keeps AI context across requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier.
    pub session_id: String,

    /// Human-readable title.
    pub title: String,

    /// System prompt sent ahead of every AI request in this session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Messages in this session, oldest first.
    pub messages: Vec<SessionMessage>,

    /// Total number of messages.
    pub message_count: i32,

    /// Total input tokens consumed.
    pub total_input_tokens: i32,

    /// Total output tokens generated.
    pub total_output_tokens: i32,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(title: String, system_prompt: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            title,
            system_prompt,
            messages: Vec::new(),
            message_count: 0,
            total_input_tokens: 0,
            total_output_tokens: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A message in a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: MessageRole,

    pub content: String,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl SessionMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Partial update applied by `PATCH /api/sessions/:id`.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub title: Option<String>,
    pub system_prompt: Option<String>,
}

/// One prompt/reply exchange appended to a session.
#[derive(Debug, Clone)]
pub struct SessionExchange {
    pub prompt: SessionMessage,
    pub reply: SessionMessage,
    pub input_tokens: i32,
    pub output_tokens: i32,
}
