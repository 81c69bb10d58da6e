use crate::models::{Session, SessionMessage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const DEFAULT_LIST_LIMIT: i64 = 20;
pub const MAX_LIST_LIMIT: i64 = 100;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessionRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(max = 4000, message = "System prompt must be at most 4000 characters"))]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSessionRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 4000, message = "System prompt must be at most 4000 characters"))]
    pub system_prompt: Option<String>,
}

impl UpdateSessionRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.system_prompt.is_none()
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionListParams {
    pub limit: Option<i64>,
}

impl SessionListParams {
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }
}

/// Full session including its messages.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    pub messages: Vec<SessionMessage>,
    pub message_count: i32,
    pub total_input_tokens: i32,
    pub total_output_tokens: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            session_id: session.session_id,
            title: session.title,
            system_prompt: session.system_prompt,
            messages: session.messages,
            message_count: session.message_count,
            total_input_tokens: session.total_input_tokens,
            total_output_tokens: session.total_output_tokens,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

/// List entry, without messages.
#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub title: String,
    pub message_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Session> for SessionSummary {
    fn from(session: Session) -> Self {
        Self {
            session_id: session.session_id,
            title: session.title,
            message_count: session.message_count,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummary>,
    pub count: usize,
}
