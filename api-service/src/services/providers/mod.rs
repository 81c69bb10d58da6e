//! AI provider abstractions and implementations.
//!
//! The AI route group talks to a [`TextProvider`]; Gemini is the production
//! backend and the mock is used by tests and local runs without an API key.

pub mod gemini;
pub mod mock;

use crate::config::{AiConfig, AiProviderKind};
use crate::models::MessageRole;
use async_trait::async_trait;
use service_core::error::AppError;
use std::sync::Arc;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Content filtered")]
    ContentFiltered,

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotConfigured(msg) => AppError::ServiceUnavailable(msg),
            ProviderError::RateLimited => AppError::TooManyRequests(
                "AI provider rate limit reached, please try again later.".to_string(),
                None,
            ),
            ProviderError::ContentFiltered => AppError::BadRequest(anyhow::anyhow!(
                "The request was blocked by the provider's content filter"
            )),
            ProviderError::ApiError(msg) | ProviderError::NetworkError(msg) => {
                AppError::BadGateway(msg)
            }
        }
    }
}

/// Reason why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Complete,
    Length,
    ContentFilter,
}

impl FinishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Complete => "complete",
            FinishReason::Length => "length",
            FinishReason::ContentFilter => "content_filter",
        }
    }
}

/// Result of a provider call.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub text: String,
    pub input_tokens: i32,
    pub output_tokens: i32,
    pub finish_reason: FinishReason,
}

/// Generation parameters for AI requests.
#[derive(Debug, Clone, Default)]
pub struct GenerationParams {
    /// Temperature (0.0 - 2.0).
    pub temperature: Option<f32>,

    /// Maximum output tokens.
    pub max_tokens: Option<i32>,
}

/// A prior turn of the conversation sent as context.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub system_prompt: Option<String>,
    pub history: Vec<ChatTurn>,
    pub prompt: String,
    pub params: GenerationParams,
}

/// Trait for text generation providers (e.g., Gemini).
#[async_trait]
pub trait TextProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn model(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest)
        -> Result<ProviderResponse, ProviderError>;

    async fn health_check(&self) -> Result<(), ProviderError>;
}

/// Build the provider selected by configuration.
pub fn from_config(config: &AiConfig) -> Result<Arc<dyn TextProvider>, AppError> {
    match config.provider {
        AiProviderKind::Gemini => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!("GOOGLE_API_KEY is not set"))
            })?;
            let provider = gemini::GeminiTextProvider::new(gemini::GeminiConfig {
                api_key,
                model: config.text_model.clone(),
            })?;
            Ok(Arc::new(provider))
        }
        AiProviderKind::Mock => Ok(Arc::new(mock::MockTextProvider::new(true))),
    }
}
