use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateRequest {
    #[validate(length(min = 1, max = 32000, message = "Prompt must be 1-32000 characters"))]
    pub prompt: String,

    /// Continue an existing session: its history is sent as context and the
    /// exchange is appended to it.
    pub session_id: Option<String>,

    #[validate(range(min = 0.0, max = 2.0, message = "Temperature must be between 0 and 2"))]
    pub temperature: Option<f32>,

    #[validate(range(min = 1, max = 8192, message = "max_tokens must be between 1 and 8192"))]
    pub max_tokens: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
    pub finish_reason: String,
    pub input_tokens: i32,
    pub output_tokens: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProviderStatusResponse {
    pub provider: String,
    pub model: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
