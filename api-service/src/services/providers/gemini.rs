//! Gemini AI provider implementation.
//!
//! Implements text generation using Google's Gemini `generateContent` API.

use super::{
    FinishReason, GenerationParams, GenerationRequest, ProviderError, ProviderResponse,
    TextProvider,
};
use crate::models::MessageRole;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

/// Gemini API base URL.
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Header carrying the API key. The key never goes into the URL, so it cannot
/// leak through transport error messages.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini provider configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
}

/// Gemini text provider.
pub struct GeminiTextProvider {
    config: GeminiConfig,
    client: Client,
    base_url: String,
}

impl GeminiTextProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            config,
            client,
            base_url: GEMINI_API_BASE.to_string(),
        })
    }

    fn model_url(&self) -> String {
        format!("{}/models/{}", self.base_url, self.config.model)
    }

    /// Build the API URL for the given model and method.
    fn api_url(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, self.config.model, method)
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(API_KEY_HEADER, &self.config.api_key)
    }

    fn build_generation_config(params: &GenerationParams) -> Option<GenerationConfig> {
        if params.temperature.is_none() && params.max_tokens.is_none() {
            return None;
        }
        Some(GenerationConfig {
            temperature: params.temperature,
            max_output_tokens: params.max_tokens,
        })
    }

    fn build_request(request: &GenerationRequest) -> GenerateContentRequest {
        let mut contents: Vec<Content> = request
            .history
            .iter()
            .map(|turn| Content {
                role: Some(gemini_role(turn.role).to_string()),
                parts: vec![ContentPart {
                    text: turn.content.clone(),
                }],
            })
            .collect();

        contents.push(Content {
            role: Some("user".to_string()),
            parts: vec![ContentPart {
                text: request.prompt.clone(),
            }],
        });

        GenerateContentRequest {
            contents,
            system_instruction: request.system_prompt.as_ref().map(|prompt| Content {
                role: None,
                parts: vec![ContentPart {
                    text: prompt.clone(),
                }],
            }),
            generation_config: Self::build_generation_config(&request.params),
        }
    }
}

fn gemini_role(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::Assistant => "model",
    }
}

fn network_failure(err: reqwest::Error) -> ProviderError {
    ProviderError::NetworkError(err.without_url().to_string())
}

async fn api_failure(response: reqwest::Response) -> ProviderError {
    let status = response.status();
    if status.as_u16() == 429 {
        return ProviderError::RateLimited;
    }
    let error_text = response.text().await.unwrap_or_default();
    ProviderError::ApiError(format!("Gemini API error {}: {}", status, error_text))
}

#[async_trait]
impl TextProvider for GeminiTextProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        let body = Self::build_request(request);

        tracing::debug!(
            model = %self.config.model,
            prompt_len = request.prompt.len(),
            history_len = request.history.len(),
            "Sending request to Gemini API"
        );

        let response = self
            .request(Method::POST, self.api_url("generateContent"))
            .json(&body)
            .send()
            .await
            .map_err(network_failure)?;

        if !response.status().is_success() {
            return Err(api_failure(response).await);
        }

        let api_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ApiError(format!("Failed to parse response: {}", e)))?;

        let candidate = api_response.candidates.first();

        let finish_reason = match candidate.and_then(|c| c.finish_reason.as_deref()) {
            Some("MAX_TOKENS") => FinishReason::Length,
            Some("SAFETY") => FinishReason::ContentFilter,
            _ => FinishReason::Complete,
        };

        if finish_reason == FinishReason::ContentFilter {
            return Err(ProviderError::ContentFiltered);
        }

        let text = candidate
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<String>()
            })
            .unwrap_or_default();

        let usage = api_response.usage_metadata.unwrap_or_default();

        Ok(ProviderResponse {
            text,
            input_tokens: usage.prompt_token_count.unwrap_or(0),
            output_tokens: usage.candidates_token_count.unwrap_or(0),
            finish_reason,
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        let response = self
            .request(Method::GET, self.model_url())
            .send()
            .await
            .map_err(network_failure)?;

        if !response.status().is_success() {
            return Err(api_failure(response).await);
        }
        Ok(())
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<i32>,
    candidates_token_count: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::ChatTurn;

    const SECRET: &str = "SUPER-SECRET-KEY";

    fn provider_at(base_url: &str) -> GeminiTextProvider {
        let mut provider = GeminiTextProvider::new(GeminiConfig {
            api_key: SECRET.into(),
            model: "gemini-2.0-flash".into(),
        })
        .unwrap();
        provider.base_url = base_url.to_string();
        provider
    }

    #[test]
    fn api_key_travels_in_header_not_url() {
        let provider = provider_at(GEMINI_API_BASE);

        let request = provider
            .request(Method::POST, provider.api_url("generateContent"))
            .build()
            .unwrap();

        assert!(!request.url().as_str().contains(SECRET));
        assert!(request.url().query().is_none());
        assert_eq!(request.headers()[API_KEY_HEADER], SECRET);
    }

    #[tokio::test]
    async fn transport_errors_do_not_expose_api_key() {
        // Nothing listens on port 1, so the connect fails.
        let provider = provider_at("http://127.0.0.1:1/v1beta");

        let health = provider.health_check().await.unwrap_err();
        assert!(matches!(health, ProviderError::NetworkError(_)));

        let request = GenerationRequest {
            system_prompt: None,
            history: Vec::new(),
            prompt: "Hi".into(),
            params: GenerationParams {
                temperature: None,
                max_tokens: None,
            },
        };
        let generate = provider.generate(&request).await.unwrap_err();

        for err in [health, generate] {
            assert!(!err.to_string().contains(SECRET));
            assert!(!err.to_string().contains("127.0.0.1"));
            let body = format!("{:?}", AppError::from(err));
            assert!(!body.contains(SECRET));
        }
    }

    #[test]
    fn request_carries_history_and_system_prompt() {
        let request = GenerationRequest {
            system_prompt: Some("You are a tutor".into()),
            history: vec![
                ChatTurn {
                    role: MessageRole::User,
                    content: "What is 2+2?".into(),
                },
                ChatTurn {
                    role: MessageRole::Assistant,
                    content: "4".into(),
                },
            ],
            prompt: "And 3+3?".into(),
            params: GenerationParams {
                temperature: Some(0.2),
                max_tokens: None,
            },
        };

        let body = serde_json::to_value(GeminiTextProvider::build_request(&request)).unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are a tutor");
        assert_eq!(body["contents"].as_array().unwrap().len(), 3);
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "And 3+3?");
        assert!((body["generationConfig"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
        assert!(body["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn parses_response_with_usage() {
        let raw = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello"}, {"text": " there"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 7, "candidatesTokenCount": 2}
        }"#;

        let parsed: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let usage = parsed.usage_metadata.unwrap();
        assert_eq!(usage.prompt_token_count, Some(7));
        assert_eq!(parsed.candidates[0].content.as_ref().unwrap().parts.len(), 2);
    }
}
