//! Mock provider implementation for testing.

use super::{FinishReason, GenerationRequest, ProviderError, ProviderResponse, TextProvider};
use async_trait::async_trait;

pub const MOCK_MODEL: &str = "mock-text";

/// Mock text provider for testing.
pub struct MockTextProvider {
    enabled: bool,
}

impl MockTextProvider {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn model(&self) -> &str {
        MOCK_MODEL
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::NotConfigured(
                "Mock text provider not enabled".to_string(),
            ));
        }

        let context_len: usize = request
            .history
            .iter()
            .map(|turn| turn.content.len())
            .sum::<usize>()
            + request.system_prompt.as_deref().map_or(0, str::len);

        Ok(ProviderResponse {
            text: format!("Mock response for: {}", request.prompt),
            input_tokens: ((request.prompt.len() + context_len) / 4) as i32,
            output_tokens: 10,
            finish_reason: FinishReason::Complete,
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.enabled {
            Ok(())
        } else {
            Err(ProviderError::NotConfigured(
                "Mock text provider not enabled".to_string(),
            ))
        }
    }
}
