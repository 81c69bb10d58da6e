use crate::dtos::{GenerateRequest, GenerateResponse, ProviderStatusResponse};
use crate::models::{MessageRole, SessionExchange, SessionMessage};
use crate::services::providers::{ChatTurn, GenerationParams, GenerationRequest};
use crate::startup::AppState;
use crate::utils::ValidatedJson;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use service_core::error::AppError;

/// Most recent session messages sent to the provider as context.
const MAX_HISTORY_MESSAGES: usize = 50;

/// Routes mounted under `/api/ai`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate))
        .route("/status", get(provider_status))
}

pub async fn generate(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let store = state.store().await?;

    let session = match &req.session_id {
        Some(session_id) => Some(store.find_session(session_id).await?.ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Session {} not found", session_id))
        })?),
        None => None,
    };

    let (system_prompt, history) = match &session {
        Some(session) => {
            let skip = session.messages.len().saturating_sub(MAX_HISTORY_MESSAGES);
            let history = session.messages[skip..]
                .iter()
                .map(|message| ChatTurn {
                    role: message.role,
                    content: message.content.clone(),
                })
                .collect();
            (session.system_prompt.clone(), history)
        }
        None => (None, Vec::new()),
    };

    let request = GenerationRequest {
        system_prompt,
        history,
        prompt: req.prompt,
        params: GenerationParams {
            temperature: req.temperature,
            max_tokens: req.max_tokens,
        },
    };

    let provider = &state.text_provider;
    let response = provider.generate(&request).await.map_err(|e| {
        tracing::warn!(provider = provider.name(), error = %e, "Text generation failed");
        AppError::from(e)
    })?;

    if let Some(session) = &session {
        let exchange = SessionExchange {
            prompt: SessionMessage::new(MessageRole::User, request.prompt.clone()),
            reply: SessionMessage::new(MessageRole::Assistant, response.text.clone()),
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
        };
        if !store.append_exchange(&session.session_id, &exchange).await? {
            // Deleted between lookup and append.
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Session {} not found",
                session.session_id
            )));
        }
    }

    tracing::info!(
        provider = provider.name(),
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        "Generated text"
    );

    Ok(Json(GenerateResponse {
        text: response.text,
        provider: provider.name().to_string(),
        model: provider.model().to_string(),
        finish_reason: response.finish_reason.as_str().to_string(),
        input_tokens: response.input_tokens,
        output_tokens: response.output_tokens,
        session_id: req.session_id,
    }))
}

pub async fn provider_status(State(state): State<AppState>) -> Json<ProviderStatusResponse> {
    let provider = &state.text_provider;
    let health = provider.health_check().await;

    Json(ProviderStatusResponse {
        provider: provider.name().to_string(),
        model: provider.model().to_string(),
        available: health.is_ok(),
        error: health.err().map(|e| e.to_string()),
    })
}
