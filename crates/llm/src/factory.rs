//! LLM provider factory.
//!
//! Builds the generation client named by configuration. Secrets are resolved
//! by the caller and passed in; this module never reads the environment.

use crate::client::LlmClient;
use crate::providers::{GeminiClient, OllamaClient};
use crate::types::ProviderType;
use nexus_core::{AppError, AppResult};
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama", "gemini")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - Optional API key (required by Gemini)
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required key
/// is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown generation provider: {}", provider)))?;
    let base_url = endpoint.unwrap_or(provider_type.default_endpoint());

    match provider_type {
        ProviderType::Ollama => Ok(Arc::new(OllamaClient::with_base_url(base_url))),
        ProviderType::Gemini => {
            let key = api_key
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| {
                    AppError::Config(
                        "Gemini provider requires an API key (set GOOGLE_API_KEY)".to_string(),
                    )
                })?;
            Ok(Arc::new(GeminiClient::with_base_url(base_url, key)))
        }
    }
}
