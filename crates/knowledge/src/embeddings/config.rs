//! Embedding configuration types.

use nexus_core::config::EmbeddingSettings;
use serde::{Deserialize, Serialize};

/// Embedding configuration resolved from the application config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "ollama" or "trigram"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Optional custom endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            endpoint: None,
        }
    }
}

impl From<&EmbeddingSettings> for EmbeddingConfig {
    fn from(settings: &EmbeddingSettings) -> Self {
        Self {
            provider: settings.provider.to_lowercase(),
            model: settings.model.clone(),
            dimensions: settings.dimensions,
            endpoint: settings.endpoint.clone(),
        }
    }
}

impl EmbeddingConfig {
    /// Identity string recorded in the index manifest.
    pub fn identity(&self) -> String {
        embedder_identity(&self.provider, &self.model, self.dimensions)
    }
}

/// `provider/model/dimensions`
pub fn embedder_identity(provider: &str, model: &str, dimensions: usize) -> String {
    format!("{}/{}/{}", provider, model, dimensions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "trigram");
        assert_eq!(config.model, "trigram-v1");
        assert_eq!(config.dimensions, 384);
        assert_eq!(config.identity(), "trigram/trigram-v1/384");
    }

    #[test]
    fn test_from_settings() {
        let settings = EmbeddingSettings {
            provider: "Ollama".to_string(),
            model: "all-minilm".to_string(),
            dimensions: 384,
            endpoint: Some("http://gpu-box:11434".to_string()),
        };

        let config = EmbeddingConfig::from(&settings);
        assert_eq!(config.identity(), "ollama/all-minilm/384");
        assert_eq!(config.endpoint.as_deref(), Some("http://gpu-box:11434"));
    }
}
