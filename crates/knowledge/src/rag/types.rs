//! RAG answering types.

use crate::types::RetrievalResult;
use nexus_core::config::GenerationSettings;
use nexus_llm::LlmUsage;
use nexus_prompt::{Persona, StructuredPrompt};
use serde::{Deserialize, Serialize};

/// Sampling parameters passed to the generator on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub model: String,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl From<&GenerationSettings> for GenerationOptions {
    fn from(settings: &GenerationSettings) -> Self {
        Self {
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }
}

/// Retrieval and prompt for one question, before generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparedQuery {
    pub retrieval: RetrievalResult,
    pub prompt: StructuredPrompt,
}

/// Generated answer with the details the CLI reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagAnswer {
    /// Trimmed answer text
    pub answer: String,

    pub persona: Persona,

    /// Model that produced the answer
    pub model: String,

    pub usage: LlmUsage,
}
