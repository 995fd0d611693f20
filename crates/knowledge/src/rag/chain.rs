//! Retriever → PromptAssembler → Generator composition.

use crate::rag::types::{GenerationOptions, PreparedQuery, RagAnswer};
use crate::embeddings::EmbeddingProvider;
use crate::retriever::Retriever;
use crate::vector_index::VectorIndex;
use crate::KnowledgeBase;
use nexus_core::{AppConfig, AppError, AppResult};
use nexus_llm::{create_client, LlmClient, LlmRequest};
use nexus_prompt::{Persona, PromptAssembler};
use std::sync::Arc;

/// Generation-side collaborators shared by every chain.
pub struct ChainResources {
    pub assembler: Arc<PromptAssembler>,
    pub generator: Arc<dyn LlmClient>,
    pub options: GenerationOptions,
}

impl ChainResources {
    pub fn new(
        assembler: Arc<PromptAssembler>,
        generator: Arc<dyn LlmClient>,
        options: GenerationOptions,
    ) -> Self {
        Self {
            assembler,
            generator,
            options,
        }
    }

    /// Build the assembler (with persona overrides) and generator named by
    /// `config`.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let assembler = PromptAssembler::with_overrides_from(&config.personas_dir())?;

        let api_key = config.resolve_api_key();
        let generator = create_client(
            &config.generation.provider,
            config.generation.endpoint.as_deref(),
            api_key.as_deref(),
        )?;

        Ok(Self::new(
            Arc::new(assembler),
            generator,
            GenerationOptions::from(&config.generation),
        ))
    }
}

/// One persona bound to one resolved index.
///
/// Built per request; nothing is carried over between chains.
pub struct RagChain {
    persona: Persona,
    retriever: Retriever,
    assembler: Arc<PromptAssembler>,
    generator: Arc<dyn LlmClient>,
    options: GenerationOptions,
}

impl RagChain {
    /// Resolve the index and bind a chain for `persona`.
    ///
    /// Returns `Ok(None)` when no index can be obtained because the corpus is
    /// empty.
    pub async fn build(
        base: &KnowledgeBase,
        resources: &ChainResources,
        persona: Persona,
    ) -> AppResult<Option<Self>> {
        let Some(index) = base.resolve_index().await? else {
            tracing::info!("Knowledge base is empty, no chain built");
            return Ok(None);
        };

        Self::from_index(index, base.embedder(), resources, persona).map(Some)
    }

    /// Bind a chain to an already resolved index.
    ///
    /// # Errors
    /// `AppError::EmbeddingSpaceMismatch` if `embedder` did not build `index`.
    pub fn from_index(
        index: VectorIndex,
        embedder: Arc<dyn EmbeddingProvider>,
        resources: &ChainResources,
        persona: Persona,
    ) -> AppResult<Self> {
        let retriever = Retriever::new(index, embedder)?;

        tracing::debug!(
            persona = %persona,
            provider = resources.generator.provider_name(),
            model = %resources.options.model,
            "Built RAG chain"
        );

        Ok(Self {
            persona,
            retriever,
            assembler: Arc::clone(&resources.assembler),
            generator: Arc::clone(&resources.generator),
            options: resources.options.clone(),
        })
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Retrieve context and assemble the prompt without calling the generator.
    pub async fn prepare(&self, question: &str) -> AppResult<PreparedQuery> {
        let retrieval = self.retriever.retrieve(question).await?;
        let prompt = self
            .assembler
            .assemble(self.persona, &retrieval.context, question)?;

        Ok(PreparedQuery { retrieval, prompt })
    }

    /// Answer `question` and report model and usage.
    ///
    /// # Errors
    /// `AppError::Generation` if the generator fails or returns only
    /// whitespace.
    pub async fn answer(&self, question: &str) -> AppResult<RagAnswer> {
        let prepared = self.prepare(question).await?;
        self.answer_prepared(prepared).await
    }

    /// Send an already prepared prompt to the generator.
    pub async fn answer_prepared(&self, prepared: PreparedQuery) -> AppResult<RagAnswer> {
        let mut request = LlmRequest::new(prepared.prompt.user, &self.options.model)
            .with_system(prepared.prompt.system)
            .with_temperature(self.options.temperature);
        if let Some(max_tokens) = self.options.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = self.generator.complete(&request).await?;

        let answer = response.content.trim();
        if answer.is_empty() {
            return Err(AppError::Generation(format!(
                "{} returned an empty answer",
                self.generator.provider_name()
            )));
        }

        tracing::info!(
            persona = %self.persona,
            tokens = response.usage.total_tokens,
            "Generated answer"
        );

        Ok(RagAnswer {
            answer: answer.to_string(),
            persona: self.persona,
            model: response.model,
            usage: response.usage,
        })
    }

    /// Answer `question`, returning only the text.
    pub async fn invoke(&self, question: &str) -> AppResult<String> {
        Ok(self.answer(question).await?.answer)
    }
}
