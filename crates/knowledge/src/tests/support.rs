//! Shared fixtures: a small corpus, an offline knowledge base and a
//! recording generator.

use crate::documents::DocumentSource;
use crate::embeddings::providers::TrigramProvider;
use crate::embeddings::EmbeddingProvider;
use crate::rag::{ChainResources, GenerationOptions};
use crate::store::IndexStore;
use crate::{Chunker, KnowledgeBase};
use nexus_core::{AppError, AppResult};
use nexus_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use nexus_prompt::PromptAssembler;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const API_SPEC: &str = "Payments API v2\n\n\
Authentication uses a bearer token in the Authorization header.\n\n\
The standard tier rate limit is 100 req/min per API key. \
Requests above the limit receive HTTP 429 with a Retry-After header.";

pub const RUNBOOK: &str = "Payment worker runbook\n\n\
If the payment worker crashes, restart it with systemctl restart payment-worker \
and tail the logs in /var/log/payments/worker.log.";

pub const ROADMAP: &str = "Product roadmap\n\n\
The loyalty program rewards customers with points for every purchase. \
Points expire after twelve months.";

pub fn data_dir(workspace: &Path) -> PathBuf {
    workspace.join("data")
}

pub fn write_doc(workspace: &Path, name: &str, text: &str) {
    let dir = data_dir(workspace);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(name), text).unwrap();
}

pub fn write_corpus(workspace: &Path) {
    write_doc(workspace, "api_specs.txt", API_SPEC);
    write_doc(workspace, "runbook.txt", RUNBOOK);
    write_doc(workspace, "roadmap.txt", ROADMAP);
}

pub fn knowledge_base_with(workspace: &Path, embedder: Arc<dyn EmbeddingProvider>) -> KnowledgeBase {
    let store = IndexStore::new(
        workspace.join(".nexus/index"),
        Chunker::new(1000, 200).unwrap(),
        embedder,
    )
    .with_retry_delay(Duration::from_millis(20));

    KnowledgeBase::new(
        DocumentSource::new(data_dir(workspace), vec!["txt".to_string()]),
        store,
    )
}

pub fn knowledge_base(workspace: &Path) -> KnowledgeBase {
    knowledge_base_with(workspace, Arc::new(TrigramProvider::new(384)))
}

pub fn resources(generator: Arc<RecordingLlm>) -> ChainResources {
    ChainResources::new(
        Arc::new(PromptAssembler::new().unwrap()),
        generator,
        GenerationOptions {
            model: "test-model".to_string(),
            temperature: 0.0,
            max_tokens: Some(256),
        },
    )
}

/// Generator that records every request and replies with a fixed text.
pub struct RecordingLlm {
    reply: String,
    requests: Mutex<Vec<LlmRequest>>,
}

impl RecordingLlm {
    pub fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for RecordingLlm {
    fn provider_name(&self) -> &str {
        "recording"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(LlmResponse {
            content: self.reply.clone(),
            model: request.model.clone(),
            usage: LlmUsage::new(10, 5),
        })
    }
}

/// Embedder that reports the trigram identity but always fails.
#[derive(Debug)]
pub struct FailingEmbedder {
    dimensions: usize,
}

impl FailingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Err(AppError::Embedding("quota exceeded".to_string()))
    }
}
