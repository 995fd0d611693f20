//! Knowledge base for Nexus.
//!
//! Local-first RAG over a flat directory of text documents: chunking,
//! embedding, a persisted SQLite vector index, top-k retrieval and the
//! persona-conditioned answer chain.

pub mod chunker;
pub mod documents;
pub mod embeddings;
pub mod index;
pub mod rag;
pub mod retriever;
pub mod store;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use chunker::Chunker;
pub use documents::{corpus_fingerprint, list_documents, DocumentSource};
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use rag::{ChainResources, GenerationOptions, PreparedQuery, RagAnswer, RagChain};
pub use retriever::{Retriever, TOP_K};
pub use store::IndexStore;
pub use types::{
    Chunk, Document, IndexEntry, IndexManifest, IndexStatus, RetrievalResult, ScoredEntry,
};
pub use vector_index::VectorIndex;

use nexus_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;

/// The corpus on disk together with the store that indexes it.
pub struct KnowledgeBase {
    source: DocumentSource,
    store: IndexStore,
}

impl KnowledgeBase {
    pub fn new(source: DocumentSource, store: IndexStore) -> Self {
        Self { source, store }
    }

    /// Wire documents, chunker, embedder and store from configuration.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let chunker = Chunker::new(config.index.chunk_size, config.index.chunk_overlap)?;
        let embedder = create_provider(&EmbeddingConfig::from(&config.embedding))?;

        Ok(Self::new(
            DocumentSource::new(config.documents_dir(), config.documents.extensions.clone()),
            IndexStore::new(config.index_dir(), chunker, embedder),
        ))
    }

    pub fn source(&self) -> &DocumentSource {
        &self.source
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    pub fn embedder(&self) -> Arc<dyn EmbeddingProvider> {
        Arc::clone(self.store.embedder())
    }

    /// Rebuild the index from the documents currently on disk.
    pub async fn rebuild(&self) -> AppResult<Option<VectorIndex>> {
        let documents = self.source.list()?;
        self.store.rebuild(&documents).await
    }

    /// Load the persisted index, rebuilding it when it is missing, stale, or
    /// was built by a different embedder.
    ///
    /// Returns `Ok(None)` only when the corpus is empty.
    pub async fn resolve_index(&self) -> AppResult<Option<VectorIndex>> {
        let documents = self.source.list()?;

        match self.store.load().await {
            Ok(Some(index)) if self.store.matches(index.manifest(), &documents) => {
                return Ok(Some(index));
            }
            Ok(Some(index)) => {
                tracing::warn!(
                    "Documents or chunk settings changed since build {}, rebuilding index",
                    index.manifest().build_id
                );
            }
            Ok(None) => {
                tracing::info!("No persisted index, building one");
            }
            Err(AppError::EmbeddingSpaceMismatch { expected, found }) => {
                tracing::warn!(
                    "Index was built with '{}' but the embedder is '{}', rebuilding index",
                    found,
                    expected
                );
            }
            Err(e) => return Err(e),
        }

        self.store.rebuild(&documents).await
    }

    /// Status of the persisted index against the current documents.
    pub async fn status(&self) -> AppResult<IndexStatus> {
        let documents = self.source.list()?;
        self.store.status(Some(&documents)).await
    }

    /// Delete the persisted index.
    pub async fn clean(&self) -> AppResult<bool> {
        self.store.clean().await
    }
}
