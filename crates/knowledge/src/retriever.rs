//! Top-k retrieval over a built index.

use crate::embeddings::EmbeddingProvider;
use crate::types::RetrievalResult;
use crate::vector_index::VectorIndex;
use nexus_core::{AppError, AppResult};
use std::sync::Arc;

/// Passages retrieved per query.
pub const TOP_K: usize = 3;

/// Separator between retrieved passages in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Embeds a query with the index's own embedder and returns the best passages.
pub struct Retriever {
    index: VectorIndex,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    /// Bind `index` to `embedder`.
    ///
    /// # Errors
    /// `AppError::EmbeddingSpaceMismatch` if `embedder` is not the one the
    /// index was built with.
    pub fn new(index: VectorIndex, embedder: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        let identity = embedder.identity();
        if index.manifest().embedder != identity {
            return Err(AppError::EmbeddingSpaceMismatch {
                expected: identity,
                found: index.manifest().embedder.clone(),
            });
        }
        Ok(Self { index, embedder })
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Retrieve the [`TOP_K`] passages most similar to `query`.
    pub async fn retrieve(&self, query: &str) -> AppResult<RetrievalResult> {
        let vector = self.embedder.embed(query).await?;
        let hits = self.index.query(&vector, TOP_K)?;

        let context = hits
            .iter()
            .map(|hit| hit.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        tracing::info!(
            "Retrieved {} passages (top score: {:.3})",
            hits.len(),
            hits.first().map(|h| h.score).unwrap_or(0.0)
        );

        Ok(RetrievalResult { hits, context })
    }
}
