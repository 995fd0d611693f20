//! In-memory vector index.
//!
//! A `VectorIndex` is only ever produced by [`IndexStore`](crate::store::IndexStore)
//! from a completed build, so it always holds at least one entry. An empty
//! corpus is represented by the absence of an index (`None`), never by an
//! empty one.

use crate::types::{IndexEntry, IndexManifest, ScoredEntry};
use nexus_core::{AppError, AppResult};

/// All entries of one build plus the manifest describing it.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    manifest: IndexManifest,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub(crate) fn new(manifest: IndexManifest, entries: Vec<IndexEntry>) -> Self {
        Self { manifest, entries }
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.manifest.dimensions
    }

    /// The `k` entries most similar to `vector`, best first.
    ///
    /// Ties keep insertion order. Returns `min(k, len)` results.
    ///
    /// # Errors
    /// `AppError::Index` if `vector` does not have the index dimension.
    pub fn query(&self, vector: &[f32], k: usize) -> AppResult<Vec<ScoredEntry>> {
        if vector.len() != self.manifest.dimensions {
            return Err(AppError::Index(format!(
                "Query vector has {} dimensions, index expects {}",
                vector.len(),
                self.manifest.dimensions
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            // + 0.0 folds -0.0 into 0.0 so they tie under total_cmp
            .map(|(i, entry)| (i, cosine_similarity(vector, &entry.embedding) + 0.0))
            .collect();

        // Stable sort: equal scores stay in insertion order, NaN ranks last
        scored.sort_by(|a, b| {
            a.1.is_nan()
                .cmp(&b.1.is_nan())
                .then_with(|| b.1.total_cmp(&a.1))
        });
        scored.truncate(k);

        let results: Vec<ScoredEntry> = scored
            .into_iter()
            .map(|(i, score)| ScoredEntry {
                chunk: self.entries[i].chunk.clone(),
                score,
            })
            .collect();

        tracing::debug!(
            "Retrieved {} entries (requested top-{}, scores: {:?})",
            results.len(),
            k,
            results.iter().map(|r| r.score).collect::<Vec<_>>()
        );

        Ok(results)
    }
}

/// Cosine similarity; zero when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
