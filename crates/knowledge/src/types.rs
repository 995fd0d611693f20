//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A source document read from the documents directory.
///
/// Immutable for the duration of a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// File name, unique within the documents directory
    pub id: String,

    /// Full path the text was read from
    pub path: PathBuf,

    /// Raw text
    pub text: String,
}

impl Document {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            text: text.into(),
        }
    }
}

/// A bounded segment of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Segment text, never trimmed
    pub text: String,

    /// Id of the document this chunk came from
    pub source_id: String,

    /// Position of the chunk within its document, starting at 0
    pub sequence_index: u32,
}

/// A chunk persisted together with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// A query hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEntry {
    pub chunk: Chunk,

    /// Cosine similarity to the query vector (-1.0 to 1.0)
    pub score: f32,
}

/// Build metadata persisted alongside the index entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexManifest {
    /// `provider/model/dimensions` of the embedder that produced the vectors
    pub embedder: String,

    /// Vector dimension of every entry
    pub dimensions: usize,

    /// SHA-256 over document ids and contents, in ingestion order
    pub corpus_fingerprint: String,

    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub document_count: usize,
    pub entry_count: usize,

    /// Unique id of the build that wrote this index
    pub build_id: String,

    pub built_at: DateTime<Utc>,
}

/// Snapshot of the persisted index for `nexus index status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStatus {
    /// Path of the SQLite file
    pub path: PathBuf,

    /// Whether the SQLite file exists
    pub exists: bool,

    /// Whether a writer currently holds the lock file
    pub locked: bool,

    /// Manifest of the last completed build, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<IndexManifest>,

    /// Size of the SQLite file in bytes
    pub size_bytes: u64,

    /// Whether the manifest matches the documents currently on disk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub up_to_date: Option<bool>,
}

/// Result of one retrieval.
///
/// Transient: produced per query, never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Retrieved chunks, best first
    pub hits: Vec<ScoredEntry>,

    /// Chunk texts in rank order joined by a blank line
    pub context: String,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}
