//! Index lifecycle: rebuild, load, clean and status.
//!
//! Writers are serialized twice: by an in-process `RwLock` (rebuild and clean
//! take it exclusively, load and status share it) and by an `index.lock` file
//! created with `create_new`, which also keeps other processes out. A writer
//! that cannot take the lock file or discard the old index waits once and then
//! gives up with `AppError::IndexWriteConflict`.

use crate::chunker::Chunker;
use crate::documents::corpus_fingerprint;
use crate::embeddings::EmbeddingProvider;
use crate::index::{init_index, read_entries, read_manifest, write_index};
use crate::types::{Document, IndexEntry, IndexManifest, IndexStatus};
use crate::vector_index::VectorIndex;
use chrono::Utc;
use nexus_core::{AppError, AppResult};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// SQLite file inside the index directory.
pub const INDEX_FILE: &str = "index.sqlite";

/// Lock file present while a writer is active.
pub const LOCK_FILE: &str = "index.lock";

/// Wait before the single retry of a blocked write or load.
pub const WRITE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Owner of the persisted index.
pub struct IndexStore {
    dir: PathBuf,
    chunker: Chunker,
    embedder: Arc<dyn EmbeddingProvider>,
    guard: RwLock<()>,
    retry_delay: Duration,
}

impl IndexStore {
    pub fn new(dir: impl Into<PathBuf>, chunker: Chunker, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            dir: dir.into(),
            chunker,
            embedder,
            guard: RwLock::new(()),
            retry_delay: WRITE_RETRY_DELAY,
        }
    }

    /// Override the retry wait (tests use a short one).
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }

    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Rebuild the index from `documents`.
    ///
    /// Returns `Ok(None)` when there is nothing to index; the persisted index
    /// is left as it was in that case. Every chunk is embedded before the old
    /// index is touched, so an embedding failure leaves it intact.
    pub async fn rebuild(&self, documents: &[Document]) -> AppResult<Option<VectorIndex>> {
        if documents.is_empty() {
            tracing::warn!("No documents found, nothing to index");
            return Ok(None);
        }

        let chunks = self.chunker.split(documents);
        if chunks.is_empty() {
            tracing::warn!("Documents produced no chunks, nothing to index");
            return Ok(None);
        }

        tracing::info!(
            "Embedding {} chunks from {} documents using '{}'",
            chunks.len(),
            documents.len(),
            self.embedder.identity()
        );

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(AppError::Embedding(format!(
                "Embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let dimensions = self.embedder.dimensions();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != dimensions) {
            return Err(AppError::Embedding(format!(
                "Embedder returned a {}-dimensional vector, expected {}",
                bad.len(),
                dimensions
            )));
        }

        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexEntry { chunk, embedding })
            .collect();

        let manifest = IndexManifest {
            embedder: self.embedder.identity(),
            dimensions,
            corpus_fingerprint: corpus_fingerprint(documents),
            chunk_size: self.chunker.max_chunk_size(),
            chunk_overlap: self.chunker.overlap_size(),
            document_count: documents.len(),
            entry_count: entries.len(),
            build_id: uuid::Uuid::new_v4().to_string(),
            built_at: Utc::now(),
        };

        let _guard = self.guard.write().await;
        let _lock = self.acquire_lock_file().await?;

        self.discard_with_retry().await?;

        let mut conn = init_index(&self.db_path())?;
        write_index(&mut conn, &manifest, &entries)?;

        tracing::info!(
            "Index rebuilt: {} entries from {} documents (build {})",
            manifest.entry_count,
            manifest.document_count,
            manifest.build_id
        );

        Ok(Some(VectorIndex::new(manifest, entries)))
    }

    /// Open the persisted index without recomputing anything.
    ///
    /// Returns `Ok(None)` if no index exists or it holds no entries.
    ///
    /// # Errors
    /// `AppError::EmbeddingSpaceMismatch` if the index was built by a different
    /// embedder; `AppError::IndexWriteConflict` if a writer is still active
    /// after one wait.
    pub async fn load(&self) -> AppResult<Option<VectorIndex>> {
        let _guard = self.guard.read().await;
        self.wait_for_writer().await?;

        let db_path = self.db_path();
        if !db_path.exists() {
            tracing::debug!("No persisted index at {:?}", db_path);
            return Ok(None);
        }

        let conn = init_index(&db_path)?;
        let Some(manifest) = read_manifest(&conn)? else {
            tracing::debug!("Index at {:?} has no completed build", db_path);
            return Ok(None);
        };

        let current = self.embedder.identity();
        if manifest.embedder != current {
            return Err(AppError::EmbeddingSpaceMismatch {
                expected: current,
                found: manifest.embedder,
            });
        }

        let entries = read_entries(&conn)?;
        if entries.is_empty() {
            return Ok(None);
        }

        if entries.len() != manifest.entry_count {
            return Err(AppError::Index(format!(
                "Index at {:?} is inconsistent: manifest lists {} entries, found {}",
                db_path,
                manifest.entry_count,
                entries.len()
            )));
        }

        tracing::info!(
            "Loaded index: {} entries (build {})",
            entries.len(),
            manifest.build_id
        );

        Ok(Some(VectorIndex::new(manifest, entries)))
    }

    /// Delete the persisted index. Returns whether anything was removed.
    pub async fn clean(&self) -> AppResult<bool> {
        let _guard = self.guard.write().await;
        let existed = self.db_path().exists();

        if existed {
            let _lock = self.acquire_lock_file().await?;
            self.discard_with_retry().await?;
            tracing::info!("Removed index at {:?}", self.db_path());
        }

        Ok(existed)
    }

    /// Describe the persisted index.
    ///
    /// When `documents` is given, `up_to_date` reports whether the index was
    /// built from exactly those documents with the current embedder and chunk
    /// parameters.
    pub async fn status(&self, documents: Option<&[Document]>) -> AppResult<IndexStatus> {
        let _guard = self.guard.read().await;

        let path = self.db_path();
        let exists = path.exists();
        let locked = self.lock_path().exists();

        let manifest = if exists && !locked {
            read_manifest(&init_index(&path)?)?
        } else {
            None
        };

        let size_bytes = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

        let up_to_date = match (documents, &manifest) {
            (Some(docs), Some(m)) => Some(self.matches(m, docs)),
            (Some(_), None) => Some(false),
            (None, _) => None,
        };

        Ok(IndexStatus {
            path,
            exists,
            locked,
            manifest,
            size_bytes,
            up_to_date,
        })
    }

    /// Whether `manifest` describes a build of `documents` with this store's
    /// embedder and chunker.
    pub fn matches(&self, manifest: &IndexManifest, documents: &[Document]) -> bool {
        manifest.embedder == self.embedder.identity()
            && manifest.chunk_size == self.chunker.max_chunk_size()
            && manifest.chunk_overlap == self.chunker.overlap_size()
            && manifest.corpus_fingerprint == corpus_fingerprint(documents)
    }

    async fn acquire_lock_file(&self) -> AppResult<LockFile> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| AppError::Index(format!("Failed to create index directory: {}", e)))?;

        match LockFile::create(&self.lock_path()) {
            Ok(lock) => Ok(lock),
            Err(first) => {
                tracing::warn!(
                    "Index lock {:?} unavailable ({}), retrying in {:?}",
                    self.lock_path(),
                    first,
                    self.retry_delay
                );
                tokio::time::sleep(self.retry_delay).await;
                LockFile::create(&self.lock_path()).map_err(|e| AppError::IndexWriteConflict {
                    path: self.lock_path(),
                    reason: format!("another writer holds the index lock ({})", e),
                })
            }
        }
    }

    async fn wait_for_writer(&self) -> AppResult<()> {
        if !self.lock_path().exists() {
            return Ok(());
        }

        tracing::debug!("Index is being written, waiting {:?}", self.retry_delay);
        tokio::time::sleep(self.retry_delay).await;

        if self.lock_path().exists() {
            return Err(AppError::IndexWriteConflict {
                path: self.lock_path(),
                reason: "a rebuild is still in progress".to_string(),
            });
        }
        Ok(())
    }

    async fn discard_with_retry(&self) -> AppResult<()> {
        match self.discard() {
            Ok(()) => Ok(()),
            Err(first) => {
                tracing::warn!(
                    "Could not remove old index ({}), retrying in {:?}",
                    first,
                    self.retry_delay
                );
                tokio::time::sleep(self.retry_delay).await;
                self.discard().map_err(|e| AppError::IndexWriteConflict {
                    path: self.db_path(),
                    reason: format!("could not remove the previous index ({})", e),
                })
            }
        }
    }

    fn discard(&self) -> std::io::Result<()> {
        let db_path = self.db_path();
        for suffix in ["", "-journal", "-wal", "-shm"] {
            let path = PathBuf::from(format!("{}{}", db_path.display(), suffix));
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!("Removed {:?}", path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// Cross-process writer lock, removed on drop.
#[derive(Debug)]
struct LockFile {
    path: PathBuf,
}

impl LockFile {
    fn create(path: &Path) -> std::io::Result<Self> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        writeln!(file, "pid={}", std::process::id())?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!("Failed to remove index lock {:?}: {}", self.path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use tempfile::TempDir;

    fn store(dir: &Path, dimensions: usize) -> IndexStore {
        IndexStore::new(
            dir.join("index"),
            Chunker::new(200, 40).unwrap(),
            Arc::new(TrigramProvider::new(dimensions)),
        )
        .with_retry_delay(Duration::from_millis(20))
    }

    fn docs() -> Vec<Document> {
        vec![
            Document::new("api.txt", "api.txt", "The standard tier rate limit is 100 req/min."),
            Document::new("runbook.txt", "runbook.txt", "Restart the worker with systemctl restart worker."),
        ]
    }

    #[tokio::test]
    async fn test_empty_corpus_is_none() {
        let temp = TempDir::new().unwrap();
        let store = store(temp.path(), 64);

        assert!(store.rebuild(&[]).await.unwrap().is_none());
        assert!(store.load().await.unwrap().is_none());
        assert!(!store.db_path().exists());
    }

    #[tokio::test]
    async fn test_rebuild_then_load() {
        let temp = TempDir::new().unwrap();
        let store = store(temp.path(), 64);

        let built = store.rebuild(&docs()).await.unwrap().unwrap();
        let loaded = store.load().await.unwrap().unwrap();

        assert_eq!(built.entries(), loaded.entries());
        assert_eq!(built.manifest(), loaded.manifest());
        assert!(!store.lock_path().exists());
    }

    #[tokio::test]
    async fn test_load_rejects_other_embedder() {
        let temp = TempDir::new().unwrap();
        store(temp.path(), 64).rebuild(&docs()).await.unwrap();

        let other = store(temp.path(), 32);
        match other.load().await {
            Err(AppError::EmbeddingSpaceMismatch { expected, found }) => {
                assert_eq!(expected, "trigram/trigram-v1/32");
                assert_eq!(found, "trigram/trigram-v1/64");
            }
            other => panic!("Expected mismatch, got {:?}", other.map(|i| i.map(|i| i.len()))),
        }
    }

    #[tokio::test]
    async fn test_held_lock_is_write_conflict() {
        let temp = TempDir::new().unwrap();
        let store = store(temp.path(), 64);
        std::fs::create_dir_all(store.dir()).unwrap();
        std::fs::write(store.lock_path(), "pid=1").unwrap();

        let result = store.rebuild(&docs()).await;
        assert!(matches!(result, Err(AppError::IndexWriteConflict { .. })));

        let result = store.load().await;
        assert!(matches!(result, Err(AppError::IndexWriteConflict { .. })));

        // A foreign lock is never removed by the loser
        assert!(store.lock_path().exists());
    }

    #[tokio::test]
    async fn test_empty_corpus_keeps_previous_index() {
        let temp = TempDir::new().unwrap();
        let store = store(temp.path(), 64);
        store.rebuild(&docs()).await.unwrap();

        assert!(store.rebuild(&[]).await.unwrap().is_none());
        assert!(store.load().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clean_and_status() {
        let temp = TempDir::new().unwrap();
        let store = store(temp.path(), 64);
        let documents = docs();

        let status = store.status(Some(&documents)).await.unwrap();
        assert!(!status.exists);
        assert_eq!(status.up_to_date, Some(false));

        store.rebuild(&documents).await.unwrap();
        let status = store.status(Some(&documents)).await.unwrap();
        assert!(status.exists);
        assert!(!status.locked);
        assert_eq!(status.up_to_date, Some(true));
        assert_eq!(status.manifest.as_ref().unwrap().document_count, 2);

        let changed = vec![documents[0].clone()];
        assert_eq!(
            store.status(Some(&changed)).await.unwrap().up_to_date,
            Some(false)
        );

        assert!(store.clean().await.unwrap());
        assert!(!store.clean().await.unwrap());
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_undeletable_index_is_write_conflict() {
        let temp = TempDir::new().unwrap();
        let store = store(temp.path(), 64);

        // A directory in place of the SQLite file cannot be removed as a file
        std::fs::create_dir_all(store.db_path().join("occupied")).unwrap();

        match store.rebuild(&docs()).await {
            Err(AppError::IndexWriteConflict { path, .. }) => assert_eq!(path, store.db_path()),
            other => panic!(
                "Expected write conflict, got {:?}",
                other.map(|i| i.map(|i| i.len()))
            ),
        }

        assert!(!store.lock_path().exists());
        assert!(store.db_path().is_dir());
    }
}
