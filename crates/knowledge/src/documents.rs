//! Document source.
//!
//! Reads the flat documents directory and fingerprints its contents.

use crate::types::Document;
use nexus_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The documents directory and the extensions read from it.
#[derive(Debug, Clone)]
pub struct DocumentSource {
    dir: PathBuf,
    extensions: Vec<String>,
}

impl DocumentSource {
    pub fn new(dir: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            extensions,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read the current corpus.
    pub fn list(&self) -> AppResult<Vec<Document>> {
        list_documents(&self.dir, &self.extensions)
    }
}

/// Read every matching regular file directly inside `dir`.
///
/// Only files whose extension is in `extensions` (case-insensitive) are read.
/// Results are sorted by file name. A missing directory is created and yields
/// no documents.
pub fn list_documents(dir: &Path, extensions: &[String]) -> AppResult<Vec<Document>> {
    if !dir.exists() {
        tracing::info!("Documents directory {:?} does not exist, creating it", dir);
        std::fs::create_dir_all(dir).map_err(|e| {
            AppError::Config(format!(
                "Failed to create documents directory {:?}: {}",
                dir, e
            ))
        })?;
        return Ok(Vec::new());
    }

    if !dir.is_dir() {
        return Err(AppError::Config(format!(
            "Documents path {:?} is not a directory",
            dir
        )));
    }

    let mut documents = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            AppError::Io(std::io::Error::other(format!(
                "Failed to list documents in {:?}: {}",
                dir, e
            )))
        })?;

        if !entry.file_type().is_file() || !has_extension(entry.path(), extensions) {
            continue;
        }

        let id = entry.file_name().to_string_lossy().to_string();
        let text = std::fs::read_to_string(entry.path()).map_err(|e| {
            AppError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read document {:?}: {}", entry.path(), e),
            ))
        })?;

        tracing::debug!("Loaded document {} ({} chars)", id, text.chars().count());
        documents.push(Document::new(id, entry.path(), text));
    }

    tracing::info!("Loaded {} documents from {:?}", documents.len(), dir);
    Ok(documents)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// SHA-256 fingerprint of a corpus.
///
/// Covers ids and contents in order, with length prefixes so that moving text
/// between documents changes the fingerprint.
pub fn corpus_fingerprint(documents: &[Document]) -> String {
    let mut hasher = Sha256::new();
    for doc in documents {
        hasher.update((doc.id.len() as u64).to_le_bytes());
        hasher.update(doc.id.as_bytes());
        hasher.update((doc.text.len() as u64).to_le_bytes());
        hasher.update(doc.text.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
