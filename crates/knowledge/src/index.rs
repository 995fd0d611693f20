//! SQLite persistence for the vector index.
//!
//! One file holds a single-row `manifest` table and the `entries` table.
//! Vectors are stored as little-endian `f32` blobs. A build is written in one
//! transaction, so readers see either a complete build or none.

use crate::types::{Chunk, IndexEntry, IndexManifest};
use chrono::{DateTime, Utc};
use nexus_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Open (or create) the index database and ensure the schema exists.
pub fn init_index(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Index(format!("Failed to create index directory: {}", e)))?;
    }

    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Index(format!("Failed to open SQLite index: {}", e)))?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS manifest (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            embedder TEXT NOT NULL,
            dimensions INTEGER NOT NULL,
            corpus_fingerprint TEXT NOT NULL,
            chunk_size INTEGER NOT NULL,
            chunk_overlap INTEGER NOT NULL,
            document_count INTEGER NOT NULL,
            entry_count INTEGER NOT NULL,
            build_id TEXT NOT NULL,
            built_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS entries (
            position INTEGER PRIMARY KEY,
            source_id TEXT NOT NULL,
            sequence_index INTEGER NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_entries_source ON entries(source_id);
        "#,
    )
    .map_err(|e| AppError::Index(format!("Failed to create tables: {}", e)))?;

    tracing::debug!("Initialized SQLite index at {:?}", db_path);
    Ok(conn)
}

/// Replace the stored build with `manifest` and `entries` in one transaction.
pub fn write_index(
    conn: &mut Connection,
    manifest: &IndexManifest,
    entries: &[IndexEntry],
) -> AppResult<()> {
    let tx = conn
        .transaction()
        .map_err(|e| AppError::Index(format!("Failed to begin transaction: {}", e)))?;

    tx.execute("DELETE FROM entries", [])
        .map_err(|e| AppError::Index(format!("Failed to delete entries: {}", e)))?;
    tx.execute("DELETE FROM manifest", [])
        .map_err(|e| AppError::Index(format!("Failed to delete manifest: {}", e)))?;

    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO entries (position, source_id, sequence_index, text, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .map_err(|e| AppError::Index(format!("Failed to prepare insert: {}", e)))?;

        for (position, entry) in entries.iter().enumerate() {
            stmt.execute(params![
                position as i64,
                entry.chunk.source_id,
                entry.chunk.sequence_index as i64,
                entry.chunk.text,
                embedding_to_bytes(&entry.embedding),
            ])
            .map_err(|e| AppError::Index(format!("Failed to insert entry: {}", e)))?;
        }
    }

    tx.execute(
        "INSERT INTO manifest (id, embedder, dimensions, corpus_fingerprint, chunk_size,
             chunk_overlap, document_count, entry_count, build_id, built_at)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            manifest.embedder,
            manifest.dimensions as i64,
            manifest.corpus_fingerprint,
            manifest.chunk_size as i64,
            manifest.chunk_overlap as i64,
            manifest.document_count as i64,
            manifest.entry_count as i64,
            manifest.build_id,
            manifest.built_at.to_rfc3339(),
        ],
    )
    .map_err(|e| AppError::Index(format!("Failed to write manifest: {}", e)))?;

    tx.commit()
        .map_err(|e| AppError::Index(format!("Failed to commit index: {}", e)))?;

    tracing::debug!("Persisted {} entries (build {})", entries.len(), manifest.build_id);
    Ok(())
}

/// Manifest of the stored build, if a build was ever committed.
pub fn read_manifest(conn: &Connection) -> AppResult<Option<IndexManifest>> {
    let row = conn
        .query_row(
            "SELECT embedder, dimensions, corpus_fingerprint, chunk_size, chunk_overlap,
                    document_count, entry_count, build_id, built_at
             FROM manifest WHERE id = 1",
            [],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, i64>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, String>(8)?,
                ))
            },
        )
        .optional()
        .map_err(|e| AppError::Index(format!("Failed to read manifest: {}", e)))?;

    let Some((
        embedder,
        dimensions,
        corpus_fingerprint,
        chunk_size,
        chunk_overlap,
        document_count,
        entry_count,
        build_id,
        built_at,
    )) = row
    else {
        return Ok(None);
    };

    let built_at = DateTime::parse_from_rfc3339(&built_at)
        .map_err(|e| AppError::Index(format!("Invalid build timestamp '{}': {}", built_at, e)))?
        .with_timezone(&Utc);

    Ok(Some(IndexManifest {
        embedder,
        dimensions: dimensions as usize,
        corpus_fingerprint,
        chunk_size: chunk_size as usize,
        chunk_overlap: chunk_overlap as usize,
        document_count: document_count as usize,
        entry_count: entry_count as usize,
        build_id,
        built_at,
    }))
}

/// All stored entries in insertion order.
pub fn read_entries(conn: &Connection) -> AppResult<Vec<IndexEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT source_id, sequence_index, text, embedding FROM entries ORDER BY position",
        )
        .map_err(|e| AppError::Index(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Vec<u8>>(3)?,
            ))
        })
        .map_err(|e| AppError::Index(format!("Failed to query entries: {}", e)))?;

    let mut entries = Vec::new();
    for row in rows {
        let (source_id, sequence_index, text, blob) =
            row.map_err(|e| AppError::Index(format!("Failed to read entry: {}", e)))?;

        entries.push(IndexEntry {
            chunk: Chunk {
                text,
                source_id,
                sequence_index: sequence_index as u32,
            },
            embedding: bytes_to_embedding(&blob)?,
        });
    }

    Ok(entries)
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Index(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}
