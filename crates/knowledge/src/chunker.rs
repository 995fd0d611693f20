//! Text chunking with configurable size and overlap.
//!
//! Sizes are counted in `char`s. Consecutive chunks of one document share
//! exactly `overlap_size` characters, so dropping the first `overlap_size`
//! characters of every chunk after the first and concatenating reproduces the
//! document.

use crate::types::{Chunk, Document};
use nexus_core::{AppError, AppResult};

/// Cut-point separators, highest priority first.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Splits documents into bounded, overlapping chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    max_chunk_size: usize,
    overlap_size: usize,
}

impl Chunker {
    /// Validate parameters once.
    ///
    /// # Errors
    /// `AppError::Config` if `max_chunk_size` is zero or `overlap_size` is not
    /// smaller than `max_chunk_size`.
    pub fn new(max_chunk_size: usize, overlap_size: usize) -> AppResult<Self> {
        if max_chunk_size == 0 {
            return Err(AppError::Config(
                "Chunk size must be greater than 0".to_string(),
            ));
        }
        if overlap_size >= max_chunk_size {
            return Err(AppError::Config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                overlap_size, max_chunk_size
            )));
        }
        Ok(Self {
            max_chunk_size,
            overlap_size,
        })
    }

    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    pub fn overlap_size(&self) -> usize {
        self.overlap_size
    }

    /// Chunk every document, preserving ingestion order.
    pub fn split(&self, documents: &[Document]) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = documents
            .iter()
            .flat_map(|doc| self.split_text(&doc.id, &doc.text))
            .collect();

        tracing::debug!(
            "Chunked {} documents into {} chunks (size: {}, overlap: {})",
            documents.len(),
            chunks.len(),
            self.max_chunk_size,
            self.overlap_size
        );

        chunks
    }

    /// Chunk a single text attributed to `source_id`.
    pub fn split_text(&self, source_id: &str, text: &str) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        let mut chunks = Vec::new();

        if len == 0 {
            return chunks;
        }

        let mut start = 0;
        loop {
            let end = if len - start <= self.max_chunk_size {
                len
            } else {
                self.cut_point(&chars, start)
            };

            chunks.push(Chunk {
                text: chars[start..end].iter().collect(),
                source_id: source_id.to_string(),
                sequence_index: chunks.len() as u32,
            });

            if end == len {
                break;
            }
            start = end - self.overlap_size;
        }

        chunks
    }

    /// End (exclusive) of the chunk starting at `start`.
    ///
    /// Always in `(start + overlap_size, start + max_chunk_size]` so the next
    /// start moves forward.
    fn cut_point(&self, chars: &[char], start: usize) -> usize {
        let lowest = start + self.overlap_size + 1;
        let highest = start + self.max_chunk_size;

        for separator in SEPARATORS {
            let sep: Vec<char> = separator.chars().collect();
            if let Some(end) = last_separator_end(chars, &sep, lowest, highest) {
                return end;
            }
        }

        highest
    }
}

/// Largest `end` in `[lowest, highest]` such that `chars[end - sep.len()..end] == sep`.
fn last_separator_end(chars: &[char], sep: &[char], lowest: usize, highest: usize) -> Option<usize> {
    (lowest.max(sep.len())..=highest)
        .rev()
        .find(|&end| chars[end - sep.len()..end] == *sep)
}
