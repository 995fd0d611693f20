//! Tests for ranking correctness through the persisted index.

use crate::index::{init_index, read_entries, read_manifest, write_index};
use crate::types::{Chunk, IndexEntry, IndexManifest};
use crate::vector_index::VectorIndex;
use chrono::Utc;
use tempfile::NamedTempFile;

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper to create a test entry with embedding.
    fn create_test_entry(seq: u32, text: &str, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry {
            chunk: Chunk {
                text: text.to_string(),
                source_id: "source1.txt".to_string(),
                sequence_index: seq,
            },
            embedding,
        }
    }

    /// Helper to create a normalized embedding.
    fn normalize(v: &[f32]) -> Vec<f32> {
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter().map(|x| x / norm).collect()
        } else {
            v.to_vec()
        }
    }

    /// Persist `entries`, read them back and wrap them in an index.
    fn persisted_index(entries: Vec<IndexEntry>) -> VectorIndex {
        let temp_file = NamedTempFile::new().unwrap();
        let mut conn = init_index(temp_file.path()).unwrap();

        let dimensions = entries[0].embedding.len();
        let manifest = IndexManifest {
            embedder: format!("test/vectors/{}", dimensions),
            dimensions,
            corpus_fingerprint: "fixture".to_string(),
            chunk_size: 1000,
            chunk_overlap: 200,
            document_count: 1,
            entry_count: entries.len(),
            build_id: "fixture-build".to_string(),
            built_at: Utc::now(),
        };
        write_index(&mut conn, &manifest, &entries).unwrap();

        let manifest = read_manifest(&conn).unwrap().unwrap();
        VectorIndex::new(manifest, read_entries(&conn).unwrap())
    }

    #[test]
    fn test_relevant_query_returns_high_scores() {
        let index = persisted_index(vec![
            create_test_entry(
                0,
                "Rust is a systems programming language",
                normalize(&[1.0, 0.5, 0.2, 0.1]),
            ),
            create_test_entry(
                1,
                "Cooking recipes for pasta",
                normalize(&[-0.3, -0.8, 0.4, -0.2]),
            ),
        ]);

        let query_embedding = normalize(&[0.9, 0.4, 0.3, 0.1]);
        let results = index.query(&query_embedding, 5).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0].chunk.sequence_index, 0,
            "Most relevant chunk should be first"
        );
        assert!(
            results[0].score > 0.8,
            "Relevant chunk score should be high: {}",
            results[0].score
        );
        assert!(results[0].score > results[1].score, "Scores should be ordered");
    }

    #[test]
    fn test_scores_are_ordered_descending() {
        let index = persisted_index(vec![
            create_test_entry(0, "Text A", normalize(&[1.0, 0.0, 0.0])),
            create_test_entry(1, "Text B", normalize(&[0.7, 0.7, 0.0])),
            create_test_entry(2, "Text C", normalize(&[0.0, 1.0, 0.0])),
            create_test_entry(3, "Text D", normalize(&[-1.0, 0.0, 0.0])),
        ]);

        let results = index.query(&normalize(&[1.0, 0.0, 0.0]), 10).unwrap();

        for i in 1..results.len() {
            assert!(
                results[i - 1].score >= results[i].score,
                "Scores should be ordered: {} >= {}",
                results[i - 1].score,
                results[i].score
            );
        }

        assert_eq!(results[0].chunk.text, "Text A");
        assert!(
            results[0].score > 0.99,
            "Perfect match should have score near 1.0"
        );
    }

    #[test]
    fn test_negative_similarity_chunks() {
        let index = persisted_index(vec![create_test_entry(
            0,
            "Opposite content",
            normalize(&[-1.0, 0.0, 0.0]),
        )]);

        let results = index.query(&normalize(&[1.0, 0.0, 0.0]), 5).unwrap();

        assert_eq!(results.len(), 1);
        assert!(
            results[0].score > -1.1 && results[0].score < -0.9,
            "Should be close to -1.0"
        );
    }

    #[test]
    fn test_top_k_limit_respected() {
        let entries = (0..10)
            .map(|i| {
                create_test_entry(
                    i,
                    &format!("Text {}", i),
                    normalize(&[(i + 1) as f32 / 10.0, 1.0, 0.0]),
                )
            })
            .collect();
        let index = persisted_index(entries);

        let results = index.query(&normalize(&[1.0, 0.0, 0.0]), 3).unwrap();

        assert_eq!(results.len(), 3, "Should return exactly top_k results");
        assert_eq!(results[0].chunk.text, "Text 9");
    }
}
