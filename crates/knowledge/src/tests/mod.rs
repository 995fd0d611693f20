//! Cross-component tests.

mod rag_ranking;
mod support;
