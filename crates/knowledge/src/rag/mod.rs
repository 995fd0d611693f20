//! RAG (Retrieval-Augmented Generation) answering.
//!
//! A [`RagChain`] binds one persona to a freshly resolved index and composes
//! retrieval, prompt assembly and generation into a single question → answer
//! call.

pub mod chain;
pub mod types;

pub use chain::{ChainResources, RagChain};
pub use types::{GenerationOptions, PreparedQuery, RagAnswer};
