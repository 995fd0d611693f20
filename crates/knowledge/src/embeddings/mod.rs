//! Embedding capability.
//!
//! The index and retriever only see [`EmbeddingProvider`]; concrete providers
//! are chosen by name through [`create_provider`].

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};
