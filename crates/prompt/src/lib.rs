//! Prompt system for Nexus.
//!
//! This crate turns a persona, retrieved context and a question into the
//! two-part prompt sent to the generator:
//! - Closed [`Persona`] set with built-in role descriptions
//! - Handlebars rendering of the grounded-answer system template
//! - Optional per-persona role overrides loaded from YAML

pub mod assembler;
pub mod loader;
pub mod persona;
pub mod types;

// Re-export main types
pub use assembler::{PromptAssembler, FALLBACK_ANSWER};
pub use loader::{list_persona_overrides, load_persona_override};
pub use persona::Persona;
pub use types::{PersonaDefinition, PromptMetadata, RoleSource, StructuredPrompt};
