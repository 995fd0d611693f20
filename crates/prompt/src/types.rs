//! Prompt types for Nexus.
//!
//! This module defines the domain entities for the prompt system.

use crate::persona::Persona;
use serde::{Deserialize, Serialize};

/// A persona role override loaded from YAML.
///
/// ```yaml
/// apiVersion: "1.0"
/// persona: ops
/// role: You are the on-call SRE for the payments platform.
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaDefinition {
    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Persona this file overrides
    pub persona: Persona,

    /// Replacement role description
    pub role: String,

    /// Optional free-form note for humans
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Where a prompt's role description came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoleSource {
    BuiltIn,
    Override { path: String },
}

/// A fully assembled prompt ready for the generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredPrompt {
    /// System message: role, task, constraints and context
    pub system: String,

    /// User message: the raw question
    pub user: String,

    /// Metadata about the assembled prompt
    pub metadata: PromptMetadata,
}

/// Metadata about an assembled prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMetadata {
    pub persona: Persona,

    #[serde(rename = "roleSource")]
    pub role_source: RoleSource,

    /// Characters of retrieved context embedded in the system message
    #[serde(rename = "contextChars")]
    pub context_chars: usize,
}
