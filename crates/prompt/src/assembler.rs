//! Persona-conditioned prompt assembly.

use crate::loader::{list_persona_overrides, load_persona_override, override_path};
use crate::persona::Persona;
use crate::types::{PromptMetadata, RoleSource, StructuredPrompt};
use handlebars::Handlebars;
use nexus_core::{AppError, AppResult};
use std::collections::HashMap;
use std::path::Path;

/// Sentence the generator must answer with when the context lacks the answer.
pub const FALLBACK_ANSWER: &str = "Information not found in internal docs";

const SYSTEM_TEMPLATE_NAME: &str = "system";

const SYSTEM_TEMPLATE: &str = "{{role}}\n\
Task: Answer the query using ONLY the provided context.\n\
Constraints:\n\
- If the answer is not in the context, say '{{fallback}}'.\n\
- Use technical formatting (code blocks) where appropriate.\n\
- Be concise and actionable.\n\
\n\
Context:\n\
{{context}}";

/// Builds the (system, user) prompt pair for a persona.
///
/// Holds no per-query state; one assembler can serve any number of queries
/// and personas.
pub struct PromptAssembler {
    registry: Handlebars<'static>,
    overrides: HashMap<Persona, (String, String)>,
}

impl PromptAssembler {
    /// Assembler using only the built-in role descriptions.
    pub fn new() -> AppResult<Self> {
        let mut registry = Handlebars::new();

        // Plain text, not HTML
        registry.register_escape_fn(handlebars::no_escape);

        registry
            .register_template_string(SYSTEM_TEMPLATE_NAME, SYSTEM_TEMPLATE)
            .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

        Ok(Self {
            registry,
            overrides: HashMap::new(),
        })
    }

    /// Assembler that applies any role overrides found in `personas_dir`.
    pub fn with_overrides_from(personas_dir: &Path) -> AppResult<Self> {
        let mut assembler = Self::new()?;

        for persona in list_persona_overrides(personas_dir)? {
            if let Some(def) = load_persona_override(personas_dir, persona)? {
                let path = override_path(personas_dir, persona);
                assembler
                    .overrides
                    .insert(persona, (def.role.trim().to_string(), path.display().to_string()));
            }
        }

        Ok(assembler)
    }

    /// Role description in effect for `persona`.
    pub fn role_for(&self, persona: Persona) -> &str {
        self.overrides
            .get(&persona)
            .map(|(role, _)| role.as_str())
            .unwrap_or_else(|| persona.default_role())
    }

    /// Assemble the prompt for one query.
    ///
    /// The system part carries role, task, constraints and `context`; the user
    /// part is `question` unchanged. An empty context still yields a complete
    /// prompt so the fallback instruction reaches the generator.
    pub fn assemble(
        &self,
        persona: Persona,
        context: &str,
        question: &str,
    ) -> AppResult<StructuredPrompt> {
        let role_source = match self.overrides.get(&persona) {
            Some((_, path)) => RoleSource::Override { path: path.clone() },
            None => RoleSource::BuiltIn,
        };

        let data = serde_json::json!({
            "role": self.role_for(persona),
            "fallback": FALLBACK_ANSWER,
            "context": context,
        });

        let system = self
            .registry
            .render(SYSTEM_TEMPLATE_NAME, &data)
            .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

        tracing::debug!(
            persona = %persona,
            context_chars = context.chars().count(),
            "Assembled prompt"
        );

        Ok(StructuredPrompt {
            system,
            user: question.to_string(),
            metadata: PromptMetadata {
                persona,
                role_source,
                context_chars: context.chars().count(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_engineering_prompt_layout() {
        let assembler = PromptAssembler::new().unwrap();
        let prompt = assembler
            .assemble(Persona::Engineering, "ctx line", "What is X?")
            .unwrap();

        let expected = "You are a Senior Backend Engineer. Focus on API specs, implementation details, and architecture.\n\
Task: Answer the query using ONLY the provided context.\n\
Constraints:\n\
- If the answer is not in the context, say 'Information not found in internal docs'.\n\
- Use technical formatting (code blocks) where appropriate.\n\
- Be concise and actionable.\n\
\n\
Context:\n\
ctx line";
        assert_eq!(prompt.system, expected);
        assert_eq!(prompt.user, "What is X?");
        assert_eq!(prompt.metadata.role_source, RoleSource::BuiltIn);
    }

    #[test]
    fn test_every_persona_keeps_fallback() {
        let assembler = PromptAssembler::new().unwrap();
        for persona in Persona::all() {
            let prompt = assembler.assemble(*persona, "", "q").unwrap();
            assert!(prompt.system.starts_with(persona.default_role()));
            assert!(prompt.system.contains(FALLBACK_ANSWER));
            assert!(prompt.system.ends_with("Context:\n"));
        }
    }

    #[test]
    fn test_context_is_not_escaped() {
        let assembler = PromptAssembler::new().unwrap();
        let context = "if a < b && c > d { \"quote\" }";
        let prompt = assembler.assemble(Persona::Ops, context, "q").unwrap();
        assert!(prompt.system.ends_with(context));
    }

    #[test]
    fn test_question_is_not_templated() {
        let assembler = PromptAssembler::new().unwrap();
        let prompt = assembler
            .assemble(Persona::Product, "ctx", "What does {{role}} mean?")
            .unwrap();
        assert_eq!(prompt.user, "What does {{role}} mean?");
    }

    #[test]
    fn test_override_replaces_role_only() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("ops.yml"),
            "apiVersion: \"1.0\"\npersona: ops\nrole: You are the payments on-call.\n",
        )
        .unwrap();

        let assembler = PromptAssembler::with_overrides_from(temp_dir.path()).unwrap();
        let prompt = assembler.assemble(Persona::Ops, "ctx", "q").unwrap();

        assert!(prompt.system.starts_with("You are the payments on-call.\n"));
        assert!(prompt.system.contains(FALLBACK_ANSWER));
        assert!(matches!(
            prompt.metadata.role_source,
            RoleSource::Override { .. }
        ));
        assert_eq!(
            assembler.role_for(Persona::Product),
            Persona::Product.default_role()
        );
    }

    #[test]
    fn test_unrelated_files_in_personas_dir_are_ignored() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("marketing.yml"), "not: a persona").unwrap();
        fs::write(temp_dir.path().join("README.txt"), "notes").unwrap();

        let assembler = PromptAssembler::with_overrides_from(temp_dir.path()).unwrap();
        for persona in Persona::all() {
            assert_eq!(assembler.role_for(*persona), persona.default_role());
        }
    }

    #[test]
    fn test_missing_personas_dir_uses_built_in_roles() {
        let temp_dir = TempDir::new().unwrap();
        let assembler =
            PromptAssembler::with_overrides_from(&temp_dir.path().join("personas")).unwrap();
        assert_eq!(assembler.role_for(Persona::Ops), Persona::Ops.default_role());
    }
}
