//! Ask command handler.
//!
//! Resolves the index, binds a chain for the chosen persona and prints the
//! answer.

use clap::{Args, ValueEnum};
use nexus_core::{config::AppConfig, AppError, AppResult};
use nexus_knowledge::{ChainResources, KnowledgeBase, RagChain};
use nexus_prompt::Persona;

/// Printed when the data directory holds no documents.
const EMPTY_KNOWLEDGE_BASE: &str = "Knowledge base is empty";

/// Persona selectable on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PersonaArg {
    #[default]
    Engineering,
    Ops,
    Product,
}

impl From<PersonaArg> for Persona {
    fn from(arg: PersonaArg) -> Self {
        match arg {
            PersonaArg::Engineering => Persona::Engineering,
            PersonaArg::Ops => Persona::Ops,
            PersonaArg::Product => Persona::Product,
        }
    }
}

/// Ask a question against the internal documents
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Persona that shapes the answer
    #[arg(long, value_enum, default_value_t = PersonaArg::Engineering)]
    pub persona: PersonaArg,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the assembled prompt to stderr before answering
    #[arg(long)]
    pub show_prompt: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let question = self.question.trim();
        if question.is_empty() {
            return Err(AppError::Config("Question must not be empty".to_string()));
        }

        let persona = Persona::from(self.persona);
        tracing::info!(persona = %persona, "Executing ask command");

        // An empty corpus is reported before the generator is configured
        let base = KnowledgeBase::from_config(config)?;
        let Some(index) = base.resolve_index().await? else {
            return self.print_empty();
        };

        let resources = ChainResources::from_config(config)?;
        let chain = RagChain::from_index(index, base.embedder(), &resources, persona)?;

        let prepared = chain.prepare(question).await?;
        if self.show_prompt {
            eprintln!("--- system ---\n{}", prepared.prompt.system);
            eprintln!("--- user ---\n{}", prepared.prompt.user);
        }

        let answer = chain.answer_prepared(prepared).await?;

        if self.json {
            let output = serde_json::json!({
                "answer": answer.answer,
                "persona": answer.persona,
                "model": answer.model,
                "provider": config.generation.provider,
                "usage": {
                    "promptTokens": answer.usage.prompt_tokens,
                    "completionTokens": answer.usage.completion_tokens,
                    "totalTokens": answer.usage.total_tokens
                }
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", answer.answer);
            tracing::debug!(
                "Token usage - Prompt: {}, Completion: {}, Total: {}",
                answer.usage.prompt_tokens,
                answer.usage.completion_tokens,
                answer.usage.total_tokens
            );
        }

        Ok(())
    }

    fn print_empty(&self) -> AppResult<()> {
        if self.json {
            let output = serde_json::json!({
                "answer": null,
                "message": EMPTY_KNOWLEDGE_BASE
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", EMPTY_KNOWLEDGE_BASE);
        }
        Ok(())
    }
}
