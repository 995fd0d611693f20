//! Index command handler.
//!
//! Rebuild, inspect and delete the persisted index.

use clap::{Args, Subcommand};
use nexus_core::{config::AppConfig, AppResult};
use nexus_knowledge::{IndexStatus, KnowledgeBase};

/// Manage the persisted index
#[derive(Args, Debug)]
pub struct IndexCommand {
    #[command(subcommand)]
    pub action: IndexAction,
}

#[derive(Subcommand, Debug)]
pub enum IndexAction {
    /// Re-read the documents and rebuild the index
    Rebuild,

    /// Show the persisted index and whether it matches the documents
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete the persisted index
    Clean,
}

impl IndexCommand {
    pub fn name(&self) -> &'static str {
        match self.action {
            IndexAction::Rebuild => "index.rebuild",
            IndexAction::Status { .. } => "index.status",
            IndexAction::Clean => "index.clean",
        }
    }

    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let base = KnowledgeBase::from_config(config)?;

        match self.action {
            IndexAction::Rebuild => rebuild(&base).await,
            IndexAction::Status { json } => status(&base, json).await,
            IndexAction::Clean => clean(&base).await,
        }
    }
}

async fn rebuild(base: &KnowledgeBase) -> AppResult<()> {
    tracing::info!("Rebuilding index from {:?}", base.source().dir());

    match base.rebuild().await? {
        Some(index) => {
            let manifest = index.manifest();
            println!(
                "Indexed {} chunks from {} documents with {} (build {})",
                manifest.entry_count, manifest.document_count, manifest.embedder, manifest.build_id
            );
        }
        None => println!("Knowledge base is empty"),
    }

    Ok(())
}

async fn status(base: &KnowledgeBase, json: bool) -> AppResult<()> {
    let status = base.status().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print!("{}", render_status(&status));
    }

    Ok(())
}

async fn clean(base: &KnowledgeBase) -> AppResult<()> {
    if base.clean().await? {
        println!("Removed index at {}", base.store().db_path().display());
    } else {
        println!("No index to remove");
    }
    Ok(())
}

fn render_status(status: &IndexStatus) -> String {
    let mut out = format!("Index: {}\n", status.path.display());

    if !status.exists {
        out.push_str("State: not built\n");
        return out;
    }

    if status.locked {
        out.push_str("State: rebuild in progress\n");
    }

    match &status.manifest {
        Some(manifest) => {
            out.push_str(&format!("Embedder: {}\n", manifest.embedder));
            out.push_str(&format!(
                "Chunks: {} from {} documents (size {}, overlap {})\n",
                manifest.entry_count,
                manifest.document_count,
                manifest.chunk_size,
                manifest.chunk_overlap
            ));
            out.push_str(&format!(
                "Built: {} (build {})\n",
                manifest.built_at.to_rfc3339(),
                manifest.build_id
            ));
        }
        None if !status.locked => out.push_str("State: incomplete build\n"),
        None => {}
    }

    out.push_str(&format!("Size: {} bytes\n", status.size_bytes));

    if let Some(up_to_date) = status.up_to_date {
        let state = if up_to_date { "yes" } else { "no, run `nexus index rebuild`" };
        out.push_str(&format!("Up to date: {}\n", state));
    }

    out
}
