//! Configuration management for Nexus.
//!
//! Configuration is merged from, in increasing precedence:
//! - Built-in defaults
//! - The workspace config file (`.nexus/config.yaml`, or `NEXUS_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric: relative paths in the config file
//! are resolved against the workspace root.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Embedding providers understood by the knowledge crate.
pub const EMBEDDING_PROVIDERS: [&str; 2] = ["ollama", "trigram"];

/// Generation providers understood by the llm crate.
pub const GENERATION_PROVIDERS: [&str; 2] = ["ollama", "gemini"];

/// Model used when a generation provider is selected without one.
pub fn default_generation_model(provider: &str) -> Option<&'static str> {
    match provider {
        "ollama" => Some("llama3.2"),
        "gemini" => Some("gemini-2.5-flash"),
        _ => None,
    }
}

/// Provider names are matched case-insensitively and stored lowercase.
fn canonical_provider(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .nexus/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Where the plain-text corpus lives
    pub documents: DocumentsConfig,

    /// Persisted index location and chunking parameters
    pub index: IndexConfig,

    /// Embedding capability settings
    pub embedding: EmbeddingSettings,

    /// Generation capability settings
    pub generation: GenerationSettings,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Document source settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentsConfig {
    /// Directory scanned for documents (non-recursive)
    pub path: PathBuf,

    /// File extensions treated as documents
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

/// Index settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory holding `index.sqlite`
    pub path: PathBuf,

    /// Maximum chunk length in characters
    #[serde(rename = "chunkSize", default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[serde(rename = "chunkOverlap", default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

/// Embedding provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Provider name: "ollama" or "trigram"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Optional custom endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Generation provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Provider name: "ollama" or "gemini"
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Optional custom endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    #[serde(rename = "apiKeyEnv", skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(rename = "maxTokens", skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerationSettings {
    /// Apply a provider and model chosen by one configuration layer.
    ///
    /// Switching to another provider without naming a model selects that
    /// provider's default model.
    pub fn select(&mut self, provider: Option<String>, model: Option<String>) {
        if let Some(provider) = provider {
            let provider = canonical_provider(&provider);
            if provider != self.provider && model.is_none() {
                if let Some(default) = default_generation_model(&provider) {
                    self.model = default.to_string();
                }
            }
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }
    }
}

/// Config file layout. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    documents: Option<DocumentsSection>,
    index: Option<IndexSection>,
    embedding: Option<EmbeddingSection>,
    generation: Option<GenerationSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocumentsSection {
    path: Option<PathBuf>,
    extensions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexSection {
    path: Option<PathBuf>,
    #[serde(rename = "chunkSize")]
    chunk_size: Option<usize>,
    #[serde(rename = "chunkOverlap")]
    chunk_overlap: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EmbeddingSection {
    provider: Option<String>,
    model: Option<String>,
    dimensions: Option<usize>,
    endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GenerationSection {
    provider: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
    #[serde(rename = "apiKeyEnv")]
    api_key_env: Option<String>,
    temperature: Option<f32>,
    #[serde(rename = "maxTokens")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

fn default_extensions() -> Vec<String> {
    vec!["txt".to_string()]
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            documents: DocumentsConfig {
                path: PathBuf::from("data"),
                extensions: default_extensions(),
            },
            index: IndexConfig {
                path: PathBuf::from(".nexus/index"),
                chunk_size: default_chunk_size(),
                chunk_overlap: default_chunk_overlap(),
            },
            embedding: EmbeddingSettings {
                provider: "ollama".to_string(),
                model: "all-minilm".to_string(),
                dimensions: 384,
                endpoint: None,
            },
            generation: GenerationSettings {
                provider: "ollama".to_string(), // Local-first default
                model: "llama3.2".to_string(),
                endpoint: None,
                api_key_env: None,
                temperature: 0.0,
                max_tokens: None,
            },
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and environment.
    ///
    /// Environment variables:
    /// - `NEXUS_WORKSPACE`: Override workspace path
    /// - `NEXUS_CONFIG`: Path to config file
    /// - `NEXUS_DATA_DIR`: Document directory
    /// - `NEXUS_PROVIDER` / `NEXUS_MODEL`: Generation provider and model
    /// - `NEXUS_EMBEDDING_PROVIDER` / `NEXUS_EMBEDDING_MODEL`: Embedder
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use nexus_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Documents: {:?}", config.documents_dir());
    /// ```
    pub fn load() -> AppResult<Self> {
        let workspace = std::env::var("NEXUS_WORKSPACE").ok().map(PathBuf::from);
        let config_file = std::env::var("NEXUS_CONFIG").ok().map(PathBuf::from);
        Self::load_from(workspace, config_file)
    }

    /// Load configuration for an explicit workspace and config file.
    ///
    /// CLI flags for the workspace and config file must be known before the
    /// file is read, so they are passed here rather than applied afterwards.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace {
            config.workspace = workspace;
        }
        config.config_file = config_file;

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.nexus_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Ok(dir) = std::env::var("NEXUS_DATA_DIR") {
            config.documents.path = PathBuf::from(dir);
        }
        config.generation.select(
            std::env::var("NEXUS_PROVIDER").ok(),
            std::env::var("NEXUS_MODEL").ok(),
        );
        if let Ok(provider) = std::env::var("NEXUS_EMBEDDING_PROVIDER") {
            config.embedding.provider = provider;
        }
        if let Ok(model) = std::env::var("NEXUS_EMBEDDING_MODEL") {
            config.embedding.model = model;
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }
        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        tracing::debug!("Merging config file {:?}", path);
        Ok(self.merge_file(file))
    }

    fn merge_file(&self, file: ConfigFile) -> Self {
        let mut result = self.clone();

        if let Some(documents) = file.documents {
            if let Some(path) = documents.path {
                result.documents.path = path;
            }
            if let Some(extensions) = documents.extensions {
                result.documents.extensions = extensions;
            }
        }

        if let Some(index) = file.index {
            if let Some(path) = index.path {
                result.index.path = path;
            }
            if let Some(size) = index.chunk_size {
                result.index.chunk_size = size;
            }
            if let Some(overlap) = index.chunk_overlap {
                result.index.chunk_overlap = overlap;
            }
        }

        if let Some(embedding) = file.embedding {
            if let Some(provider) = embedding.provider {
                result.embedding.provider = provider;
            }
            if let Some(model) = embedding.model {
                result.embedding.model = model;
            }
            if let Some(dimensions) = embedding.dimensions {
                result.embedding.dimensions = dimensions;
            }
            if embedding.endpoint.is_some() {
                result.embedding.endpoint = embedding.endpoint;
            }
        }

        if let Some(generation) = file.generation {
            result.generation.select(generation.provider, generation.model);
            if generation.endpoint.is_some() {
                result.generation.endpoint = generation.endpoint;
            }
            if generation.api_key_env.is_some() {
                result.generation.api_key_env = generation.api_key_env;
            }
            if let Some(temperature) = generation.temperature {
                result.generation.temperature = temperature;
            }
            if generation.max_tokens.is_some() {
                result.generation.max_tokens = generation.max_tokens;
            }
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        result
    }

    /// Apply CLI overrides to the configuration.
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        self.generation.select(provider, model);

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .nexus directory.
    pub fn nexus_dir(&self) -> PathBuf {
        self.workspace.join(".nexus")
    }

    /// Directory holding the corpus, resolved against the workspace.
    pub fn documents_dir(&self) -> PathBuf {
        self.resolve(&self.documents.path)
    }

    /// Directory holding the persisted index, resolved against the workspace.
    pub fn index_dir(&self) -> PathBuf {
        self.resolve(&self.index.path)
    }

    /// Directory with persona role overrides.
    pub fn personas_dir(&self) -> PathBuf {
        self.nexus_dir().join("personas")
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Resolve the generation API key from its environment variable.
    ///
    /// Gemini reads `GOOGLE_API_KEY` unless `apiKeyEnv` names another variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        let provider = canonical_provider(&self.generation.provider);
        let env_var = match (&self.generation.api_key_env, provider.as_str()) {
            (Some(var), _) => var.clone(),
            (None, "gemini") => "GOOGLE_API_KEY".to_string(),
            (None, _) => return None,
        };

        std::env::var(&env_var).ok()
    }

    /// Validate configuration. Called once at startup.
    pub fn validate(&self) -> AppResult<()> {
        if self.index.chunk_size == 0 {
            return Err(AppError::Config(
                "index.chunkSize must be greater than zero".to_string(),
            ));
        }

        if self.index.chunk_overlap >= self.index.chunk_size {
            return Err(AppError::Config(format!(
                "index.chunkOverlap ({}) must be smaller than index.chunkSize ({})",
                self.index.chunk_overlap, self.index.chunk_size
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding.dimensions must be greater than zero".to_string(),
            ));
        }

        let embedding = canonical_provider(&self.embedding.provider);
        if !EMBEDDING_PROVIDERS.contains(&embedding.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        let generation = canonical_provider(&self.generation.provider);
        if !GENERATION_PROVIDERS.contains(&generation.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown generation provider: {}. Supported: {}",
                self.generation.provider,
                GENERATION_PROVIDERS.join(", ")
            )));
        }

        if self.documents.extensions.is_empty() {
            return Err(AppError::Config(
                "documents.extensions must list at least one extension".to_string(),
            ));
        }

        Ok(())
    }
}
