//! This module provides functionality for loading and handling the application's configuration.
//!
//! It defines the `MarinConfig` struct, which holds the configuration parameters,
//! and a `load_config` function to load the configuration from a YAML file.
//!
//! # Examples
//!
//! ```no_run
//! use marin_memory::config::{MarinConfig, load_config};
//!
//! let config: MarinConfig = load_config("/path/to/config.yaml").unwrap();
//! println!("{:?}", config);
//! ```

use serde::{Deserialize, Serialize};
use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::debug;

use crate::embeddings::{
    DEFAULT_LOCAL_MODEL, EmbeddingProvider, LocalEmbeddingProvider, MINILM_DIMENSIONS,
    OpenAiEmbeddingProvider,
};
use crate::error::EmbeddingError;
use crate::retriever::DEFAULT_TOP_K;

/// Which embedding backend to use.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// In-process Candle model.
    #[default]
    Local,
    /// OpenAI-compatible `/v1/embeddings` endpoint.
    OpenAi,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingBackend,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,

    // Only used by the openai backend; falls back to the chat api_base/api_key.
    #[serde(default)]
    pub api_base: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::Local,
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
            api_base: None,
            api_key: None,
        }
    }
}

fn default_embedding_model() -> String {
    DEFAULT_LOCAL_MODEL.to_string()
}

fn default_embedding_dimensions() -> usize {
    MINILM_DIMENSIONS
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_max_tokens() -> u16 {
    1024
}

fn default_template() -> String {
    "marin".to_string()
}

fn default_knowledge_base_path() -> PathBuf {
    PathBuf::from("MARIN_knowledge_base.json")
}

/// Represents the application's configuration.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct MarinConfig {
    /// The API key used to authenticate requests to the completion API.
    pub api_key: String,

    /// The base URL of the completion API.
    pub api_base: String,

    /// The name of the model used for generating responses.
    pub model: String,

    // Completion budget per answer.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u16,

    // Stop words
    #[serde(default)]
    pub stop_words: Vec<String>,

    // Seed knowledge base (JSON). Relative paths resolve against the config file's directory.
    #[serde(default = "default_knowledge_base_path")]
    pub knowledge_base_path: PathBuf,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    // Persona template name under <config_dir>/templates
    #[serde(default = "default_template")]
    pub template: String,

    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

impl Default for MarinConfig {
    fn default() -> Self {
        Self {
            api_key: "CHANGEME".to_string(),
            api_base: "http://localhost:5001/v1".to_string(),
            model: "gemini-2.5-pro".to_string(),
            max_tokens: default_max_tokens(),
            stop_words: Vec::new(),
            knowledge_base_path: default_knowledge_base_path(),
            top_k: default_top_k(),
            template: default_template(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl MarinConfig {
    /// Resolve `knowledge_base_path` against `base_dir` when it is relative.
    pub fn knowledge_base_path_in(&self, base_dir: &Path) -> PathBuf {
        if self.knowledge_base_path.is_absolute() {
            self.knowledge_base_path.clone()
        } else {
            base_dir.join(&self.knowledge_base_path)
        }
    }

    /// Construct the configured embedding provider.
    ///
    /// # Errors
    /// Returns an [`EmbeddingError`] if the local model cannot be loaded.
    pub fn embedding_provider(&self) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
        let embedding = &self.embedding;
        match embedding.provider {
            EmbeddingBackend::Local => Ok(Arc::new(LocalEmbeddingProvider::load(
                &embedding.model,
                embedding.dimensions,
            )?)),
            EmbeddingBackend::OpenAi => {
                let base = embedding.api_base.as_deref().unwrap_or(&self.api_base);
                let key = embedding
                    .api_key
                    .clone()
                    .unwrap_or_else(|| self.api_key.clone());
                Ok(Arc::new(
                    OpenAiEmbeddingProvider::new(base, embedding.model.clone(), embedding.dimensions)
                        .with_api_key(key),
                ))
            }
        }
    }
}

/// Loads the application's configuration from a YAML file.
///
/// # Errors
/// An error occurred while reading the file or parsing the YAML.
pub fn load_config(file: impl AsRef<Path>) -> Result<MarinConfig, Box<dyn Error>> {
    let file = file.as_ref();
    debug!("Loading config: {}", file.display());
    let content = fs::read_to_string(file)?;
    let config: MarinConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_valid_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
api_key: "example_api_key"
api_base: "http://example.com/v1"
model: "example_model"
max_tokens: 512
stop_words: ["<|im_end|>"]
knowledge_base_path: "/srv/marin/kb.json"
top_k: 5
embedding:
  provider: openai
  model: "text-embedding-3-small"
  dimensions: 1536
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.api_key, "example_api_key");
        assert_eq!(config.api_base, "http://example.com/v1");
        assert_eq!(config.model, "example_model");
        assert_eq!(config.max_tokens, 512);
        assert_eq!(config.top_k, 5);
        assert_eq!(config.template, "marin");
        assert_eq!(config.embedding.provider, EmbeddingBackend::OpenAi);
        assert_eq!(config.embedding.dimensions, 1536);
        assert_eq!(config.embedding.api_base, None);
    }

    #[test]
    fn test_load_config_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
api_key: "k"
api_base: "http://localhost:5001/v1"
model: "m"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.top_k, 3);
        assert_eq!(config.embedding, EmbeddingConfig::default());
        assert_eq!(
            config.knowledge_base_path,
            PathBuf::from("MARIN_knowledge_base.json")
        );
    }

    #[test]
    fn test_load_config_invalid_file() {
        assert!(load_config("non/existent/path").is_err());
    }

    #[test]
    fn test_load_config_invalid_format() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, r#"invalid: config: format"#).unwrap();
        assert!(load_config(temp_file.path()).is_err());
    }

    #[test]
    fn test_knowledge_base_path_resolution() {
        let config = MarinConfig::default();
        assert_eq!(
            config.knowledge_base_path_in(Path::new("/etc/marin")),
            PathBuf::from("/etc/marin/MARIN_knowledge_base.json")
        );

        let config = MarinConfig {
            knowledge_base_path: PathBuf::from("/data/kb.json"),
            ..MarinConfig::default()
        };
        assert_eq!(
            config.knowledge_base_path_in(Path::new("/etc/marin")),
            PathBuf::from("/data/kb.json")
        );
    }

    #[test]
    fn test_openai_embedding_provider_from_config() {
        let config = MarinConfig {
            embedding: EmbeddingConfig {
                provider: EmbeddingBackend::OpenAi,
                model: "text-embedding-3-small".to_string(),
                dimensions: 1536,
                api_base: None,
                api_key: None,
            },
            ..MarinConfig::default()
        };
        let provider = config.embedding_provider().unwrap();
        assert_eq!(provider.dimensions(), 1536);
        assert_eq!(provider.model_name(), "text-embedding-3-small");
    }
}
