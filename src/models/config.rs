use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_MODEL_ID: &str = "oss_llama-13b";
pub const DEFAULT_LLM_URL: &str = "http://localhost:8080";
pub const DEFAULT_COLLECTION: &str = "ragqa";

/// Environment variable selecting the `[env.<NAME>]` overlay table.
pub const DEPLOYMENT_ENV_VAR: &str = "DEPLOYMENT_ENV";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub document: DocumentConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub indexing: IndexingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl Config {
    /// Default settings path in the user config directory, used when no
    /// explicit path is given and `config/settings.toml` does not exist.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ragqa").join("settings.toml"))
    }

    /// Load settings from an explicit path, or fall back to
    /// `config/settings.toml`, then the user config directory, then the
    /// built-in defaults.
    pub fn load_or_default(path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let local = std::path::Path::new("config/settings.toml");
        if local.exists() {
            return Self::load(local);
        }
        if let Some(default) = Self::default_path()
            && default.exists()
        {
            return Self::load(&default);
        }
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    /// Load settings from a TOML file. When `DEPLOYMENT_ENV` is set and the
    /// file carries a matching `[env.<NAME>]` table, that table is merged
    /// over the defaults before deserializing.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut value: toml::Value = content.parse()?;

        if let Ok(environment) = std::env::var(DEPLOYMENT_ENV_VAR)
            && let Some(overlay) = value.get("env").and_then(|v| v.get(&environment)).cloned()
        {
            merge_value(&mut value, overlay);
        }
        if let Some(table) = value.as_table_mut() {
            table.remove("env");
        }

        let config: Config = toml::from_str(&toml::to_string(&value)?)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.indexing.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "indexing.chunk_size must be at least 1".to_string(),
            ));
        }
        if self.embedding.dimension == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.dimension must be at least 1".to_string(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.batch_size must be at least 1".to_string(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k must be at least 1".to_string(),
            ));
        }
        if let Some(score) = self.retrieval.min_score
            && !(0.0..=1.0).contains(&score)
        {
            return Err(ConfigError::ValidationError(
                "retrieval.min_score must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.llm.context_window <= self.llm.max_new_tokens {
            return Err(ConfigError::ValidationError(
                "llm.context_window must exceed llm.max_new_tokens".to_string(),
            ));
        }
        Ok(())
    }
}

/// Merge an overlay TOML value over a base value. Tables merge recursively;
/// any other value replaces the base.
fn merge_value(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_value) in overlay_table {
                if base_table.contains_key(&key) {
                    if let Some(base_value) = base_table.get_mut(&key) {
                        merge_value(base_value, overlay_value);
                    }
                } else {
                    base_table.insert(key, overlay_value);
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8018
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// File or directory of pre-extracted corpus text (PDF extraction is an
    /// upstream step; this service consumes its output).
    #[serde(default = "default_raw_file_path")]
    pub raw_file_path: String,
}

fn default_raw_file_path() -> String {
    "data/corpus".to_string()
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            raw_file_path: default_raw_file_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Directory containing `model.onnx` and `tokenizer.json`.
    #[serde(default = "default_embed_model_path")]
    pub model_path: PathBuf,

    #[serde(default = "default_dimension")]
    pub dimension: u32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

fn default_embed_model_path() -> PathBuf {
    PathBuf::from("models/embedding")
}

fn default_dimension() -> u32 {
    768
}

fn default_max_tokens() -> u32 {
    512
}

fn default_batch_size() -> u32 {
    8
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_path: default_embed_model_path(),
            dimension: default_dimension(),
            max_tokens: default_max_tokens(),
            batch_size: default_batch_size(),
        }
    }
}

/// Prompt assembly variant used for answer generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    /// Compact context-and-question template.
    #[default]
    Compact,
    /// Explicitly guarded template that refuses to answer without context.
    Guarded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the llama.cpp-compatible completion server.
    #[serde(default = "default_llm_url")]
    pub url: String,

    /// Path of the quantized model file the completion server was launched
    /// with. When set, readability is checked at prepare time so a malformed
    /// deployment fails before serving, not during generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,

    #[serde(default = "default_model_id")]
    pub default_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,

    #[serde(default = "default_context_window")]
    pub context_window: u32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub prompt_style: PromptStyle,
}

fn default_llm_url() -> String {
    DEFAULT_LLM_URL.to_string()
}

fn default_model_id() -> String {
    DEFAULT_MODEL_ID.to_string()
}

fn default_temperature() -> f32 {
    1.0
}

fn default_max_new_tokens() -> u32 {
    256
}

fn default_context_window() -> u32 {
    3900
}

fn default_timeout() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: default_llm_url(),
            model_path: None,
            default_model: default_model_id(),
            temperature: default_temperature(),
            max_new_tokens: default_max_new_tokens(),
            context_window: default_context_window(),
            timeout_secs: default_timeout(),
            prompt_style: PromptStyle::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Index namespace, carried through logs.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Chunk size budget in approximate tokens.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_chunk_size() -> u32 {
    1024
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            chunk_size: default_chunk_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Retriever selector; `doc_retriever` is the only supported value.
    #[serde(default = "default_retriever")]
    pub retriever: String,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_mode")]
    pub mode: String,

    /// Optional minimum similarity cutoff (0.0-1.0). Off by default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f32>,
}

fn default_retriever() -> String {
    "doc_retriever".to_string()
}

fn default_top_k() -> u32 {
    2
}

fn default_mode() -> String {
    "default".to_string()
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            retriever: default_retriever(),
            top_k: default_top_k(),
            mode: default_mode(),
            min_score: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.llm.url, DEFAULT_LLM_URL);
        assert_eq!(config.llm.default_model, DEFAULT_MODEL_ID);
        assert_eq!(config.indexing.collection, DEFAULT_COLLECTION);
        assert_eq!(config.retrieval.retriever, "doc_retriever");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[indexing]\nchunk_size = 256\n\n[retrieval]\ntop_k = 5"
        )
        .unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.indexing.chunk_size, 256);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.service.port, default_port());
    }

    #[test]
    fn test_validate_rejects_zero_chunk_size() {
        let config = Config {
            indexing: IndexingConfig {
                chunk_size: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_out_of_range_min_score() {
        let config = Config {
            retrieval: RetrievalConfig {
                min_score: Some(1.5),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_value_overlays_nested_tables() {
        let mut base: toml::Value = "[service]\nport = 8018\nhost = \"0.0.0.0\"".parse().unwrap();
        let overlay: toml::Value = "[service]\nport = 80".parse().unwrap();
        merge_value(&mut base, overlay);
        assert_eq!(base["service"]["port"].as_integer(), Some(80));
        assert_eq!(base["service"]["host"].as_str(), Some("0.0.0.0"));
    }
}
