use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub docs: DocsConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocsConfig {
    /// Directory of course documents to ingest.
    pub path: PathBuf,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./docs"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Maximum chunk body size in characters. Sentences are never split.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Character overlap between adjacent chunks, rounded back to the
    /// nearest sentence boundary.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    800
}
fn default_chunk_overlap() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Maximum hits returned by a content search.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
        }
    }
}

fn default_max_results() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `"hashed"` (deterministic, local, no network) or `"openai"`.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Vector dimensionality. Required for `"openai"`; the hashed provider
    /// defaults to 512 when unset.
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "hashed".to_string()
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Output length bound passed on every generation call.
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            max_tokens: default_llm_max_tokens(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_llm_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}
fn default_llm_max_tokens() -> u32 {
    800
}
fn default_llm_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Number of exchanged user/assistant pairs retained per session.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
        }
    }
}

fn default_max_history() -> usize {
    2
}

impl Config {
    /// A minimal all-defaults config for tests and fallback paths.
    pub fn minimal() -> Self {
        Self {
            docs: DocsConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }

    if config.retrieval.max_results == 0 {
        anyhow::bail!("retrieval.max_results must be >= 1; searches would always come back empty");
    }

    match config.embedding.provider.as_str() {
        "hashed" => {}
        "openai" => {
            if config.embedding.model.is_none() {
                anyhow::bail!("embedding.model must be specified when provider is 'openai'");
            }
            if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
                anyhow::bail!("embedding.dims must be > 0 when provider is 'openai'");
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be hashed or openai.",
            other
        ),
    }

    if config.llm.max_tokens == 0 {
        anyhow::bail!("llm.max_tokens must be > 0");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn defaults_apply_for_empty_config() {
        let f = write_config("");
        let cfg = load_config(f.path()).unwrap();
        assert_eq!(cfg.chunking.chunk_size, 800);
        assert_eq!(cfg.chunking.chunk_overlap, 100);
        assert_eq!(cfg.retrieval.max_results, 5);
        assert_eq!(cfg.session.max_history, 2);
        assert_eq!(cfg.embedding.provider, "hashed");
        assert_eq!(cfg.llm.max_tokens, 800);
    }

    #[test]
    fn zero_max_results_rejected() {
        let f = write_config("[retrieval]\nmax_results = 0\n");
        let err = load_config(f.path()).unwrap_err();
        assert!(err.to_string().contains("max_results"));
    }

    #[test]
    fn openai_provider_requires_model_and_dims() {
        let f = write_config("[embedding]\nprovider = \"openai\"\n");
        assert!(load_config(f.path()).is_err());

        let f = write_config(
            "[embedding]\nprovider = \"openai\"\nmodel = \"text-embedding-3-small\"\ndims = 1536\n",
        );
        assert!(load_config(f.path()).is_ok());
    }

    #[test]
    fn unknown_provider_rejected() {
        let f = write_config("[embedding]\nprovider = \"quantum\"\n");
        assert!(load_config(f.path()).is_err());
    }
}
