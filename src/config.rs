use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use newsletter_rag_core::Backend;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub data: DataConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    /// Newsletter records (JSON).
    pub path: PathBuf,
    /// Free-text supplement. Defaults to `detailed_context.txt` beside the
    /// records file and is skipped when absent.
    #[serde(default)]
    pub context_path: Option<PathBuf>,
}

impl DataConfig {
    pub fn resolved_context_path(&self) -> PathBuf {
        match &self.context_path {
            Some(p) => p.clone(),
            None => self
                .path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("detailed_context.txt"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub backend: Backend,
    #[serde(default = "default_context_results")]
    pub context_results: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            backend: Backend::Auto,
            context_results: default_context_results(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_context_results() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            url: None,
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_model() -> String {
    "llama3.1".to_string()
}
fn default_temperature() -> f64 {
    0.1
}
fn default_timeout_secs() -> u64 {
    20
}

impl LlmConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }

    /// Apply `OLLAMA_URL` / `OLLAMA_MODEL`. A non-empty URL enables Ollama.
    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("OLLAMA_URL") {
            if !url.trim().is_empty() {
                self.provider = "ollama".to_string();
                self.url = Some(url);
            }
        }
        if let Ok(model) = std::env::var("OLLAMA_MODEL") {
            if !model.trim().is_empty() {
                self.model = model;
            }
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config = parse_config(&content)?;
    config.llm.apply_env();
    validate(&config)?;

    Ok(config)
}

/// Parse without touching the environment.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    if config.retrieval.context_results < 1 {
        anyhow::bail!("retrieval.context_results must be >= 1");
    }

    match config.llm.provider.as_str() {
        "disabled" => {}
        "ollama" => {
            if config.llm.url.as_deref().map_or(true, |u| u.trim().is_empty()) {
                anyhow::bail!("llm.url must be set when provider is 'ollama'");
            }
        }
        other => anyhow::bail!(
            "Unknown llm provider: '{}'. Must be disabled or ollama.",
            other
        ),
    }

    if !(0.0..=2.0).contains(&config.llm.temperature) {
        anyhow::bail!("llm.temperature must be in [0.0, 2.0]");
    }

    Ok(())
}
