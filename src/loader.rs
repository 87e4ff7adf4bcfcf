//! Reads the newsletter files from disk and builds the index.

use anyhow::{Context, Result};
use std::path::Path;

use newsletter_rag_core::NewsletterIndex;

use crate::config::Config;

/// Load records plus the optional free-text file and fit the index.
///
/// A missing or malformed records file is fatal. The free-text file is
/// used only when it exists.
pub fn load_index(config: &Config) -> Result<NewsletterIndex> {
    let data = read_records(&config.data.path)?;

    let context_path = config.data.resolved_context_path();
    let freetext = if context_path.is_file() {
        let text = std::fs::read_to_string(&context_path).with_context(|| {
            format!("Failed to read context file: {}", context_path.display())
        })?;
        tracing::info!(path = %context_path.display(), "loaded detailed context");
        Some(text)
    } else {
        tracing::debug!(path = %context_path.display(), "no detailed context file");
        None
    };

    let index = NewsletterIndex::initialize(&data, freetext.as_deref(), config.retrieval.backend)
        .with_context(|| format!("Failed to index {}", config.data.path.display()))?;

    tracing::info!(
        months = index.month_count(),
        chunks = index.chunk_count(),
        backend = index.backend_name(),
        "index initialized"
    );

    Ok(index)
}

fn read_records(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read data file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse data file as JSON: {}", path.display()))
}
