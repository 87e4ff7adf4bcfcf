//! Optional narrative generation through a local Ollama server.
//!
//! Calls `POST {url}/api/generate` with `stream = false`. Narrative is a
//! best-effort addition to an answer: a disabled provider, a network
//! failure, a non-2xx status or an empty response all yield `None`.

use anyhow::{bail, Result};
use serde::Serialize;
use std::time::Duration;

use crate::config::LlmConfig;

/// JSON body of `GET /api/llm/status`.
#[derive(Debug, Clone, Serialize)]
pub struct LlmStatus {
    pub enabled: bool,
    pub provider: String,
    pub model: Option<String>,
}

pub struct NarrativeClient {
    config: LlmConfig,
    client: Option<reqwest::Client>,
}

impl NarrativeClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = if config.is_enabled() {
            Some(
                reqwest::Client::builder()
                    .timeout(Duration::from_secs(config.timeout_secs))
                    .build()?,
            )
        } else {
            None
        };
        Ok(Self {
            config: config.clone(),
            client,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    pub fn status(&self) -> LlmStatus {
        LlmStatus {
            enabled: self.is_enabled(),
            provider: if self.is_enabled() {
                self.config.provider.clone()
            } else {
                "disabled".to_string()
            },
            model: self.is_enabled().then(|| self.config.model.clone()),
        }
    }

    /// Narrative for `question` grounded in `context`, or `None`.
    pub async fn summarize(&self, question: &str, context: &str) -> Option<String> {
        let client = self.client.as_ref()?;
        match self.generate(client, question, context).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "narrative generation failed");
                None
            }
        }
    }

    async fn generate(
        &self,
        client: &reqwest::Client,
        question: &str,
        context: &str,
    ) -> Result<Option<String>> {
        let url = self.config.url.as_deref().unwrap_or_default();
        let body = serde_json::json!({
            "model": self.config.model,
            "prompt": build_prompt(question, context),
            "stream": false,
            "options": { "temperature": self.config.temperature },
        });

        let response = client
            .post(format!("{}/api/generate", url.trim_end_matches('/')))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Ollama API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        Ok(parse_generate_response(&json))
    }
}

/// Prompt restricting the model to the retrieved context.
pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "You are generating official Ministry of Education newsletter outputs. \
         Use only provided context, never invent information, and keep a factual public-sector tone.\n\
         Question: {}\n\
         Context:\n{}\n\
         Return concise response under headings only from the context.",
        question, context
    )
}

/// Trimmed `response` field, `None` when missing or blank.
fn parse_generate_response(json: &serde_json::Value) -> Option<String> {
    json.get("response")
        .and_then(|r| r.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
