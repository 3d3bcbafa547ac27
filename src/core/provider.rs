//! Generative-text provider adapter
//!
//! [`TextGenerator`] is the opaque remote call `generate(prompt) -> text`.
//! [`Translator`] turns a `(text, target_lang)` pair into a prompt, makes a
//! single attempt against the generator and flattens the reply to one line.

use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::debug;

use crate::core::config::GatewayConfig;
use crate::core::errors::{ProviderError, ProviderResult};

/// Any run of line breaks together with the whitespace around it
static LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]*(?:\r\n|\r|\n)+[ \t]*").expect("valid line break regex"));

/// Remote text generation model
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt`. One attempt, no retries.
    async fn generate(&self, prompt: &str) -> ProviderResult<String>;
}

/// Google Gemini `generateContent` client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_endpoint: String,
}

impl GeminiClient {
    /// Create a new client
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        api_endpoint: impl Into<String>,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::MissingCredential);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: model.into(),
            api_endpoint: api_endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create from gateway configuration
    pub fn from_config(config: &GatewayConfig) -> ProviderResult<Self> {
        Self::new(
            config.api_key.clone(),
            config.model.clone(),
            config.api_endpoint.clone(),
            config.provider_timeout(),
        )
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_endpoint, self.model)
    }
}

/// Concatenated text parts of the first candidate
fn extract_text(json: &serde_json::Value) -> ProviderResult<String> {
    let Some(candidate) = json["candidates"].get(0) else {
        let reason = json["promptFeedback"]["blockReason"]
            .as_str()
            .unwrap_or("no candidates in response");
        return Err(ProviderError::InvalidResponse {
            message: reason.to_string(),
        });
    };

    let parts = candidate["content"]["parts"]
        .as_array()
        .ok_or_else(|| ProviderError::InvalidResponse {
            message: "candidate has no content parts".to_string(),
        })?;

    let text: String = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect();

    if text.is_empty() {
        return Err(ProviderError::InvalidResponse {
            message: "candidate has no text".to_string(),
        });
    }

    Ok(text)
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> ProviderResult<String> {
        let body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }]
        });

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let json: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse {
                    message: e.to_string(),
                })?;

        extract_text(&json)
    }
}

/// Build the translation instruction sent to the model
pub fn build_prompt(text: &str, target_lang: &str) -> String {
    format!(
        "Translate the following text to {} in a natural and conversational way and without any additional explanation: {}",
        target_lang, text
    )
}

/// Flatten model output to a single trimmed line
pub fn normalize_output(raw: &str) -> String {
    LINE_BREAKS.replace_all(raw, " ").trim().to_string()
}

/// Translation adapter over a [`TextGenerator`]
#[derive(Clone)]
pub struct Translator {
    generator: Arc<dyn TextGenerator>,
}

impl Translator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Translate `text` into `target_lang`
    pub async fn translate(&self, text: &str, target_lang: &str) -> ProviderResult<String> {
        let prompt = build_prompt(text, target_lang);
        let raw = self.generator.generate(&prompt).await?;
        let translated = normalize_output(&raw);

        if translated.is_empty() {
            return Err(ProviderError::InvalidResponse {
                message: "model returned an empty translation".to_string(),
            });
        }

        debug!("Model output normalized from {} to {} bytes", raw.len(), translated.len());
        Ok(translated)
    }
}
