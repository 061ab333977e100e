//! Backend providers for tutor replies.
//!
//! A provider turns a rendered prompt pair into the raw text the model
//! produced. It knows nothing about the `{"answer": ...}` contract; that is
//! checked by [`crate::reply`].
//!
//! ## Security
//!
//! Providers that need an API key hold it as an [`ApiCredential`], which is
//! redacted in `Debug` and `Display` output.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::time::Duration;
use thiserror::Error;

mod factory;
pub mod secrets;

#[cfg(feature = "ollama")]
mod ollama;

#[cfg(feature = "openai")]
mod openai;

pub use factory::{ProviderFactory, ProviderInfo, ProviderRegistry};
pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "ollama")]
pub use ollama::{OllamaProvider, OllamaProviderFactory, DEFAULT_OLLAMA_URL};

#[cfg(feature = "openai")]
pub use openai::{OpenAiCompatProvider, OpenAiProviderFactory, OPENAI_API_KEY_ENV};

/// Errors from backend providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response parse error: {0}")]
    Parse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Provider panicked: {0}")]
    Panicked(String),
}

/// The rendered prompt pair for one tutor question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub system: String,
    pub user: String,
}

impl GenerateRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// System and user prompt joined for single-prompt backends.
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.system, self.user)
    }
}

/// Generation settings passed to every provider call.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Model to use
    pub model: String,

    /// Request timeout
    pub timeout: Duration,

    /// Token limit hint (`num_predict` for Ollama)
    pub num_predict: u32,

    /// Output token ceiling
    pub max_output_tokens: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            model: "deepseek-r1:1.5b".to_string(),
            timeout: Duration::from_secs(15),
            num_predict: 100,
            max_output_tokens: 150,
        }
    }
}

/// Provider abstraction allows swapping LLM backends.
#[async_trait]
pub trait BackendProvider: Send + Sync {
    /// Send the prompt and return the raw text payload.
    async fn generate(
        &self,
        request: &GenerateRequest,
        options: &GenerateOptions,
    ) -> Result<String, ProviderError>;

    /// Check if provider is usable.
    async fn health_check(&self) -> bool;

    /// Get provider name for logs and metrics.
    fn name(&self) -> &str;
}

/// Pull the generated text out of a backend response body.
///
/// Backends disagree on where the text lives. Fields are tried in order:
/// `response`, `output`, `outputs[*].{content|text|response}` (joined by
/// newlines), `choices[0].message.content`, `choices[0].text`,
/// `message.content`. Empty strings count as absent.
pub fn extract_payload(body: &JsonValue) -> Option<String> {
    let non_empty = |v: &JsonValue| v.as_str().filter(|s| !s.is_empty()).map(str::to_string);

    if let Some(text) = non_empty(&body["response"]) {
        return Some(text);
    }
    if let Some(text) = non_empty(&body["output"]) {
        return Some(text);
    }

    if let Some(outputs) = body["outputs"].as_array() {
        let parts: Vec<String> = outputs
            .iter()
            .filter_map(|o| {
                non_empty(&o["content"])
                    .or_else(|| non_empty(&o["text"]))
                    .or_else(|| non_empty(&o["response"]))
            })
            .collect();
        if !parts.is_empty() {
            return Some(parts.join("\n"));
        }
    }

    non_empty(&body["choices"][0]["message"]["content"])
        .or_else(|| non_empty(&body["choices"][0]["text"]))
        .or_else(|| non_empty(&body["message"]["content"]))
}

/// Check that a configured base URL is an HTTP(S) endpoint.
pub(crate) fn validate_base_url(url: &str) -> Result<(), ProviderError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ProviderError::NotConfigured(format!(
            "base_url must start with http:// or https://, got '{}'",
            url
        )))
    }
}

/// Map a reqwest send error onto the provider error taxonomy.
#[cfg(any(feature = "ollama", feature = "openai"))]
pub(crate) fn map_send_error(err: reqwest::Error, timeout: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(timeout)
    } else {
        ProviderError::Http(err.to_string())
    }
}

/// Longest error body kept in [`ProviderError::Status`].
pub const MAX_ERROR_BODY_CHARS: usize = 512;

/// Keep the first [`MAX_ERROR_BODY_CHARS`] characters of an error body.
#[cfg(any(feature = "ollama", feature = "openai"))]
pub(crate) fn clip_error_body(body: String) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body,
    }
}

/// Turn an HTTP response into its JSON body, rejecting non-2xx statuses.
#[cfg(any(feature = "ollama", feature = "openai"))]
pub(crate) async fn read_json_body(
    response: reqwest::Response,
    timeout: Duration,
) -> Result<JsonValue, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Status {
            status: status.as_u16(),
            body: clip_error_body(body),
        });
    }

    response.json::<JsonValue>().await.map_err(|e| {
        if e.is_timeout() {
            ProviderError::Timeout(timeout)
        } else {
            ProviderError::Parse(e.to_string())
        }
    })
}
