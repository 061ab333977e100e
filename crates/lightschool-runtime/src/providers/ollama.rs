//! Ollama provider using the non-streaming `/api/generate` endpoint.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::{
    extract_payload, factory::ProviderFactory, map_send_error, read_json_body, BackendProvider,
    GenerateOptions, GenerateRequest, ProviderError,
};
use crate::config::BackendConfig;

/// Default local Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Local Ollama backend.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a provider for the default local endpoint.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_OLLAMA_URL)
    }

    /// Create a provider for a custom endpoint.
    pub fn with_base_url(url: impl Into<String>) -> Self {
        Self {
            base_url: url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Create from backend configuration.
    pub fn from_config(config: &BackendConfig) -> Result<Self, ProviderError> {
        let url = config.base_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL);
        super::validate_base_url(url)?;
        Ok(Self::with_base_url(url))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Ollama generate request body.
#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_predict: u32,
    max_output_tokens: u32,
}

#[async_trait]
impl BackendProvider for OllamaProvider {
    async fn generate(
        &self,
        request: &GenerateRequest,
        options: &GenerateOptions,
    ) -> Result<String, ProviderError> {
        let body = OllamaRequest {
            model: &options.model,
            prompt: request.combined(),
            stream: false,
            options: OllamaOptions {
                num_predict: options.num_predict,
                max_output_tokens: options.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(self.generate_url())
            .timeout(options.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error(e, options.timeout))?;

        let json = read_json_body(response, options.timeout).await?;
        extract_payload(&json)
            .ok_or_else(|| ProviderError::Parse("response carried no generated text".to_string()))
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Factory for Ollama providers.
///
/// Uses `base_url` from the backend configuration, defaulting to
/// [`DEFAULT_OLLAMA_URL`]. No credential is needed.
pub struct OllamaProviderFactory;

impl ProviderFactory for OllamaProviderFactory {
    fn provider_type(&self) -> &'static str {
        "ollama"
    }

    fn create(&self, config: &BackendConfig) -> Result<Arc<dyn BackendProvider>, ProviderError> {
        Ok(Arc::new(OllamaProvider::from_config(config)?))
    }

    fn default_base_url(&self) -> &'static str {
        DEFAULT_OLLAMA_URL
    }

    fn description(&self) -> &'static str {
        "Local Ollama server (/api/generate)"
    }
}
