//! OpenAI-compatible chat completions provider.
//!
//! Works with any server exposing `POST {base}/chat/completions`, including
//! llama.cpp and vLLM. The API key is optional for local servers.
//!
//! ## Security
//!
//! The key is stored as an [`ApiCredential`] and only exposed when the
//! `Authorization` header is set.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use super::{
    extract_payload, factory::ProviderFactory, map_send_error, read_json_body,
    secrets::ApiCredential, BackendProvider, GenerateOptions, GenerateRequest, ProviderError,
};
use crate::config::BackendConfig;

/// Environment variable consulted when the config carries no key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible backend.
pub struct OpenAiCompatProvider {
    credential: Option<ApiCredential>,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OpenAiCompatProvider {
    /// Create a provider for a base URL such as `http://localhost:8080/v1`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            credential: None,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Attach a bearer credential.
    pub fn with_credential(mut self, credential: ApiCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Create from backend configuration.
    ///
    /// The key comes from `api_key` in the config, then `OPENAI_API_KEY`.
    pub fn from_config(config: &BackendConfig) -> Result<Self, ProviderError> {
        let url = config.base_url.as_deref().unwrap_or(DEFAULT_OPENAI_URL);
        super::validate_base_url(url)?;

        let credential = match &config.api_key {
            Some(credential) => Some(credential.clone()),
            None => ApiCredential::from_env(OPENAI_API_KEY_ENV, "OpenAI API key").ok(),
        };

        let provider = Self::new(url);
        Ok(match credential {
            Some(credential) => provider.with_credential(credential),
            None => provider,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[async_trait]
impl BackendProvider for OpenAiCompatProvider {
    async fn generate(
        &self,
        request: &GenerateRequest,
        options: &GenerateOptions,
    ) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: &options.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            max_tokens: options.max_output_tokens,
            stream: false,
        };

        let mut builder = self
            .client
            .post(self.completions_url())
            .timeout(options.timeout)
            .json(&body);
        if let Some(credential) = &self.credential {
            builder = builder.bearer_auth(credential.expose());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| map_send_error(e, options.timeout))?;

        let json = read_json_body(response, options.timeout).await?;
        extract_payload(&json)
            .ok_or_else(|| ProviderError::Parse("response carried no message content".to_string()))
    }

    async fn health_check(&self) -> bool {
        self.credential.as_ref().map_or(true, |c| !c.is_empty())
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Factory for OpenAI-compatible providers.
pub struct OpenAiProviderFactory;

impl ProviderFactory for OpenAiProviderFactory {
    fn provider_type(&self) -> &'static str {
        "openai"
    }

    fn create(&self, config: &BackendConfig) -> Result<Arc<dyn BackendProvider>, ProviderError> {
        Ok(Arc::new(OpenAiCompatProvider::from_config(config)?))
    }

    fn default_base_url(&self) -> &'static str {
        DEFAULT_OPENAI_URL
    }

    fn description(&self) -> &'static str {
        "OpenAI-compatible chat completions endpoint"
    }
}
