//! Runtime configuration.
//!
//! Configuration comes from an optional YAML or JSON file and is then
//! overridden by `LIGHTSCHOOL_*` environment variables. Every field has a
//! default, so an empty document is a valid configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use lightschool_core::{RuleError, RuleTable};

use crate::providers::secrets::{deserialize_config_credential, ApiCredential, CredentialSource};
use crate::providers::GenerateOptions;

/// Environment variable selecting the provider (`none` disables the backend).
pub const ENV_BACKEND: &str = "LIGHTSCHOOL_BACKEND";
/// Environment variable overriding the backend base URL.
pub const ENV_BACKEND_URL: &str = "LIGHTSCHOOL_BACKEND_URL";
/// Environment variable overriding the model name.
pub const ENV_MODEL: &str = "LIGHTSCHOOL_MODEL";
/// Environment variable overriding the request timeout (humantime, e.g. `15s`).
pub const ENV_TIMEOUT: &str = "LIGHTSCHOOL_TIMEOUT";
/// Environment variable pointing at a rule document.
pub const ENV_RULES: &str = "LIGHTSCHOOL_RULES";
/// Environment variable overriding the diagnostic log path.
pub const ENV_RAW_LOG: &str = "LIGHTSCHOOL_RAW_LOG";
/// Environment variable holding the backend API key.
pub const ENV_API_KEY: &str = "LIGHTSCHOOL_API_KEY";

/// Default location of the raw backend reply log.
pub const DEFAULT_DIAGNOSTIC_LOG: &str = "logs/tutor_raw_responses.log";

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}

/// Settings for the LLM backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Whether the backend stage runs at all
    pub enabled: bool,

    /// Registered provider name ("ollama", "openai")
    pub provider: String,

    /// Base URL; the provider's default is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    pub model: String,

    #[serde(with = "duration_human")]
    pub timeout: Duration,

    pub num_predict: u32,

    pub max_output_tokens: u32,

    #[serde(skip_serializing, deserialize_with = "deserialize_config_credential")]
    pub api_key: Option<ApiCredential>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        let options = GenerateOptions::default();
        Self {
            enabled: true,
            provider: "ollama".to_string(),
            base_url: None,
            model: options.model,
            timeout: options.timeout,
            num_predict: options.num_predict,
            max_output_tokens: options.max_output_tokens,
            api_key: None,
        }
    }
}

impl BackendConfig {
    /// Generation options derived from this configuration.
    pub fn generate_options(&self) -> GenerateOptions {
        GenerateOptions {
            model: self.model.clone(),
            timeout: self.timeout,
            num_predict: self.num_predict,
            max_output_tokens: self.max_output_tokens,
        }
    }
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub backend: BackendConfig,

    /// Rule document to load instead of the built-in one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules_path: Option<PathBuf>,

    /// Where unparsable backend replies are appended; `None` disables it
    pub diagnostic_log: Option<PathBuf>,

    /// Maximum backend answer length in characters
    pub answer_max_chars: usize,

    /// Per-locale default replies for the rule fallback
    pub fallback_defaults: BTreeMap<String, String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            rules_path: None,
            diagnostic_log: Some(PathBuf::from(DEFAULT_DIAGNOSTIC_LOG)),
            answer_max_chars: 140,
            fallback_defaults: BTreeMap::new(),
        }
    }
}

impl RuntimeConfig {
    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, choosing the format by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&contents)?,
            _ => Self::from_yaml(&contents)?,
        };
        tracing::info!(path = %path.display(), provider = %config.backend.provider, "Loaded runtime config");
        Ok(config)
    }

    /// Load from an optional file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_env_overrides()
    }

    /// Apply `LIGHTSCHOOL_*` environment variables.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(provider) = lookup(ENV_BACKEND) {
            let provider = provider.trim().to_lowercase();
            if matches!(provider.as_str(), "none" | "off" | "disabled") {
                self.backend.enabled = false;
            } else {
                self.backend.enabled = true;
                self.backend.provider = provider;
            }
        }
        if let Some(url) = lookup(ENV_BACKEND_URL) {
            self.backend.base_url = Some(url);
        }
        if let Some(model) = lookup(ENV_MODEL) {
            self.backend.model = model;
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT) {
            self.backend.timeout =
                humantime::parse_duration(timeout.trim()).map_err(|e| ConfigError::InvalidValue {
                    key: ENV_TIMEOUT,
                    message: e.to_string(),
                })?;
        }
        if let Some(rules) = lookup(ENV_RULES) {
            self.rules_path = Some(PathBuf::from(rules));
        }
        if let Some(log) = lookup(ENV_RAW_LOG) {
            self.diagnostic_log = Some(PathBuf::from(log));
        }
        if let Some(key) = lookup(ENV_API_KEY) {
            self.backend.api_key = Some(ApiCredential::new(
                key,
                CredentialSource::Environment,
                "backend API key",
            ));
        }

        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "backend.timeout",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.answer_max_chars < 4 {
            return Err(ConfigError::InvalidValue {
                key: "answer_max_chars",
                message: "must be at least 4".to_string(),
            });
        }
        Ok(())
    }

    /// Load the rule table this configuration points at.
    ///
    /// Uses the built-in rules when no path is set, then applies
    /// `fallback_defaults`.
    pub fn load_rules(&self) -> Result<RuleTable, RuleError> {
        let table = match &self.rules_path {
            Some(path) => RuleTable::from_file(path)?,
            None => RuleTable::builtin(),
        };
        Ok(self
            .fallback_defaults
            .iter()
            .fold(table, |table, (locale, reply)| table.with_default(locale.clone(), reply.clone())))
    }
}

/// Durations as humantime strings (`"15s"`, `"1m 30s"`) or integer seconds.
mod duration_human {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDuration {
        Seconds(u64),
        Text(String),
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RawDuration::deserialize(deserializer)? {
            RawDuration::Seconds(secs) => Ok(Duration::from_secs(secs)),
            RawDuration::Text(text) => {
                humantime::parse_duration(text.trim()).map_err(serde::de::Error::custom)
            }
        }
    }
}
