//! Tutor orchestrator.
//!
//! Runs the reply pipeline for one question:
//! - Calculator: extract an arithmetic expression and evaluate it locally
//! - Backend: ask the configured LLM for a one-sentence answer
//! - Rules: pick a canned reply from the rule table
//!
//! The first stage that produces something wins. No stage is retried and
//! the pipeline always returns a reply.

use std::sync::Arc;
use thiserror::Error;

use lightschool_core::{calculator_reply, RuleError, RuleTable, TutorReply, TutorRequest};

use crate::client::BackendClient;
use crate::config::{ConfigError, RuntimeConfig};
use crate::diagnostics::RawReplyLog;
use crate::metrics::{MetricsSnapshot, TutorMetrics};
use crate::providers::{BackendProvider, ProviderError, ProviderRegistry};

/// Errors from building the runtime. Replying itself never fails.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Rule table error: {0}")]
    Rules(#[from] RuleError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Produces one [`TutorReply`] per [`TutorRequest`].
///
/// Holds only read-only rules and an optional backend client, so a single
/// instance can serve concurrent requests.
#[derive(Debug)]
pub struct TutorOrchestrator {
    rules: Arc<RuleTable>,
    backend: Option<BackendClient>,
    metrics: Arc<TutorMetrics>,
}

impl TutorOrchestrator {
    /// Start building an orchestrator.
    pub fn builder() -> TutorOrchestratorBuilder {
        TutorOrchestratorBuilder::new()
    }

    /// Build an orchestrator from configuration alone.
    ///
    /// The provider is resolved through [`ProviderRegistry::with_defaults`].
    pub fn from_config(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        let provider = ProviderRegistry::with_defaults().from_config(&config.backend)?;
        let mut builder = Self::builder().config(config);
        if let Some(provider) = provider {
            builder = builder.provider(provider);
        }
        builder.build()
    }

    /// Reply to a tutor request.
    pub async fn get_tutor_reply(&self, request: &TutorRequest) -> TutorReply {
        let reply = self.resolve(request).await;
        tracing::debug!(
            source = %reply.source,
            subject = %request.subject,
            locale = %request.locale,
            "Tutor reply selected"
        );
        self.metrics.record_reply(reply.source);
        reply
    }

    /// Convenience wrapper taking the request fields directly.
    pub async fn reply(&self, message: &str, subject: &str, grade: u32, locale: &str) -> TutorReply {
        self.get_tutor_reply(&TutorRequest::new(message, subject, grade, locale))
            .await
    }

    async fn resolve(&self, request: &TutorRequest) -> TutorReply {
        if let Some(reply) = calculator_reply(&request.message) {
            return reply;
        }

        if let Some(backend) = &self.backend {
            if let Some(answer) = backend.reply(request).await {
                return TutorReply::backend(answer);
            }
        }

        TutorReply::rules(
            self.rules
                .reply(&request.message, &request.subject, &request.locale),
        )
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Name of the configured backend provider, if any.
    pub fn backend_name(&self) -> Option<&str> {
        self.backend.as_ref().map(BackendClient::provider_name)
    }

    /// Health of the configured backend; `None` when there is no backend.
    pub async fn backend_healthy(&self) -> Option<bool> {
        match &self.backend {
            Some(backend) => Some(backend.health_check().await),
            None => None,
        }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Builder for [`TutorOrchestrator`].
pub struct TutorOrchestratorBuilder {
    rules: Option<Arc<RuleTable>>,
    provider: Option<Arc<dyn BackendProvider>>,
    config: RuntimeConfig,
    raw_log: Option<Arc<RawReplyLog>>,
    metrics: Option<Arc<TutorMetrics>>,
}

impl TutorOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            rules: None,
            provider: None,
            config: RuntimeConfig::default(),
            raw_log: None,
            metrics: None,
        }
    }

    /// Use a preloaded rule table instead of the one named in the config.
    pub fn rules(mut self, rules: Arc<RuleTable>) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Set the backend provider. Without one, replies skip to rules.
    pub fn provider(mut self, provider: Arc<dyn BackendProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the raw reply log from the config.
    pub fn raw_log(mut self, raw_log: Arc<RawReplyLog>) -> Self {
        self.raw_log = Some(raw_log);
        self
    }

    /// Share metrics counters with the caller.
    pub fn metrics(mut self, metrics: Arc<TutorMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<TutorOrchestrator, RuntimeError> {
        let rules = match self.rules {
            Some(rules) => rules,
            None => Arc::new(self.config.load_rules()?),
        };
        let metrics = self.metrics.unwrap_or_default();

        let raw_log = self.raw_log.or_else(|| {
            self.config
                .diagnostic_log
                .as_ref()
                .map(|path| Arc::new(RawReplyLog::new(path)))
        });

        let backend = self.provider.filter(|_| self.config.backend.enabled).map(|provider| {
            let client = BackendClient::new(provider, self.config.backend.generate_options())
                .with_answer_max_chars(self.config.answer_max_chars)
                .with_metrics(Arc::clone(&metrics));
            match &raw_log {
                Some(log) => client.with_raw_log(Arc::clone(log)),
                None => client,
            }
        });

        if backend.is_none() {
            tracing::debug!("No backend configured, replies come from calculator and rules");
        }

        Ok(TutorOrchestrator {
            rules,
            backend,
            metrics,
        })
    }
}

impl Default for TutorOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{GenerateOptions, GenerateRequest};
    use async_trait::async_trait;
    use lightschool_core::ReplySource;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ENGLISH_DEFAULT: &str = "Keep practicing! You're doing great.";

    /// Provider that counts calls and returns a fixed reply.
    struct CountingProvider {
        reply: String,
        calls: AtomicUsize,
    }

    impl CountingProvider {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl BackendProvider for CountingProvider {
        async fn generate(
            &self,
            _request: &GenerateRequest,
            _options: &GenerateOptions,
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn quiet_config() -> RuntimeConfig {
        RuntimeConfig {
            diagnostic_log: None,
            ..RuntimeConfig::default()
        }
    }

    fn orchestrator_with(provider: Arc<CountingProvider>) -> TutorOrchestrator {
        TutorOrchestrator::builder()
            .config(quiet_config())
            .provider(provider)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_calculator_wins_without_backend_call() {
        let provider = CountingProvider::new(r#"{"answer":"nineteen"}"#);
        let orchestrator = orchestrator_with(Arc::clone(&provider));

        let reply = orchestrator.reply("What is 12 plus 7?", "math", 2, "en").await;
        assert_eq!(reply, TutorReply::calculator("19"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_integral_division_has_no_decimal_point() {
        let orchestrator = orchestrator_with(CountingProvider::new("nope"));
        let reply = orchestrator.reply("10 / 2", "math", 3, "en").await;
        assert_eq!(reply, TutorReply::calculator("5"));
    }

    #[tokio::test]
    async fn test_division_by_zero_falls_through_to_backend() {
        let provider = CountingProvider::new(r#"{"answer":"We can't split into zero groups!"}"#);
        let orchestrator = orchestrator_with(Arc::clone(&provider));

        let reply = orchestrator.reply("what is 3 divided by 0?", "math", 3, "en").await;
        assert_eq!(reply.source, ReplySource::Backend);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_backend_answer() {
        let orchestrator =
            orchestrator_with(CountingProvider::new(r#"{"answer":"Plants make food from sunlight."}"#));
        let reply = orchestrator.reply("How do plants eat?", "science", 4, "en").await;
        assert_eq!(reply, TutorReply::backend("Plants make food from sunlight."));
    }

    #[tokio::test]
    async fn test_unparsable_backend_reply_uses_rules() {
        let orchestrator = orchestrator_with(CountingProvider::new("Plants eat sunlight!"));
        let reply = orchestrator.reply("Tell me about plants", "science", 4, "en").await;
        assert_eq!(reply, TutorReply::rules(ENGLISH_DEFAULT));
    }

    #[tokio::test]
    async fn test_backend_name_and_health() {
        let orchestrator = orchestrator_with(CountingProvider::new("unused"));
        assert_eq!(orchestrator.backend_name(), Some("counting"));
        assert_eq!(orchestrator.backend_healthy().await, Some(true));
    }

    #[tokio::test]
    async fn test_huge_arithmetic_chain_falls_through() {
        let provider = CountingProvider::new(r#"{"answer":"That is a lot of ones!"}"#);
        let orchestrator = orchestrator_with(Arc::clone(&provider));

        let message = format!("what is {}1?", "1 plus ".repeat(200_000));
        let reply = orchestrator.reply(&message, "math", 1, "en").await;
        assert_eq!(reply, TutorReply::backend("That is a lot of ones!"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_backend_uses_rules() {
        let orchestrator = TutorOrchestrator::builder()
            .config(quiet_config())
            .build()
            .unwrap();
        assert!(!orchestrator.has_backend());
        assert_eq!(orchestrator.backend_name(), None);
        assert_eq!(orchestrator.backend_healthy().await, None);

        let reply = orchestrator.reply("Cuéntame algo", "art", 1, "es").await;
        assert_eq!(
            reply,
            TutorReply::rules("¡Sigue practicando! Lo estás haciendo genial.")
        );
    }

    #[tokio::test]
    async fn test_disabled_backend_is_skipped() {
        let provider = CountingProvider::new(r#"{"answer":"hi"}"#);
        let mut config = quiet_config();
        config.backend.enabled = false;
        let orchestrator = TutorOrchestrator::builder()
            .config(config)
            .provider(Arc::clone(&provider) as Arc<dyn BackendProvider>)
            .build()
            .unwrap();

        let reply = orchestrator.reply("hello", "math", 1, "en").await;
        assert_eq!(reply.source, ReplySource::Rules);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rule_match_from_custom_table() {
        let rules = RuleTable::from_yaml("en:\n  \"math:why\":\n    - \"Because math is fun!\"\n").unwrap();
        let orchestrator = TutorOrchestrator::builder()
            .config(quiet_config())
            .rules(Arc::new(rules))
            .build()
            .unwrap();

        let reply = orchestrator.reply("Why do we add?", "math", 1, "en").await;
        assert_eq!(reply, TutorReply::rules("Because math is fun!"));
    }

    #[tokio::test]
    async fn test_fallback_default_from_config() {
        let mut config = quiet_config();
        config
            .fallback_defaults
            .insert("en".to_string(), "You've got this!".to_string());
        let orchestrator = TutorOrchestrator::builder().config(config).build().unwrap();

        let reply = orchestrator.reply("zzz", "music", 1, "en").await;
        assert_eq!(reply, TutorReply::rules("You've got this!"));
    }

    #[tokio::test]
    async fn test_metrics_count_sources() {
        let metrics = Arc::new(TutorMetrics::new());
        let orchestrator = TutorOrchestrator::builder()
            .config(quiet_config())
            .provider(CountingProvider::new("not json"))
            .metrics(Arc::clone(&metrics))
            .build()
            .unwrap();

        orchestrator.reply("2 + 2", "math", 1, "en").await;
        orchestrator.reply("hello", "math", 1, "en").await;

        let snapshot = orchestrator.metrics();
        assert_eq!(snapshot.calculator_replies, 1);
        assert_eq!(snapshot.rule_replies, 1);
        assert_eq!(snapshot.backend_unparsable, 1);
        assert_eq!(metrics.snapshot(), snapshot);
    }

    #[tokio::test]
    async fn test_identical_requests_identical_replies() {
        let orchestrator = orchestrator_with(CountingProvider::new(r#"{"answer":"Same every time."}"#));
        let request = TutorRequest::new("Why is the sky blue?", "science", 3, "en");

        let first = orchestrator.get_tutor_reply(&request).await;
        let second = orchestrator.get_tutor_reply(&request).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_concurrent_requests() {
        let orchestrator = Arc::new(orchestrator_with(CountingProvider::new(r#"{"answer":"ok"}"#)));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let orchestrator = Arc::clone(&orchestrator);
                tokio::spawn(async move {
                    let message = if i % 2 == 0 {
                        format!("{} + 1", i)
                    } else {
                        "Why?".to_string()
                    };
                    orchestrator.reply(&message, "math", 1, "en").await
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let reply = handle.await.unwrap();
            if i % 2 == 0 {
                assert_eq!(reply, TutorReply::calculator((i + 1).to_string()));
            } else {
                assert_eq!(reply, TutorReply::backend("ok"));
            }
        }
    }

    #[test]
    fn test_build_fails_on_missing_rules_file() {
        let config = RuntimeConfig {
            rules_path: Some("/nonexistent/rules.json".into()),
            ..quiet_config()
        };
        let result = TutorOrchestrator::builder().config(config).build();
        assert!(matches!(result, Err(RuntimeError::Rules(_))));
    }

    #[cfg(feature = "ollama")]
    mod http {
        use super::*;
        use serde_json::json;
        use std::time::Duration;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        async fn orchestrator_for(server: &MockServer, config: RuntimeConfig) -> TutorOrchestrator {
            let mut config = config;
            config.backend.base_url = Some(server.uri());
            TutorOrchestrator::from_config(config).unwrap()
        }

        #[tokio::test]
        async fn test_ollama_answer() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/generate"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "response": "<think>The sky scatters blue light.</think>\n{\"answer\":\"Air scatters blue light the most!\"}"
                })))
                .mount(&server)
                .await;

            let orchestrator = orchestrator_for(&server, quiet_config()).await;
            let reply = orchestrator.reply("Why is the sky blue?", "science", 3, "en").await;
            assert_eq!(reply, TutorReply::backend("Air scatters blue light the most!"));
        }

        #[tokio::test]
        async fn test_server_error_uses_rules() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/generate"))
                .respond_with(ResponseTemplate::new(500))
                .mount(&server)
                .await;

            let orchestrator = orchestrator_for(&server, quiet_config()).await;
            let reply = orchestrator.reply("Why is the sky blue?", "science", 3, "en").await;
            assert_eq!(reply.source, ReplySource::Rules);
            assert!(!reply.reply.is_empty());
            assert_eq!(orchestrator.metrics().backend_status_errors, 1);
        }

        #[tokio::test]
        async fn test_timeout_uses_rules() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/generate"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!({"response": "{\"answer\":\"late\"}"}))
                        .set_delay(Duration::from_secs(3)),
                )
                .mount(&server)
                .await;

            let mut config = quiet_config();
            config.backend.timeout = Duration::from_millis(200);
            let orchestrator = orchestrator_for(&server, config).await;

            let reply = orchestrator.reply("What is a noun?", "english", 2, "en").await;
            assert_eq!(reply.source, ReplySource::Rules);
            assert!(!reply.reply.is_empty());
            assert_eq!(orchestrator.metrics().backend_timeouts, 1);
        }

        #[tokio::test]
        async fn test_non_json_reply_logged_and_uses_rules() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/generate"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "response": "The sky is blue because of Rayleigh scattering."
                })))
                .mount(&server)
                .await;

            let dir = tempfile::tempdir().unwrap();
            let log_path = dir.path().join("logs").join("tutor_raw_responses.log");
            let config = RuntimeConfig {
                diagnostic_log: Some(log_path.clone()),
                ..RuntimeConfig::default()
            };
            let orchestrator = orchestrator_for(&server, config).await;

            let reply = orchestrator.reply("Why is the sky blue?", "science", 3, "en").await;
            assert_eq!(reply.source, ReplySource::Rules);

            let contents = crate::diagnostics::read_records(&log_path, 1).await;
            assert!(contents.starts_with("---\ntimestamp: "));
            assert!(contents.contains("subject: science grade: 3 locale: en\n"));
            assert!(contents.contains("raw_reply:\nThe sky is blue because of Rayleigh scattering.\n"));
        }

        #[tokio::test]
        async fn test_long_answer_truncated_still_backend() {
            let long_answer = "Fractions ".repeat(30);
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/generate"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "response": json!({"answer": long_answer}).to_string()
                })))
                .mount(&server)
                .await;

            let orchestrator = orchestrator_for(&server, quiet_config()).await;
            let reply = orchestrator.reply("What are fractions?", "math", 4, "en").await;
            assert_eq!(reply.source, ReplySource::Backend);
            assert!(reply.reply.chars().count() <= 140);
            assert!(reply.reply.ends_with("..."));
        }

        #[tokio::test]
        async fn test_identical_input_against_stub() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/generate"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "response": "{\"answer\":\"Verbs are action words.\"}"
                })))
                .mount(&server)
                .await;

            let orchestrator = orchestrator_for(&server, quiet_config()).await;
            let first = orchestrator.reply("What is a verb?", "english", 2, "en").await;
            let second = orchestrator.reply("What is a verb?", "english", 2, "en").await;
            assert_eq!(first, second);
            assert_eq!(first.source, ReplySource::Backend);
        }
    }
}
