//! Backend reply client.
//!
//! Wraps a [`BackendProvider`] with the prompt, the answer contract and the
//! failure policy: every problem turns into `None` so the caller can fall
//! back to rules. Nothing is retried.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use lightschool_core::TutorRequest;

use crate::diagnostics::RawReplyLog;
use crate::metrics::{FailureKind, TutorMetrics};
use crate::prompts::PromptBuilder;
use crate::providers::{BackendProvider, GenerateOptions, GenerateRequest, ProviderError};
use crate::reply::{parse_answer, sanitize, truncate};

/// One-shot backend caller for tutor questions.
pub struct BackendClient {
    provider: Arc<dyn BackendProvider>,
    options: GenerateOptions,
    prompts: PromptBuilder,
    answer_max_chars: usize,
    raw_log: Option<Arc<RawReplyLog>>,
    metrics: Arc<TutorMetrics>,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("provider", &self.provider.name())
            .field("options", &self.options)
            .field("answer_max_chars", &self.answer_max_chars)
            .field("raw_log", &self.raw_log.as_ref().map(|l| l.path().to_path_buf()))
            .finish()
    }
}

impl BackendClient {
    pub fn new(provider: Arc<dyn BackendProvider>, options: GenerateOptions) -> Self {
        Self {
            provider,
            options,
            prompts: PromptBuilder::new(),
            answer_max_chars: 140,
            raw_log: None,
            metrics: Arc::new(TutorMetrics::new()),
        }
    }

    pub fn with_answer_max_chars(mut self, max_chars: usize) -> Self {
        self.answer_max_chars = max_chars;
        self
    }

    pub fn with_raw_log(mut self, raw_log: Arc<RawReplyLog>) -> Self {
        self.raw_log = Some(raw_log);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<TutorMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Ask the provider whether it is reachable, bounded by the request
    /// timeout. A timeout or panic counts as unhealthy.
    pub async fn health_check(&self) -> bool {
        let check = AssertUnwindSafe(self.provider.health_check()).catch_unwind();
        matches!(
            tokio::time::timeout(self.options.timeout, check).await,
            Ok(Ok(true))
        )
    }

    /// Ask the backend for a short answer.
    ///
    /// Returns `None` on any transport error, timeout, panic or reply that
    /// breaks the `{"answer": ...}` contract. Rejected replies are written
    /// to the raw reply log when one is configured.
    pub async fn reply(&self, request: &TutorRequest) -> Option<String> {
        let prompt = self.prompts.build(request);

        let raw = match self.call_provider(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(
                    provider = self.provider.name(),
                    error = %e,
                    "Backend unavailable, falling back to rules"
                );
                self.metrics.record_failure(FailureKind::from(&e));
                return None;
            }
        };

        let sanitized = sanitize(&raw);
        match parse_answer(&sanitized) {
            Ok(answer) => Some(truncate(&answer, self.answer_max_chars)),
            Err(e) => {
                tracing::warn!(
                    provider = self.provider.name(),
                    error = %e,
                    "Backend reply rejected, falling back to rules"
                );
                self.metrics.record_failure(FailureKind::from(&e));
                if let Some(log) = &self.raw_log {
                    drop(log.spawn_record(request, &sanitized));
                }
                None
            }
        }
    }

    async fn call_provider(&self, prompt: &GenerateRequest) -> Result<String, ProviderError> {
        let call = AssertUnwindSafe(self.provider.generate(prompt, &self.options)).catch_unwind();

        match tokio::time::timeout(self.options.timeout, call).await {
            Err(_) => Err(ProviderError::Timeout(self.options.timeout)),
            Ok(Err(panic)) => Err(ProviderError::Panicked(panic_message(panic.as_ref()))),
            Ok(Ok(result)) => result,
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
