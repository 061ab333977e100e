//! Reply counters.
//!
//! Counters are observational only; nothing in the pipeline reads them to
//! decide a reply.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use lightschool_core::ReplySource;

use crate::providers::ProviderError;
use crate::reply::ReplyError;

/// Why the backend stage produced no reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Timeout,
    Http,
    Status,
    Unparsable,
    Panic,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Http => "http",
            FailureKind::Status => "status",
            FailureKind::Unparsable => "unparsable",
            FailureKind::Panic => "panic",
        }
    }
}

impl From<&ProviderError> for FailureKind {
    fn from(error: &ProviderError) -> Self {
        match error {
            ProviderError::Timeout(_) => FailureKind::Timeout,
            ProviderError::Http(_) | ProviderError::NotConfigured(_) => FailureKind::Http,
            ProviderError::Status { .. } => FailureKind::Status,
            ProviderError::Parse(_) => FailureKind::Unparsable,
            ProviderError::Panicked(_) => FailureKind::Panic,
        }
    }
}

impl From<&ReplyError> for FailureKind {
    fn from(_: &ReplyError) -> Self {
        FailureKind::Unparsable
    }
}

/// Atomic reply counters shared across requests.
#[derive(Debug, Default)]
pub struct TutorMetrics {
    calculator: AtomicU64,
    backend: AtomicU64,
    rules: AtomicU64,
    timeout: AtomicU64,
    http: AtomicU64,
    status: AtomicU64,
    unparsable: AtomicU64,
    panic: AtomicU64,
}

impl TutorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a reply by the stage that produced it.
    pub fn record_reply(&self, source: ReplySource) {
        let counter = match source {
            ReplySource::Calculator => &self.calculator,
            ReplySource::Backend => &self.backend,
            ReplySource::Rules => &self.rules,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a backend failure.
    pub fn record_failure(&self, kind: FailureKind) {
        let counter = match kind {
            FailureKind::Timeout => &self.timeout,
            FailureKind::Http => &self.http,
            FailureKind::Status => &self.status,
            FailureKind::Unparsable => &self.unparsable,
            FailureKind::Panic => &self.panic,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            calculator_replies: load(&self.calculator),
            backend_replies: load(&self.backend),
            rule_replies: load(&self.rules),
            backend_timeouts: load(&self.timeout),
            backend_http_errors: load(&self.http),
            backend_status_errors: load(&self.status),
            backend_unparsable: load(&self.unparsable),
            backend_panics: load(&self.panic),
        }
    }
}

/// Point-in-time copy of [`TutorMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub calculator_replies: u64,
    pub backend_replies: u64,
    pub rule_replies: u64,
    pub backend_timeouts: u64,
    pub backend_http_errors: u64,
    pub backend_status_errors: u64,
    pub backend_unparsable: u64,
    pub backend_panics: u64,
}

impl MetricsSnapshot {
    pub fn total_replies(&self) -> u64 {
        self.calculator_replies + self.backend_replies + self.rule_replies
    }

    pub fn backend_failures(&self) -> u64 {
        self.backend_timeouts
            + self.backend_http_errors
            + self.backend_status_errors
            + self.backend_unparsable
            + self.backend_panics
    }
}
