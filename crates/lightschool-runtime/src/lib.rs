//! # lightschool-runtime
//!
//! Async tutor reply pipeline built on `lightschool-core`.
//!
//! The runtime adds the one stage that needs I/O: a generative-text backend
//! asked for a single JSON answer line. Everything that can go wrong there
//! (timeouts, HTTP errors, prose instead of JSON, panics) degrades to the
//! rule table, so callers always get a reply.
//!
//! ```ignore
//! use lightschool_runtime::{RuntimeConfig, TutorOrchestrator};
//!
//! let orchestrator = TutorOrchestrator::from_config(RuntimeConfig::load(None)?)?;
//! let reply = orchestrator.reply("What is 12 plus 7?", "math", 2, "en").await;
//! assert_eq!(reply.reply, "19");
//! ```

pub mod client;
pub mod config;
pub mod diagnostics;
pub mod metrics;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod reply;

pub use client::BackendClient;
pub use config::{BackendConfig, ConfigError, RuntimeConfig};
pub use diagnostics::RawReplyLog;
pub use metrics::{FailureKind, MetricsSnapshot, TutorMetrics};
pub use orchestrator::{RuntimeError, TutorOrchestrator, TutorOrchestratorBuilder};
pub use prompts::PromptBuilder;
pub use providers::{
    BackendProvider, GenerateOptions, GenerateRequest, ProviderError, ProviderInfo,
    ProviderRegistry,
};
pub use reply::ReplyError;
