//! Rule table parsing and lookup.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::{builtin_default, DEFAULT_LOCALE, ENGLISH_DEFAULT};

/// Embedded rule document shipped with the crate.
const BUILTIN_RULES_JSON: &str = include_str!("../../data/tutor_rules.json");

/// Errors that can occur when loading a rule table.
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Failed to read rule file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Rule table validation failed: {0}")]
    ValidationError(String),
}

/// Canned replies keyed by `"subject:firstword"` for one locale.
pub type LocaleRules = BTreeMap<String, Vec<String>>;

/// Read-only rule table used as the last stage of the tutor pipeline.
///
/// Document format: `{ "<locale>": { "<subject>:<firstWord>": ["reply", ...] } }`.
/// Per-locale default replies start from the built-in English and Spanish
/// sentences and can be overridden with [`RuleTable::with_default`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleTable {
    #[serde(flatten)]
    locales: BTreeMap<String, LocaleRules>,

    #[serde(skip)]
    defaults: BTreeMap<String, String>,
}

impl RuleTable {
    /// Parse a rule table from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        let table: RuleTable = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    /// Parse a rule table from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, RuleError> {
        let table: RuleTable = serde_yaml::from_str(yaml)?;
        table.validate()?;
        Ok(table)
    }

    /// Load a rule table from a file, choosing the format by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RuleError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let table = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&contents)?,
            _ => Self::from_json(&contents)?,
        };
        tracing::info!(path = %path.display(), locales = table.locales.len(), "Loaded tutor rules");
        Ok(table)
    }

    /// The rule table embedded in the crate.
    pub fn builtin() -> Self {
        // An unparsable embedded document degrades to default replies only
        Self::from_json(BUILTIN_RULES_JSON).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Built-in tutor rules failed to parse");
            Self::default()
        })
    }

    /// Override the default reply for a locale. Empty text is ignored.
    pub fn with_default(mut self, locale: impl Into<String>, reply: impl Into<String>) -> Self {
        let reply = reply.into();
        if !reply.trim().is_empty() {
            self.defaults.insert(locale.into(), reply);
        }
        self
    }

    /// Validate the table structure.
    fn validate(&self) -> Result<(), RuleError> {
        for (locale, rules) in &self.locales {
            for key in rules.keys() {
                if !key.contains(':') {
                    return Err(RuleError::ValidationError(format!(
                        "Rule key '{}' in locale '{}' must look like 'subject:word'",
                        key, locale
                    )));
                }
            }
        }
        Ok(())
    }

    /// Build the lookup key for a message.
    pub fn key_for(subject: &str, message: &str) -> String {
        let first_word = message
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_lowercase();
        format!("{}:{}", subject, first_word)
    }

    /// Candidate replies for a message, if any rule matches.
    pub fn lookup(&self, message: &str, subject: &str, locale: &str) -> Option<&[String]> {
        let key = Self::key_for(subject, message);
        self.locales
            .get(locale)
            .and_then(|rules| rules.get(&key))
            .map(|replies| replies.as_slice())
            .filter(|replies| !replies.is_empty())
    }

    /// The fixed default reply for a locale.
    pub fn default_for(&self, locale: &str) -> &str {
        if let Some(reply) = self.defaults.get(locale) {
            return reply;
        }
        if let Some(reply) = builtin_default(locale) {
            return reply;
        }
        self.defaults
            .get(DEFAULT_LOCALE)
            .map(|s| s.as_str())
            .unwrap_or(ENGLISH_DEFAULT)
    }

    /// Select a reply using the supplied random source.
    ///
    /// Never fails and never returns an empty string.
    pub fn reply_with<R: Rng + ?Sized>(
        &self,
        message: &str,
        subject: &str,
        locale: &str,
        rng: &mut R,
    ) -> String {
        let chosen = self
            .lookup(message, subject, locale)
            .and_then(|replies| replies.choose(rng))
            .filter(|reply| !reply.trim().is_empty());

        match chosen {
            Some(reply) => reply.clone(),
            None => {
                tracing::debug!(subject, locale, "No tutor rule matched, using default reply");
                self.default_for(locale).to_string()
            }
        }
    }

    /// Select a reply using the thread-local random source.
    pub fn reply(&self, message: &str, subject: &str, locale: &str) -> String {
        self.reply_with(message, subject, locale, &mut rand::thread_rng())
    }

    /// Number of rule keys in a locale.
    pub fn rule_count(&self, locale: &str) -> usize {
        self.locales.get(locale).map(|r| r.len()).unwrap_or(0)
    }
}
