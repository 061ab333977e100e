//! Lesson pack types and file-backed storage.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::schema::validate_lesson_pack;

lazy_static! {
    /// Subject and locale segments allowed in lesson paths
    static ref PATH_SEGMENT: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

/// Errors that can occur when loading lesson packs.
#[derive(Error, Debug)]
pub enum LessonError {
    #[error("Lesson file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read lesson file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse lesson JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid lesson pack structure: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("Invalid {field}: '{value}'")]
    InvalidKey { field: &'static str, value: String },
}

/// One instructional card. Only `title` and `text` are typed; other fields are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

/// A multiple-choice quiz question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    /// Question id; numeric ids are normalized to strings
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    pub prompt: String,

    pub choices: Vec<String>,

    /// Index into `choices` of the correct answer
    pub answer_index: usize,

    #[serde(default)]
    pub explanation: String,
}

/// A named sub-section of a lesson pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub title: String,
    pub cards: Vec<Card>,
    pub quiz: Vec<QuizQuestion>,
}

/// Structured curriculum content for a (subject, grade, locale) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonPack {
    pub subject: String,
    pub grade: u32,
    pub locale: String,
    pub units: Vec<Unit>,
}

impl LessonPack {
    /// Parse and validate a lesson pack from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, LessonError> {
        let value: JsonValue = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Validate a JSON value against the lesson schema, then deserialize it.
    pub fn from_value(value: JsonValue) -> Result<Self, LessonError> {
        validate_lesson_pack(&value).map_err(LessonError::Invalid)?;
        Ok(serde_json::from_value(value)?)
    }

    /// Parse a lesson pack from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LessonError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Find a unit by id.
    pub fn unit(&self, unit_id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == unit_id)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match JsonValue::deserialize(deserializer)? {
        JsonValue::String(s) => Ok(s),
        JsonValue::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, found {}",
            other
        ))),
    }
}

/// Lesson packs stored as `{root}/{locale}/{subject}/grade{grade}.json`.
#[derive(Debug, Clone)]
pub struct LessonStore {
    root: PathBuf,
}

impl LessonStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the lesson file for a (subject, grade, locale) triple.
    pub fn path_for(&self, subject: &str, grade: u32, locale: &str) -> Result<PathBuf, LessonError> {
        check_segment("subject", subject)?;
        check_segment("locale", locale)?;
        Ok(self
            .root
            .join(locale)
            .join(subject)
            .join(format!("grade{}.json", grade)))
    }

    /// Load and validate the lesson pack for a (subject, grade, locale) triple.
    pub fn load(&self, subject: &str, grade: u32, locale: &str) -> Result<LessonPack, LessonError> {
        let path = self.path_for(subject, grade, locale)?;
        if !path.exists() {
            return Err(LessonError::NotFound(path));
        }
        tracing::debug!(path = %path.display(), "Loading lesson pack");
        LessonPack::from_json_file(&path)
    }
}

fn check_segment(field: &'static str, value: &str) -> Result<(), LessonError> {
    if PATH_SEGMENT.is_match(value) {
        Ok(())
    } else {
        Err(LessonError::InvalidKey {
            field,
            value: value.to_string(),
        })
    }
}
