//! Per-session learning progress.
//!
//! Progress is a nested map `locale -> subject -> grade -> unit id`. Grades
//! are stored as strings so the book serializes to the same JSON shape the
//! web client reads back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Progress for one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitProgress {
    /// Free-form status, e.g. "started" or "completed"
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Unit progress for one subject and grade, keyed by unit id.
pub type GradeProgress = BTreeMap<String, UnitProgress>;

/// Subject progress keyed by grade.
pub type SubjectProgress = BTreeMap<String, GradeProgress>;

/// Locale progress keyed by subject.
pub type LocaleProgress = BTreeMap<String, SubjectProgress>;

/// All progress for a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressBook {
    locales: BTreeMap<String, LocaleProgress>,
}

impl ProgressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record progress for a unit, replacing any previous entry.
    pub fn set(
        &mut self,
        locale: &str,
        subject: &str,
        grade: u32,
        unit_id: &str,
        status: impl Into<String>,
        score: Option<u32>,
    ) -> &UnitProgress {
        let grade_progress = self
            .locales
            .entry(locale.to_string())
            .or_default()
            .entry(subject.to_string())
            .or_default()
            .entry(grade.to_string())
            .or_default();

        grade_progress.insert(
            unit_id.to_string(),
            UnitProgress {
                status: status.into(),
                score,
                updated_at: Some(Utc::now()),
            },
        );
        &grade_progress[unit_id]
    }

    /// All progress recorded under a locale.
    pub fn for_locale(&self, locale: &str) -> Option<&LocaleProgress> {
        self.locales.get(locale)
    }

    /// Progress for one subject and grade. Empty when nothing is recorded.
    pub fn subject_progress(&self, locale: &str, subject: &str, grade: u32) -> GradeProgress {
        self.locales
            .get(locale)
            .and_then(|l| l.get(subject))
            .and_then(|s| s.get(&grade.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Progress for a single unit.
    pub fn unit(&self, locale: &str, subject: &str, grade: u32, unit_id: &str) -> Option<&UnitProgress> {
        self.locales
            .get(locale)?
            .get(subject)?
            .get(&grade.to_string())?
            .get(unit_id)
    }
}
