//! Request and reply types shared by every stage of the tutor pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A student question, as received from the host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorRequest {
    /// Free-text message typed by the student
    pub message: String,

    /// Subject identifier (e.g., "math", "english")
    pub subject: String,

    /// School grade, starting at 1
    pub grade: u32,

    /// Language tag controlling reply language (e.g., "en", "es")
    pub locale: String,
}

impl TutorRequest {
    pub fn new(
        message: impl Into<String>,
        subject: impl Into<String>,
        grade: u32,
        locale: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            subject: subject.into(),
            grade,
            locale: locale.into(),
        }
    }
}

/// Which pipeline stage produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    /// The message was arithmetic and was evaluated locally
    Calculator,

    /// The generative-text backend answered
    Backend,

    /// The static rule table answered
    Rules,
}

impl ReplySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplySource::Calculator => "calculator",
            ReplySource::Backend => "backend",
            ReplySource::Rules => "rules",
        }
    }
}

impl fmt::Display for ReplySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single reply produced for a [`TutorRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorReply {
    pub reply: String,
    pub source: ReplySource,
}

impl TutorReply {
    pub fn calculator(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            source: ReplySource::Calculator,
        }
    }

    pub fn backend(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            source: ReplySource::Backend,
        }
    }

    pub fn rules(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            source: ReplySource::Rules,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_serializes_lowercase_source() {
        let reply = TutorReply::calculator("19");
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json, serde_json::json!({"reply": "19", "source": "calculator"}));
    }

    #[test]
    fn test_source_display() {
        assert_eq!(ReplySource::Backend.to_string(), "backend");
        assert_eq!(ReplySource::Rules.as_str(), "rules");
    }

    #[test]
    fn test_request_roundtrip_from_host_json() {
        let request: TutorRequest = serde_json::from_str(
            r#"{"message": "What is addition?", "subject": "math", "grade": 1, "locale": "en"}"#,
        )
        .unwrap();
        assert_eq!(request, TutorRequest::new("What is addition?", "math", 1, "en"));
    }
}
