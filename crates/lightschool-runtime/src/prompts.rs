//! Prompts for the tutor backend.
//!
//! The system prompt pins the model to a one-line JSON reply so the answer
//! can be read back without trusting free-form output. `{locale}` is
//! substituted per request.

use lightschool_core::TutorRequest;

use crate::providers::GenerateRequest;

/// Persona and output contract for the tutor.
pub const TUTOR_SYSTEM_PROMPT: &str = "You are Lumi, a cheerful K–5 tutor. \
Respond ONLY with a single JSON object on the first line: \
{\"answer\":\"<one short kid-friendly sentence>\"}. \
No explanations, no chain-of-thought, no step-by-step. \
Use language: {locale}. Keep the answer under 140 characters.";

/// Per-question prompt.
pub const TUTOR_USER_PROMPT: &str =
    "Subject: {subject}, Grade: {grade}. Question: {message}\nReturn only JSON on the first line.";

/// Renders prompts for a tutor request.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_template: String,
    user_template: String,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self {
            system_template: TUTOR_SYSTEM_PROMPT.to_string(),
            user_template: TUTOR_USER_PROMPT.to_string(),
        }
    }

    pub fn system_prompt(&self, locale: &str) -> String {
        self.system_template.replace("{locale}", locale)
    }

    pub fn user_prompt(&self, request: &TutorRequest) -> String {
        // The message goes in last so placeholders inside it stay literal
        self.user_template
            .replace("{subject}", &request.subject)
            .replace("{grade}", &request.grade.to_string())
            .replace("{message}", &request.message)
    }

    /// Build the prompt pair sent to the provider.
    pub fn build(&self, request: &TutorRequest) -> GenerateRequest {
        GenerateRequest::new(self.system_prompt(&request.locale), self.user_prompt(request))
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> TutorRequest {
        TutorRequest::new("Why is the sky blue?", "science", 3, "es")
    }

    #[test]
    fn test_system_prompt_contract() {
        let prompt = PromptBuilder::new().system_prompt("es");
        assert!(prompt.starts_with("You are Lumi"));
        assert!(prompt.contains(r#"{"answer":"<one short kid-friendly sentence>"}"#));
        assert!(prompt.contains("Use language: es."));
        assert!(prompt.contains("under 140 characters"));
        assert!(!prompt.contains("{locale}"));
    }

    #[test]
    fn test_user_prompt() {
        let prompt = PromptBuilder::new().user_prompt(&request());
        assert_eq!(
            prompt,
            "Subject: science, Grade: 3. Question: Why is the sky blue?\nReturn only JSON on the first line."
        );
    }

    #[test]
    fn test_message_placeholders_stay_literal() {
        let request = TutorRequest::new("what is {subject}?", "math", 1, "en");
        let prompt = PromptBuilder::new().user_prompt(&request);
        assert!(prompt.contains("Question: what is {subject}?"));
    }

    #[test]
    fn test_build_pair() {
        let pair = PromptBuilder::new().build(&request());
        assert!(pair.system.contains("Use language: es"));
        assert!(pair.combined().contains("\nSubject: science"));
    }
}
