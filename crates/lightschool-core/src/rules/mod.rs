//! Rule-based fallback replies.
//!
//! The last stage of the tutor pipeline. A lookup keyed by
//! `subject:firstword` picks a canned reply; anything unmatched gets the
//! locale's fixed default sentence. This stage cannot fail.

mod table;

pub use table::{LocaleRules, RuleError, RuleTable};

/// Locale used when a requested locale has no default of its own.
pub const DEFAULT_LOCALE: &str = "en";

/// Default English reply.
pub const ENGLISH_DEFAULT: &str = "Keep practicing! You're doing great.";

/// Default Spanish reply.
pub const SPANISH_DEFAULT: &str = "¡Sigue practicando! Lo estás haciendo genial.";

/// Built-in default reply for a locale, if one exists.
pub fn builtin_default(locale: &str) -> Option<&'static str> {
    match locale {
        "en" => Some(ENGLISH_DEFAULT),
        "es" => Some(SPANISH_DEFAULT),
        _ => None,
    }
}
