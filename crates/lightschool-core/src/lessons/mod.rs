//! Lesson packs: loading, validation and quiz scoring.

mod pack;
mod quiz;
mod schema;

pub use pack::{Card, LessonError, LessonPack, LessonStore, QuizQuestion, Unit};
pub use quiz::score_quiz;
pub use schema::{validate_lesson_pack, SchemaError};
