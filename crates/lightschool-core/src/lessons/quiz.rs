//! Quiz scoring.

use std::collections::HashMap;

use super::pack::QuizQuestion;

/// Score a quiz as a rounded percentage of correct answers.
///
/// `answers` maps question id to the chosen choice index. Unanswered
/// questions count as wrong. An empty quiz scores 0.
pub fn score_quiz(questions: &[QuizQuestion], answers: &HashMap<String, usize>) -> u32 {
    if questions.is_empty() {
        return 0;
    }

    let correct = questions
        .iter()
        .filter(|q| answers.get(&q.id) == Some(&q.answer_index))
        .count();

    ((correct as f64 / questions.len() as f64) * 100.0).round() as u32
}
