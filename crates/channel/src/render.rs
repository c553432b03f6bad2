//! Plain-text rendering of outbound messages.
//!
//! Kept free of any platform markup so a transport can re-encode as needed
//! (Markdown, HTML, console).

use std::fmt::Write as _;

use services::{LessonError, LessonProgress};
use tutor_core::model::{Question, Recommendation};

#[must_use]
pub fn welcome() -> String {
    "Welcome to the tutor!\n\
     Use /learn <topic> to start a lesson.\n\
     Example: /learn Quantum Physics"
        .to_string()
}

#[must_use]
pub fn lesson_starting(topic: &str) -> String {
    format!("Preparing your lesson on {topic}...")
}

#[must_use]
pub fn explanation(text: &str) -> String {
    format!("Prof. Spark says:\n\n{text}")
}

#[must_use]
pub fn quiz_ready(question_count: usize) -> String {
    if question_count == 0 {
        "No quiz this time; skipping straight to feedback.".to_string()
    } else {
        format!("QuizMaster Q has prepared {question_count} questions. Get ready!")
    }
}

/// One question with its options as numbered choices.
#[must_use]
pub fn question(index: usize, total: usize, q: &Question) -> String {
    let mut out = format!("Question {}/{}\n\n{}\n", index + 1, total, q.text);
    for (i, option) in q.options.iter().enumerate() {
        let _ = write!(out, "\n  {}. {}", i + 1, option);
    }
    out
}

#[must_use]
pub fn answer_feedback(is_correct: bool, q: &Question) -> String {
    if is_correct {
        "Correct!".to_string()
    } else {
        format!("Wrong. {}", q.rationale)
    }
}

/// Final assessment. A lesson whose quiz never materialized still reports
/// its score as "0 out of 0".
#[must_use]
pub fn summary(feedback: &str, recommendation: Recommendation, progress: &LessonProgress) -> String {
    format!(
        "Coach Iris' analysis:\n\nYou scored {} out of {}.\n\n{feedback}\n\nRecommendation: {}",
        progress.score,
        progress.total,
        recommendation.label()
    )
}

/// User-visible notice for an engine error; one line, no internals.
#[must_use]
pub fn lesson_error(err: &LessonError) -> String {
    match err {
        LessonError::UnknownSession(_) => {
            "No lesson in progress. Use /learn <topic> to start one.".to_string()
        }
        LessonError::StaleAnswer { .. } => {
            "That isn't the current question.".to_string()
        }
        LessonError::OutOfRangeAnswer { .. } => "That option does not exist.".to_string(),
        LessonError::NotSuspended(_) => "The lesson is not waiting for an answer.".to_string(),
        LessonError::Generation(_) => {
            "The tutor is unavailable right now. Please try /learn again in a moment.".to_string()
        }
        _ => "Something went wrong. Please try again.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_core::model::QuestionId;

    fn sample_question() -> Question {
        Question {
            id: QuestionId::new(0),
            text: "What gas do plants absorb?".into(),
            options: vec!["CO2".into(), "O2".into(), "N2".into(), "He".into()],
            correct_index: 0,
            rationale: "Plants fix carbon dioxide.".into(),
        }
    }

    #[test]
    fn question_lists_numbered_options() {
        let text = question(0, 2, &sample_question());
        assert!(text.starts_with("Question 1/2"));
        assert!(text.contains("1. CO2"));
        assert!(text.contains("4. He"));
    }

    #[test]
    fn wrong_answer_carries_rationale() {
        let text = answer_feedback(false, &sample_question());
        assert!(text.contains("Plants fix carbon dioxide."));
        assert_eq!(answer_feedback(true, &sample_question()), "Correct!");
    }

    #[test]
    fn summary_shows_score_and_recommendation_label() {
        let progress = LessonProgress {
            total: 3,
            answered: 3,
            remaining: 0,
            score: 1,
            is_complete: true,
        };
        let text = summary("Keep at it.", Recommendation::Demote, &progress);
        assert!(text.contains("You scored 1 out of 3."));
        assert!(text.contains("Keep at it."));
        assert!(text.contains("DEMOTE"));
    }
}
