//! Stage functions: each takes the current lesson state, makes one
//! generation call, and returns a partial update for the store to merge.
//!
//! Failure policy per stage:
//! - `explain` propagates generation errors; the run aborts and the session
//!   keeps its last persisted state.
//! - `generate_quiz` degrades a malformed response to an empty quiz.
//! - `summarize` degrades a malformed response to a fixed fallback message
//!   and a `Retry` recommendation.

use serde::Deserialize;
use tracing::warn;

use tutor_core::model::{LessonState, LessonUpdate, Question, Recommendation, Stage};

use super::prompts;
use crate::error::LessonError;
use crate::extract::parse_structured;
use crate::generation::TextGenerator;

pub(crate) const FALLBACK_FEEDBACK: &str = "Good effort! (Error generating detailed feedback)";

pub(crate) async fn explain(
    generator: &dyn TextGenerator,
    state: &LessonState,
) -> Result<LessonUpdate, LessonError> {
    let prompt = prompts::explain(state.topic(), state.difficulty());
    let explanation = generator.generate(&prompt).await?;
    Ok(LessonUpdate {
        explanation: Some(explanation),
        stage: Some(Stage::Explaining),
        ..LessonUpdate::default()
    })
}

pub(crate) async fn generate_quiz(
    generator: &dyn TextGenerator,
    state: &LessonState,
) -> Result<LessonUpdate, LessonError> {
    let prompt = prompts::quiz(state.topic(), state.difficulty());
    let response = generator.generate(&prompt).await?;

    let quiz: Vec<Question> = match parse_structured(&response) {
        Ok(quiz) => quiz,
        Err(err) => {
            warn!(topic = state.topic(), %err, "quiz response was malformed, degrading to empty quiz");
            Vec::new()
        }
    };

    Ok(LessonUpdate {
        quiz: Some(quiz),
        answer_pointer: Some(0),
        score: Some(0),
        ..LessonUpdate::default()
    })
}

#[derive(Debug, Deserialize)]
struct FeedbackWire {
    feedback: String,
    recommendation: String,
}

pub(crate) async fn summarize(
    generator: &dyn TextGenerator,
    state: &LessonState,
) -> Result<LessonUpdate, LessonError> {
    let prompt = prompts::summary(
        state.score(),
        state.quiz().len(),
        state.topic(),
        state.difficulty(),
    );
    let response = generator.generate(&prompt).await?;

    let (feedback, recommendation) = match parse_structured::<FeedbackWire>(&response) {
        Ok(wire) => {
            let recommendation = wire.recommendation.parse().unwrap_or_else(|err| {
                warn!(%err, "unrecognized recommendation label, falling back to RETRY");
                Recommendation::Retry
            });
            (wire.feedback, recommendation)
        }
        Err(err) => {
            warn!(topic = state.topic(), %err, "feedback response was malformed, using fallback");
            (FALLBACK_FEEDBACK.to_string(), Recommendation::Retry)
        }
    };

    Ok(LessonUpdate {
        feedback: Some(feedback),
        recommendation: Some(recommendation),
        stage: Some(Stage::Feedback),
        ..LessonUpdate::default()
    })
}
