use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::Question;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonStateError {
    #[error("answer pointer may not move backwards ({from} -> {to})")]
    PointerRegression { from: usize, to: usize },

    #[error("score may not decrease ({from} -> {to})")]
    ScoreRegression { from: u32, to: u32 },

    #[error("answer pointer {pointer} exceeds quiz length {len}")]
    PointerOutOfBounds { pointer: usize, len: usize },

    #[error("score {score} exceeds answer pointer {pointer}")]
    ScoreExceedsPointer { score: u32, pointer: usize },

    #[error("recorded answer for question {index} is outside the answered range")]
    AnswerOutsideRange { index: usize },
}

/// Requested lesson level, fixed at session creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
        };
        write!(f, "{label}")
    }
}

impl FromStr for Difficulty {
    type Err = UnknownLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            _ => Err(UnknownLabelError {
                kind: "Difficulty",
                raw: s.to_string(),
            }),
        }
    }
}

/// Final recommendation produced by the summary stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    Advance,
    Retry,
    Demote,
}

impl Recommendation {
    /// Uppercase label used on the wire and in outbound messages.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Recommendation::Advance => "ADVANCE",
            Recommendation::Retry => "RETRY",
            Recommendation::Demote => "DEMOTE",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Recommendation {
    type Err = UnknownLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADVANCE" => Ok(Recommendation::Advance),
            "RETRY" => Ok(Recommendation::Retry),
            "DEMOTE" => Ok(Recommendation::Demote),
            _ => Err(UnknownLabelError {
                kind: "Recommendation",
                raw: s.to_string(),
            }),
        }
    }
}

/// Error for enum labels that arrive as free text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} label: {raw:?}")]
pub struct UnknownLabelError {
    kind: &'static str,
    raw: String,
}

/// Workflow position of a lesson session.
///
/// `AwaitingAnswer` is the only suspension point: the engine persists state
/// and returns control there, and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Stage {
    #[default]
    Idle,
    Explaining,
    AwaitingAnswer,
    Feedback,
    Done,
}

/// Full state of one lesson attempt, one per active session.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonState {
    topic: String,
    difficulty: Difficulty,
    explanation: String,
    quiz: Vec<Question>,
    answer_pointer: usize,
    answers: BTreeMap<usize, usize>,
    score: u32,
    feedback: String,
    recommendation: Option<Recommendation>,
    stage: Stage,
    started_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl LessonState {
    /// Create the initial state for a fresh lesson attempt.
    #[must_use]
    pub fn new(topic: impl Into<String>, difficulty: Difficulty, now: DateTime<Utc>) -> Self {
        Self {
            topic: topic.into(),
            difficulty,
            explanation: String::new(),
            quiz: Vec::new(),
            answer_pointer: 0,
            answers: BTreeMap::new(),
            score: 0,
            feedback: String::new(),
            recommendation: None,
            stage: Stage::Idle,
            started_at: now,
            updated_at: now,
        }
    }

    /// Merge a partial update into this state, last-write-wins per field.
    ///
    /// Recorded answers are append-only; the pointer and score are monotone.
    ///
    /// # Errors
    ///
    /// Returns `LessonStateError` when the merged state would violate an
    /// invariant (pointer or score regression, pointer past the quiz end,
    /// score past the pointer, or an answer recorded at or past the pointer).
    pub fn apply(&mut self, update: LessonUpdate, now: DateTime<Utc>) -> Result<(), LessonStateError> {
        let quiz_len = update.quiz.as_ref().map_or(self.quiz.len(), Vec::len);
        let pointer = update.answer_pointer.unwrap_or(self.answer_pointer);
        let score = update.score.unwrap_or(self.score);

        if pointer < self.answer_pointer && update.quiz.is_none() {
            return Err(LessonStateError::PointerRegression {
                from: self.answer_pointer,
                to: pointer,
            });
        }
        if score < self.score && update.quiz.is_none() {
            return Err(LessonStateError::ScoreRegression {
                from: self.score,
                to: score,
            });
        }
        if pointer > quiz_len {
            return Err(LessonStateError::PointerOutOfBounds {
                pointer,
                len: quiz_len,
            });
        }
        if score as usize > pointer {
            return Err(LessonStateError::ScoreExceedsPointer { score, pointer });
        }
        for (index, _) in &update.recorded_answers {
            if *index >= pointer {
                return Err(LessonStateError::AnswerOutsideRange { index: *index });
            }
        }

        if let Some(explanation) = update.explanation {
            self.explanation = explanation;
        }
        if let Some(quiz) = update.quiz {
            // A new quiz restarts the answering run.
            self.quiz = quiz;
            self.answers.clear();
        }
        self.answer_pointer = pointer;
        self.score = score;
        for (index, option) in update.recorded_answers {
            self.answers.insert(index, option);
        }
        if let Some(feedback) = update.feedback {
            self.feedback = feedback;
        }
        if let Some(recommendation) = update.recommendation {
            self.recommendation = Some(recommendation);
        }
        if let Some(stage) = update.stage {
            self.stage = stage;
        }
        self.updated_at = now;

        Ok(())
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[must_use]
    pub fn quiz(&self) -> &[Question] {
        &self.quiz
    }

    #[must_use]
    pub fn answer_pointer(&self) -> usize {
        self.answer_pointer
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<usize, usize> {
        &self.answers
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    #[must_use]
    pub fn recommendation(&self) -> Option<Recommendation> {
        self.recommendation
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// The question the pointer currently rests on, if any remain.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.quiz.get(self.answer_pointer)
    }

    /// True once every generated question has been answered.
    #[must_use]
    pub fn quiz_complete(&self) -> bool {
        self.answer_pointer >= self.quiz.len()
    }
}

/// Partial update produced by a stage function or an answer submission.
///
/// Merged into `LessonState` via [`LessonState::apply`]; unset fields are
/// left untouched.
#[derive(Debug, Clone, Default)]
pub struct LessonUpdate {
    pub explanation: Option<String>,
    pub quiz: Option<Vec<Question>>,
    pub answer_pointer: Option<usize>,
    pub recorded_answers: Vec<(usize, usize)>,
    pub score: Option<u32>,
    pub feedback: Option<String>,
    pub recommendation: Option<Recommendation>,
    pub stage: Option<Stage>,
}

impl LessonUpdate {
    /// Update that only moves the workflow stage.
    #[must_use]
    pub fn stage_only(stage: Stage) -> Self {
        Self {
            stage: Some(stage),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionId;
    use crate::time::fixed_now;

    fn question(id: u32, correct: usize) -> Question {
        Question {
            id: QuestionId::new(id),
            text: format!("Q{id}?"),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_index: correct,
            rationale: format!("because {id}"),
        }
    }

    fn state_with_quiz() -> LessonState {
        let mut state = LessonState::new("Photosynthesis", Difficulty::Beginner, fixed_now());
        state
            .apply(
                LessonUpdate {
                    quiz: Some(vec![question(0, 1), question(1, 2)]),
                    answer_pointer: Some(0),
                    score: Some(0),
                    stage: Some(Stage::AwaitingAnswer),
                    ..LessonUpdate::default()
                },
                fixed_now(),
            )
            .unwrap();
        state
    }

    #[test]
    fn merge_is_last_write_wins_per_field() {
        let mut state = LessonState::new("Rust", Difficulty::Intermediate, fixed_now());
        state
            .apply(
                LessonUpdate {
                    explanation: Some("first".into()),
                    stage: Some(Stage::Explaining),
                    ..LessonUpdate::default()
                },
                fixed_now(),
            )
            .unwrap();
        state
            .apply(
                LessonUpdate {
                    explanation: Some("second".into()),
                    ..LessonUpdate::default()
                },
                fixed_now(),
            )
            .unwrap();

        assert_eq!(state.explanation(), "second");
        assert_eq!(state.stage(), Stage::Explaining);
    }

    #[test]
    fn answers_accumulate_and_invariants_hold() {
        let mut state = state_with_quiz();
        state
            .apply(
                LessonUpdate {
                    answer_pointer: Some(1),
                    score: Some(1),
                    recorded_answers: vec![(0, 1)],
                    ..LessonUpdate::default()
                },
                fixed_now(),
            )
            .unwrap();
        state
            .apply(
                LessonUpdate {
                    answer_pointer: Some(2),
                    recorded_answers: vec![(1, 0)],
                    ..LessonUpdate::default()
                },
                fixed_now(),
            )
            .unwrap();

        assert_eq!(state.answer_pointer(), 2);
        assert_eq!(state.score(), 1);
        assert!(state.score() as usize <= state.answer_pointer());
        let keys: Vec<usize> = state.answers().keys().copied().collect();
        assert_eq!(keys, vec![0, 1]);
        assert!(state.quiz_complete());
    }

    #[test]
    fn pointer_regression_is_rejected() {
        let mut state = state_with_quiz();
        state
            .apply(
                LessonUpdate {
                    answer_pointer: Some(1),
                    recorded_answers: vec![(0, 0)],
                    ..LessonUpdate::default()
                },
                fixed_now(),
            )
            .unwrap();

        let err = state
            .apply(
                LessonUpdate {
                    answer_pointer: Some(0),
                    ..LessonUpdate::default()
                },
                fixed_now(),
            )
            .unwrap_err();
        assert_eq!(err, LessonStateError::PointerRegression { from: 1, to: 0 });
        assert_eq!(state.answer_pointer(), 1);
    }

    #[test]
    fn pointer_cannot_pass_quiz_end() {
        let mut state = state_with_quiz();
        let err = state
            .apply(
                LessonUpdate {
                    answer_pointer: Some(3),
                    ..LessonUpdate::default()
                },
                fixed_now(),
            )
            .unwrap_err();
        assert_eq!(err, LessonStateError::PointerOutOfBounds { pointer: 3, len: 2 });
    }

    #[test]
    fn score_cannot_exceed_pointer() {
        let mut state = state_with_quiz();
        let err = state
            .apply(
                LessonUpdate {
                    answer_pointer: Some(1),
                    score: Some(2),
                    recorded_answers: vec![(0, 1)],
                    ..LessonUpdate::default()
                },
                fixed_now(),
            )
            .unwrap_err();
        assert_eq!(err, LessonStateError::ScoreExceedsPointer { score: 2, pointer: 1 });
        assert_eq!(state.score(), 0);
    }

    #[test]
    fn answer_at_pointer_or_past_is_rejected() {
        let mut state = state_with_quiz();
        let err = state
            .apply(
                LessonUpdate {
                    recorded_answers: vec![(0, 1)],
                    ..LessonUpdate::default()
                },
                fixed_now(),
            )
            .unwrap_err();
        assert_eq!(err, LessonStateError::AnswerOutsideRange { index: 0 });
        assert!(state.answers().is_empty());
    }

    #[test]
    fn empty_quiz_is_immediately_complete() {
        let state = LessonState::new("Anything", Difficulty::Advanced, fixed_now());
        assert!(state.quiz_complete());
        assert!(state.current_question().is_none());
    }

    #[test]
    fn recommendation_labels_parse_case_insensitively() {
        assert_eq!("advance".parse::<Recommendation>().unwrap(), Recommendation::Advance);
        assert_eq!("RETRY".parse::<Recommendation>().unwrap(), Recommendation::Retry);
        assert_eq!(" Demote ".parse::<Recommendation>().unwrap(), Recommendation::Demote);
        assert!("sideways".parse::<Recommendation>().is_err());
    }

    #[test]
    fn difficulty_labels_parse() {
        assert_eq!("Beginner".parse::<Difficulty>().unwrap(), Difficulty::Beginner);
        assert_eq!("advanced".parse::<Difficulty>().unwrap(), Difficulty::Advanced);
        assert!("expert".parse::<Difficulty>().is_err());
    }
}
