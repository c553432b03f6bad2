use std::sync::Arc;

use tracing::{debug, info};

use storage::{SessionRepository, StorageError};
use tutor_core::Clock;
use tutor_core::model::{Difficulty, LessonState, LessonUpdate, Question, SessionId, Stage};

use super::stages;
use crate::error::LessonError;
use crate::generation::TextGenerator;

/// Where a workflow run ended up.
///
/// A run either reaches `Done` or suspends at `AwaitingAnswer` with its state
/// persisted; a failed run surfaces as the `Err` branch instead of a variant
/// here, leaving the session at its last-good snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The engine persisted state at `AwaitingAnswer` and returned control.
    Suspended,
    /// The workflow ran through feedback; final state attached.
    Completed(LessonState),
}

/// Notification produced by a stage during a run, in execution order, so the
/// channel adapter can relay progress to the user. The summary itself is not
/// an event: it travels in the final state of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageEvent {
    Explained { explanation: String },
    QuizReady { question_count: usize },
}

/// Result of one accepted answer submission.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    /// The question that was answered, for relaying its rationale.
    pub question: Question,
    pub state: LessonState,
    /// True once every question is answered; the caller should `resume`.
    pub quiz_complete: bool,
}

/// Lesson workflow engine: a fixed linear stage sequence
/// (explain → quiz → await answers → summarize) with exactly one suspension
/// point, `AwaitingAnswer`.
///
/// The engine performs no locking. Callers must serialize start/answer/resume
/// events per session id; events for distinct sessions are independent.
#[derive(Clone)]
pub struct LessonService {
    clock: Clock,
    store: Arc<dyn SessionRepository>,
    generator: Arc<dyn TextGenerator>,
}

impl LessonService {
    #[must_use]
    pub fn new(
        clock: Clock,
        store: Arc<dyn SessionRepository>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            clock,
            store,
            generator,
        }
    }

    /// Start a fresh lesson attempt, replacing any previous one for the
    /// session, and run the workflow until it suspends or completes.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::Generation` if the explanation or summary call
    /// fails (the session keeps its last persisted state, so retrying is
    /// safe), or `LessonError::Storage` on store failures.
    pub async fn start_lesson(
        &self,
        id: SessionId,
        topic: impl Into<String>,
        difficulty: Difficulty,
    ) -> Result<(RunOutcome, Vec<StageEvent>), LessonError> {
        let state = LessonState::new(topic, difficulty, self.clock.now());
        info!(session = %id, topic = state.topic(), "starting lesson");
        self.store.create(id, state.clone()).await?;

        let mut events = Vec::new();

        let update = stages::explain(self.generator.as_ref(), &state).await?;
        let state = self.store.apply_update(id, update).await?;
        events.push(StageEvent::Explained {
            explanation: state.explanation().to_string(),
        });

        let update = stages::generate_quiz(self.generator.as_ref(), &state).await?;
        let state = self.store.apply_update(id, update).await?;
        events.push(StageEvent::QuizReady {
            question_count: state.quiz().len(),
        });

        // Transition rule: questions remaining means suspend; an empty quiz
        // falls straight through to feedback without suspending.
        if state.quiz_complete() {
            debug!(session = %id, "quiz is empty, continuing to feedback");
            let state = self.finish(id, &state).await?;
            Ok((RunOutcome::Completed(state), events))
        } else {
            self.store
                .apply_update(id, LessonUpdate::stage_only(Stage::AwaitingAnswer))
                .await?;
            debug!(session = %id, questions = state.quiz().len(), "suspending for answers");
            Ok((RunOutcome::Suspended, events))
        }
    }

    /// Validate and record one quiz answer.
    ///
    /// Only the question under the answer pointer is accepted; on acceptance
    /// the pointer advances, the answer is recorded, and the score is updated
    /// in one atomic store merge. Rejections never mutate state.
    ///
    /// # Errors
    ///
    /// `UnknownSession` if no state exists, `StaleAnswer` if
    /// `question_index` is not the current pointer, `OutOfRangeAnswer` if
    /// `option_index` does not address an option.
    pub async fn submit_answer(
        &self,
        id: SessionId,
        question_index: usize,
        option_index: usize,
    ) -> Result<AnswerOutcome, LessonError> {
        let state = self.load(id).await?;

        let expected = state.answer_pointer();
        if question_index != expected {
            return Err(LessonError::StaleAnswer {
                submitted: question_index,
                expected,
            });
        }
        let Some(question) = state.current_question() else {
            // Pointer at quiz end: nothing left to answer.
            return Err(LessonError::StaleAnswer {
                submitted: question_index,
                expected,
            });
        };
        if !question.has_option(option_index) {
            return Err(LessonError::OutOfRangeAnswer {
                question_index,
                option_index,
            });
        }

        let question = question.clone();
        let is_correct = question.is_correct(option_index);
        let update = LessonUpdate {
            answer_pointer: Some(expected + 1),
            score: Some(state.score() + u32::from(is_correct)),
            recorded_answers: vec![(question_index, option_index)],
            ..LessonUpdate::default()
        };
        let state = self.store.apply_update(id, update).await?;

        info!(
            session = %id,
            question = question_index,
            correct = is_correct,
            score = state.score(),
            "answer recorded"
        );
        Ok(AnswerOutcome {
            is_correct,
            question,
            quiz_complete: state.quiz_complete(),
            state,
        })
    }

    /// Resume a suspended workflow.
    ///
    /// Re-evaluates the same transition rule as `start_lesson`: if questions
    /// remain the session re-suspends (a no-op), otherwise the summary stage
    /// runs and the lesson completes.
    ///
    /// # Errors
    ///
    /// `UnknownSession` if no state exists, `NotSuspended` unless the session
    /// sits at `AwaitingAnswer`, `Generation`/`Storage` for stage failures.
    pub async fn resume(&self, id: SessionId) -> Result<RunOutcome, LessonError> {
        let state = self.load(id).await?;
        if state.stage() != Stage::AwaitingAnswer {
            return Err(LessonError::NotSuspended(id));
        }

        if !state.quiz_complete() {
            debug!(session = %id, "questions remain, staying suspended");
            return Ok(RunOutcome::Suspended);
        }

        let state = self.finish(id, &state).await?;
        Ok(RunOutcome::Completed(state))
    }

    /// Current snapshot for a session.
    ///
    /// # Errors
    ///
    /// `UnknownSession` if no state exists.
    pub async fn state(&self, id: SessionId) -> Result<LessonState, LessonError> {
        self.load(id).await
    }

    /// Run summarize and close the workflow: `Feedback` then `Done`.
    async fn finish(&self, id: SessionId, state: &LessonState) -> Result<LessonState, LessonError> {
        let update = stages::summarize(self.generator.as_ref(), state).await?;
        self.store.apply_update(id, update).await?;
        let state = self
            .store
            .apply_update(id, LessonUpdate::stage_only(Stage::Done))
            .await?;
        info!(
            session = %id,
            score = state.score(),
            total = state.quiz().len(),
            recommendation = ?state.recommendation(),
            "lesson complete"
        );
        Ok(state)
    }

    async fn load(&self, id: SessionId) -> Result<LessonState, LessonError> {
        match self.store.get(id).await {
            Ok(state) => Ok(state),
            Err(StorageError::NotFound) => Err(LessonError::UnknownSession(id)),
            Err(err) => Err(err.into()),
        }
    }
}
