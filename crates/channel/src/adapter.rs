//! Event-dispatch glue between the chat transport and the lesson engine.
//!
//! The adapter owns the per-session serialization the engine requires: one
//! async mutex per session id guarantees that start, answer, and resume
//! events for the same user never interleave, while distinct users proceed
//! independently.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::warn;

use services::{LessonError, LessonProgress, LessonService, RunOutcome, StageEvent, next_question};
use tutor_core::model::{LessonState, Recommendation, SessionId};

use crate::command::{CommandError, Inbound};
use crate::render;

/// Failure delivering an outbound message.
#[derive(Debug, Error)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

/// Outbound side of the chat platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Deliver one message to the user behind `session`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the platform rejects the message.
    async fn send(&self, session: SessionId, text: String) -> Result<(), TransportError>;
}

/// Drives the lesson engine from inbound chat events and relays every
/// outbound message through the transport.
///
/// Engine errors become user-visible notices; only transport failures
/// propagate to the caller.
pub struct ChannelAdapter {
    lessons: Arc<LessonService>,
    transport: Arc<dyn ChatTransport>,
    // One tiny mutex per user; entries are never removed, which is fine for
    // the same per-user cardinality the session store itself carries.
    locks: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl ChannelAdapter {
    #[must_use]
    pub fn new(lessons: Arc<LessonService>, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            lessons,
            transport,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Handle a typed chat message.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` only for outbound delivery failures.
    pub async fn handle_message(
        &self,
        session: SessionId,
        text: &str,
    ) -> Result<(), TransportError> {
        match Inbound::parse_message(text) {
            Ok(event) => self.dispatch(session, event).await,
            Err(CommandError::NotACommand(_)) => self.send(session, render::welcome()).await,
            Err(err) => self.send(session, err.to_string()).await,
        }
    }

    /// Handle an answer-button callback payload.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` only for outbound delivery failures.
    pub async fn handle_callback(
        &self,
        session: SessionId,
        data: &str,
    ) -> Result<(), TransportError> {
        match Inbound::parse_callback(data) {
            Ok(event) => self.dispatch(session, event).await,
            Err(err) => {
                warn!(session = %session, %err, "rejected callback payload");
                self.send(session, err.to_string()).await
            }
        }
    }

    /// Dispatch one parsed event, serialized per session.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` only for outbound delivery failures.
    pub async fn dispatch(&self, session: SessionId, event: Inbound) -> Result<(), TransportError> {
        let lock = self.session_lock(session).await;
        let _serialized = lock.lock().await;

        match event {
            Inbound::Start => self.send(session, render::welcome()).await,
            Inbound::Learn { topic, difficulty } => {
                self.send(session, render::lesson_starting(&topic)).await?;
                match self.lessons.start_lesson(session, topic, difficulty).await {
                    Ok((outcome, events)) => {
                        for event in events {
                            self.relay_stage_event(session, event).await?;
                        }
                        match outcome {
                            RunOutcome::Suspended => {
                                let state = match self.lessons.state(session).await {
                                    Ok(state) => state,
                                    Err(err) => return self.notify_error(session, &err).await,
                                };
                                self.send_current_question(session, &state).await
                            }
                            // Empty quiz: the run fell straight through to
                            // feedback, so the summary goes out immediately.
                            RunOutcome::Completed(state) => {
                                self.send_summary(session, &state).await
                            }
                        }
                    }
                    Err(err) => self.notify_error(session, &err).await,
                }
            }
            Inbound::Answer {
                question_index,
                option_index,
            } => {
                let outcome = match self
                    .lessons
                    .submit_answer(session, question_index, option_index)
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(err) => return self.notify_error(session, &err).await,
                };

                self.send(
                    session,
                    render::answer_feedback(outcome.is_correct, &outcome.question),
                )
                .await?;

                if outcome.quiz_complete {
                    // All answers are in: wake the engine for feedback.
                    match self.lessons.resume(session).await {
                        Ok(RunOutcome::Completed(state)) => self.send_summary(session, &state).await,
                        Ok(RunOutcome::Suspended) => Ok(()),
                        Err(err) => self.notify_error(session, &err).await,
                    }
                } else {
                    self.send_current_question(session, &outcome.state).await
                }
            }
        }
    }

    async fn relay_stage_event(
        &self,
        session: SessionId,
        event: StageEvent,
    ) -> Result<(), TransportError> {
        let text = match event {
            StageEvent::Explained { explanation } => render::explanation(&explanation),
            StageEvent::QuizReady { question_count } => render::quiz_ready(question_count),
        };
        self.send(session, text).await
    }

    async fn send_summary(
        &self,
        session: SessionId,
        state: &LessonState,
    ) -> Result<(), TransportError> {
        let recommendation = state.recommendation().unwrap_or(Recommendation::Retry);
        let text = render::summary(state.feedback(), recommendation, &LessonProgress::of(state));
        self.send(session, text).await
    }

    async fn send_current_question(
        &self,
        session: SessionId,
        state: &LessonState,
    ) -> Result<(), TransportError> {
        if let Some(question) = next_question(state) {
            let text = render::question(state.answer_pointer(), state.quiz().len(), question);
            self.send(session, text).await?;
        }
        Ok(())
    }

    async fn notify_error(
        &self,
        session: SessionId,
        err: &LessonError,
    ) -> Result<(), TransportError> {
        warn!(session = %session, %err, "lesson event rejected");
        self.send(session, render::lesson_error(err)).await
    }

    async fn send(&self, session: SessionId, text: String) -> Result<(), TransportError> {
        self.transport.send(session, text).await
    }

    async fn session_lock(&self, session: SessionId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(session)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
