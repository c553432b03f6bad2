//! Shared error types for the services crate.

use thiserror::Error;

use storage::StorageError;
use tutor_core::model::SessionId;

/// Errors emitted by a [`crate::TextGenerator`].
///
/// Generation failures are never retried: one failed call is fatal for the
/// stage invocation that made it (the session keeps its last persisted state).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("text generation is not configured")]
    Disabled,
    #[error("text generation returned an empty response")]
    EmptyResponse,
    #[error("text generation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by the lesson workflow engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LessonError {
    #[error("no lesson in progress for session {0}")]
    UnknownSession(SessionId),

    #[error("answer for question {submitted} arrived while question {expected} is current")]
    StaleAnswer { submitted: usize, expected: usize },

    #[error("option {option_index} is out of range for question {question_index}")]
    OutOfRangeAnswer {
        question_index: usize,
        option_index: usize,
    },

    #[error("lesson for session {0} is not awaiting an answer")]
    NotSuspended(SessionId),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
