#![forbid(unsafe_code)]

pub mod error;
pub mod extract;
pub mod generation;
pub mod lessons;

pub use tutor_core::Clock;

pub use error::{GenerationError, LessonError};
pub use extract::{StructuredParseError, parse_structured};
pub use generation::{GenerationConfig, OpenAiGenerator, TextGenerator};
pub use lessons::{
    AnswerOutcome, LessonProgress, LessonService, RunOutcome, StageEvent, next_question,
};
