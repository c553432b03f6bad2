mod engine;
mod prompts;
mod stages;
mod view;

// Public API of the lesson subsystem.
pub use crate::error::LessonError;
pub use engine::{AnswerOutcome, LessonService, RunOutcome, StageEvent};
pub use view::{LessonProgress, next_question};
