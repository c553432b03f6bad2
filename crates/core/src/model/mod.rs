mod ids;
mod lesson;
mod question;

pub use ids::{ParseIdError, QuestionId, SessionId};
pub use lesson::{
    Difficulty, LessonState, LessonStateError, LessonUpdate, Recommendation, Stage,
    UnknownLabelError,
};
pub use question::Question;
