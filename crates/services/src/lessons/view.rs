use tutor_core::model::{LessonState, Question};

/// The next unanswered question, or `None` when the quiz is exhausted (or
/// was never generated) and the workflow is ready to resume.
///
/// Read-only projection; no side effects.
#[must_use]
pub fn next_question(state: &LessonState) -> Option<&Question> {
    state.current_question()
}

/// Aggregated quiz progress, useful for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub score: u32,
    pub is_complete: bool,
}

impl LessonProgress {
    #[must_use]
    pub fn of(state: &LessonState) -> Self {
        let total = state.quiz().len();
        let answered = state.answer_pointer();
        Self {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            score: state.score(),
            is_complete: state.quiz_complete(),
        }
    }
}
