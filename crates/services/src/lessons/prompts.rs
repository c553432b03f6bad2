//! Prompt templates for the three generating stages.
//!
//! The tutoring voice is split across three personas so each stage can be
//! prompted independently; the quiz and feedback prompts ask for raw JSON in
//! the exact shapes `extract::parse_structured` expects.

use tutor_core::model::Difficulty;

/// Number of questions requested per quiz.
pub const QUIZ_SIZE: usize = 3;

pub(crate) fn explain(topic: &str, difficulty: Difficulty) -> String {
    format!(
        "You are Prof. Spark, an expert tutor.\n\
         Explain the topic \"{topic}\" to a student at a {difficulty} level.\n\
         Use clear headings, bullet points, and an analogy.\n\
         Keep it under 300 words."
    )
}

pub(crate) fn quiz(topic: &str, difficulty: Difficulty) -> String {
    format!(
        "You are QuizMaster Q.\n\
         Generate {QUIZ_SIZE} multiple-choice questions for the topic \"{topic}\" \
         at {difficulty} level.\n\n\
         RETURN ONLY RAW JSON. No Markdown. No ```json``` tags.\n\
         Format:\n\
         [\n\
             {{\n\
                 \"id\": 0,\n\
                 \"question\": \"Question text?\",\n\
                 \"options\": [\"A\", \"B\", \"C\", \"D\"],\n\
                 \"correct_index\": 0,\n\
                 \"explanation\": \"Why A is correct.\"\n\
             }}\n\
         ]"
    )
}

pub(crate) fn summary(score: u32, total: usize, topic: &str, difficulty: Difficulty) -> String {
    format!(
        "You are Coach Iris. The student scored {score} out of {total} on \
         \"{topic}\" ({difficulty}).\n\n\
         Analyze their performance.\n\
         1. Give constructive feedback.\n\
         2. Recommend: \"ADVANCE\" (next level), \"RETRY\" (same level), or \
         \"DEMOTE\" (easier).\n\n\
         RETURN ONLY RAW JSON. Format:\n\
         {{\n\
             \"feedback\": \"Your text here...\",\n\
             \"recommendation\": \"ADVANCE\"\n\
         }}"
    )
}
