use serde::{Deserialize, Serialize};

use crate::model::QuestionId;

/// One multiple-choice quiz question, immutable once generated.
///
/// The serde field names follow the wire shape the generation service is
/// asked to produce: the prompt requests `question` and `explanation`, which
/// map onto `text` and `rationale` here. Four options are expected but not
/// enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    #[serde(rename = "question")]
    pub text: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    #[serde(rename = "explanation")]
    pub rationale: String,
}

impl Question {
    /// Returns true if `option_index` names the correct option.
    #[must_use]
    pub fn is_correct(&self, option_index: usize) -> bool {
        option_index == self.correct_index
    }

    /// Returns true if `option_index` addresses an existing option.
    #[must_use]
    pub fn has_option(&self, option_index: usize) -> bool {
        option_index < self.options.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_wire_shape() {
        let raw = r#"{
            "id": 0,
            "question": "What pigment drives photosynthesis?",
            "options": ["Chlorophyll", "Keratin", "Melanin", "Hemoglobin"],
            "correct_index": 0,
            "explanation": "Chlorophyll absorbs the light energy."
        }"#;

        let q: Question = serde_json::from_str(raw).unwrap();
        assert_eq!(q.id, QuestionId::new(0));
        assert_eq!(q.text, "What pigment drives photosynthesis?");
        assert_eq!(q.options.len(), 4);
        assert!(q.is_correct(0));
        assert!(!q.is_correct(1));
        assert!(q.has_option(3));
        assert!(!q.has_option(4));
    }
}
