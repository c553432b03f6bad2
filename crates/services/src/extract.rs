//! Defensive extraction of structured data from generated text.
//!
//! The generation service is asked, by prompt convention only, to return raw
//! JSON. In practice responses arrive wrapped in code fences or surrounded by
//! prose, so the payload is located before parsing: fences are stripped and,
//! when the text opens with `[` or `{`, everything past the matching last
//! bracket is discarded.

use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StructuredParseError {
    #[error("response contained no structured payload")]
    EmptyPayload,
    #[error("failed to parse structured response: {0}")]
    Json(#[from] serde_json::Error),
}

/// Extract a structured value from a free-form generated response.
///
/// # Errors
///
/// Returns `StructuredParseError` when the trimmed response is empty or the
/// located payload is not valid JSON for `T`.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, StructuredParseError> {
    let text = locate_payload(raw);
    if text.is_empty() {
        return Err(StructuredParseError::EmptyPayload);
    }
    Ok(serde_json::from_str(text)?)
}

fn locate_payload(raw: &str) -> &str {
    let mut text = raw.trim();

    // Code fences, with or without the json language tag.
    if let Some(stripped) = text.strip_prefix("```json") {
        text = stripped;
    } else if let Some(stripped) = text.strip_prefix("```") {
        text = stripped;
    }
    if let Some(stripped) = text.strip_suffix("```") {
        text = stripped;
    }
    text = text.trim();

    if text.starts_with('[') {
        if let Some(end) = text.rfind(']') {
            return &text[..=end];
        }
    } else if text.starts_with('{') {
        if let Some(end) = text.rfind('}') {
            return &text[..=end];
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Shape {
        name: String,
        sides: u32,
    }

    #[test]
    fn parses_bare_json() {
        let shape: Shape = parse_structured(r#"{"name": "square", "sides": 4}"#).unwrap();
        assert_eq!(shape.sides, 4);
    }

    #[test]
    fn strips_json_code_fence() {
        let raw = "```json\n{\"name\": \"triangle\", \"sides\": 3}\n```";
        let shape: Shape = parse_structured(raw).unwrap();
        assert_eq!(shape.name, "triangle");
    }

    #[test]
    fn strips_anonymous_code_fence() {
        let raw = "```\n[1, 2, 3]\n```";
        let values: Vec<u32> = parse_structured(raw).unwrap();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn truncates_trailing_prose_after_array() {
        let raw = "[1, 2] and that concludes the list.";
        let values: Vec<u32> = parse_structured(raw).unwrap();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn truncates_trailing_prose_after_object() {
        let raw = "{\"name\": \"circle\", \"sides\": 0} Hope that helps!";
        let shape: Shape = parse_structured(raw).unwrap();
        assert_eq!(shape.name, "circle");
    }

    #[test]
    fn plain_prose_fails() {
        let result: Result<Shape, _> = parse_structured("Here are your questions, enjoy!");
        assert!(matches!(result, Err(StructuredParseError::Json(_))));
    }

    #[test]
    fn empty_response_fails() {
        let result: Result<Shape, _> = parse_structured("```json\n```");
        assert!(matches!(result, Err(StructuredParseError::EmptyPayload)));
    }

    #[test]
    fn leading_prose_before_object_fails() {
        // Only leading fences are stripped; prose ahead of the payload is a
        // parse failure, matching the reference extraction policy.
        let result: Result<Shape, _> =
            parse_structured("Sure! {\"name\": \"square\", \"sides\": 4}");
        assert!(result.is_err());
    }
}
