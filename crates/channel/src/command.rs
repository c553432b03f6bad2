//! Inbound chat events.
//!
//! Two surfaces feed the adapter: typed text commands (`/start`,
//! `/learn <topic>`) and compact answer callbacks (`ans:<question>:<option>`)
//! emitted by the option buttons. Malformed input is a typed error, never a
//! panic.

use std::str::FromStr;

use thiserror::Error;

use tutor_core::model::Difficulty;

/// Prefix carried by answer callback payloads.
pub const ANSWER_PREFIX: &str = "ans";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CommandError {
    #[error("not a command: {0:?}")]
    NotACommand(String),

    #[error("unknown command: /{0}")]
    Unknown(String),

    #[error("'/learn' needs a topic, e.g. /learn History of Rome")]
    MissingTopic,

    #[error("malformed answer payload: {0:?}")]
    MalformedAnswer(String),
}

/// A parsed inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// `/start` — greet and explain usage.
    Start,
    /// `/learn <topic>` — begin a lesson.
    Learn {
        topic: String,
        difficulty: Difficulty,
    },
    /// `ans:<question_index>:<option_index>` — answer the current question.
    Answer {
        question_index: usize,
        option_index: usize,
    },
}

impl Inbound {
    /// Parse a typed chat message.
    ///
    /// An optional difficulty may trail the topic after `@`, e.g.
    /// `/learn Photosynthesis @advanced`; it defaults to beginner.
    ///
    /// # Errors
    ///
    /// Returns `CommandError` for non-commands, unknown commands, or a
    /// `/learn` without a topic.
    pub fn parse_message(text: &str) -> Result<Self, CommandError> {
        let text = text.trim();
        let Some(rest) = text.strip_prefix('/') else {
            return Err(CommandError::NotACommand(text.to_string()));
        };

        let (command, args) = match rest.split_once(char::is_whitespace) {
            Some((command, args)) => (command, args.trim()),
            None => (rest, ""),
        };

        match command {
            "start" => Ok(Inbound::Start),
            "learn" => {
                let (topic, difficulty) = match args.rsplit_once('@') {
                    Some((topic, level)) => match Difficulty::from_str(level) {
                        Ok(difficulty) => (topic.trim(), difficulty),
                        // Not a level tag; treat the whole thing as topic.
                        Err(_) => (args, Difficulty::default()),
                    },
                    None => (args, Difficulty::default()),
                };
                if topic.is_empty() {
                    return Err(CommandError::MissingTopic);
                }
                Ok(Inbound::Learn {
                    topic: topic.to_string(),
                    difficulty,
                })
            }
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }

    /// Parse an answer callback payload: three colon-separated fields.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::MalformedAnswer` unless the payload is exactly
    /// `ans:<int>:<int>`.
    pub fn parse_callback(data: &str) -> Result<Self, CommandError> {
        let malformed = || CommandError::MalformedAnswer(data.to_string());

        let mut parts = data.split(':');
        if parts.next() != Some(ANSWER_PREFIX) {
            return Err(malformed());
        }
        let question_index = parts
            .next()
            .and_then(|raw| raw.parse::<usize>().ok())
            .ok_or_else(malformed)?;
        let option_index = parts
            .next()
            .and_then(|raw| raw.parse::<usize>().ok())
            .ok_or_else(malformed)?;
        if parts.next().is_some() {
            return Err(malformed());
        }

        Ok(Inbound::Answer {
            question_index,
            option_index,
        })
    }
}

/// Encode the callback payload attached to an option button.
#[must_use]
pub fn answer_callback(question_index: usize, option_index: usize) -> String {
    format!("{ANSWER_PREFIX}:{question_index}:{option_index}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_start() {
        assert_eq!(Inbound::parse_message("/start").unwrap(), Inbound::Start);
    }

    #[test]
    fn parses_learn_with_topic() {
        let cmd = Inbound::parse_message("/learn History of Rome").unwrap();
        assert_eq!(
            cmd,
            Inbound::Learn {
                topic: "History of Rome".into(),
                difficulty: Difficulty::Beginner,
            }
        );
    }

    #[test]
    fn parses_learn_with_difficulty_tag() {
        let cmd = Inbound::parse_message("/learn Quantum Physics @advanced").unwrap();
        assert_eq!(
            cmd,
            Inbound::Learn {
                topic: "Quantum Physics".into(),
                difficulty: Difficulty::Advanced,
            }
        );
    }

    #[test]
    fn learn_without_topic_is_rejected() {
        assert_eq!(
            Inbound::parse_message("/learn").unwrap_err(),
            CommandError::MissingTopic
        );
        assert_eq!(
            Inbound::parse_message("/learn   ").unwrap_err(),
            CommandError::MissingTopic
        );
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(matches!(
            Inbound::parse_message("/teach me things"),
            Err(CommandError::Unknown(_))
        ));
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert!(matches!(
            Inbound::parse_message("hello there"),
            Err(CommandError::NotACommand(_))
        ));
    }

    #[test]
    fn parses_answer_callback() {
        let cmd = Inbound::parse_callback("ans:1:3").unwrap();
        assert_eq!(
            cmd,
            Inbound::Answer {
                question_index: 1,
                option_index: 3,
            }
        );
    }

    #[test]
    fn callback_roundtrip() {
        let payload = answer_callback(2, 0);
        assert_eq!(
            Inbound::parse_callback(&payload).unwrap(),
            Inbound::Answer {
                question_index: 2,
                option_index: 0,
            }
        );
    }

    #[test]
    fn malformed_callbacks_are_rejected() {
        for raw in ["ans:1", "ans:1:2:3", "ans:x:2", "ans:1:-2", "vote:1:2", ""] {
            assert!(
                matches!(
                    Inbound::parse_callback(raw),
                    Err(CommandError::MalformedAnswer(_))
                ),
                "payload {raw:?} should be rejected"
            );
        }
    }
}
