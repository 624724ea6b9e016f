use thiserror::Error;

use crate::model::turn_record::{TurnPayload, TurnRecord};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no balanced JSON object found")]
    NoObject,
    #[error("object does not match the turn shape: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid options: {0}")]
    InvalidOptions(String),
}

/// Locates the first `{` and its matching `}` in free text.
///
/// Braces inside JSON string literals (including escaped quotes) do not count
/// towards the nesting depth. Returns `None` when no opening brace exists or
/// the object is never closed.
pub fn extract_object_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(&raw[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Decodes raw narrator output into a validated record.
pub fn parse_turn(raw: &str) -> Result<TurnRecord, ParseError> {
    let span = extract_object_span(raw).ok_or(ParseError::NoObject)?;
    let payload: TurnPayload = serde_json::from_str(span)?;
    TurnRecord::try_from(payload).map_err(ParseError::InvalidOptions)
}
