use thiserror::Error;

/// Failure of the narrator transport itself, as opposed to a bad reply.
#[derive(Debug, Clone, Error)]
pub enum NarratorError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("invalid response envelope: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for NarratorError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            return Self::Timeout(value.to_string());
        }
        Self::Request(value.to_string())
    }
}

/// Every way a turn can fail. A failed turn never touches the game state.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("the company is out of capital; reset to start a new game")]
    GameOver,

    #[error("invalid choice: {0}")]
    InvalidChoice(String),

    #[error("the narrator is unavailable: {0}")]
    NarratorUnavailable(#[from] NarratorError),

    #[error("the narrator returned an unusable reply ({reason})")]
    MalformedResponse { reason: String, raw: String },
}

impl EngineError {
    /// Raw narrator text for a malformed reply.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            EngineError::MalformedResponse { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// Whether repeating the same request can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::NarratorUnavailable(_) | EngineError::MalformedResponse { .. }
        )
    }
}
