use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::NarratorSettings;
use crate::engine::error::NarratorError;
use crate::engine::prompt_builder::{PromptBuilder, TurnContext};

/// The external text generator that narrates each turn.
pub trait Narrator {
    fn generate(&self, context: &TurnContext) -> Result<String, NarratorError>;
}

#[derive(Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

#[derive(Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<Choice>,
}

#[derive(Deserialize)]
pub struct Choice {
    pub message: ChatMessageResponse,
}

#[derive(Deserialize)]
pub struct ChatMessageResponse {
    #[serde(default)]
    pub content: Option<String>,
}

/// Narrator backed by an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiNarrator {
    settings: NarratorSettings,
    client: Client,
}

impl OpenAiNarrator {
    pub fn new(settings: NarratorSettings) -> Result<Self, NarratorError> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .build()?;
        Ok(Self { settings, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    fn api_key(&self) -> Result<&str, NarratorError> {
        self.settings
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                NarratorError::Config(
                    "no API key configured; set OPENAI_API_KEY".to_string(),
                )
            })
    }

    /// Lists the models the endpoint serves, as a one-line summary.
    pub fn test_connection(&self) -> Result<String, NarratorError> {
        let response = self
            .client
            .get(self.endpoint("models"))
            .bearer_auth(self.api_key()?)
            .send()?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(NarratorError::Auth(format!("endpoint answered {status}")));
        }
        if !status.is_success() {
            return Err(NarratorError::Request(format!("endpoint answered {status}")));
        }

        let body: serde_json::Value = response
            .json()
            .map_err(|e| NarratorError::InvalidResponse(e.to_string()))?;

        Ok(format!(
            "Connected ({} models available)",
            body["data"].as_array().map(|a| a.len()).unwrap_or(0)
        ))
    }
}

impl Narrator for OpenAiNarrator {
    fn generate(&self, context: &TurnContext) -> Result<String, NarratorError> {
        let api_key = self.api_key()?;
        let prompt = PromptBuilder::build(context);

        let req = ChatCompletionRequest {
            model: self.settings.model.clone(),
            temperature: self.settings.temperature,
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: prompt.system,
                },
                ChatMessage {
                    role: "user".into(),
                    content: prompt.user,
                },
            ],
        };

        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(api_key)
            .json(&req)
            .send()?;

        let status = response.status();
        tracing::debug!(%status, model = %self.settings.model, "narrator responded");

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(NarratorError::Auth(format!(
                "endpoint answered {status}; check the API key"
            )));
        }
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(NarratorError::Request(format!("endpoint answered {status}: {text}")));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .map_err(|e| NarratorError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| {
                NarratorError::InvalidResponse("missing choices[0].message".to_string())
            })
    }
}
