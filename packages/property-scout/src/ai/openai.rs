//! OpenAI implementation of the Inference trait.
//!
//! An alternate provider using chat completions.
//!
//! # Example
//!
//! ```rust,ignore
//! use property_scout::ai::OpenAI;
//!
//! let ai = OpenAI::new("sk-...").with_model("gpt-4o");
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{InferenceError, InferenceResult};
use crate::pipeline::prompts::{with_grounding, SYSTEM_PROMPT};
use crate::security::{ApiKey, ServiceCredentials};
use crate::traits::inference::{GroundingContext, Inference};

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// OpenAI chat-completions client.
#[derive(Clone)]
pub struct OpenAI {
    client: Client,
    credentials: ServiceCredentials,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAI {
    /// Create a new OpenAI client with the given API key.
    pub fn new(api_key: impl Into<ApiKey>) -> Self {
        Self {
            client: Client::new(),
            credentials: ServiceCredentials::new(api_key.into(), OPENAI_API_URL),
            model: DEFAULT_OPENAI_MODEL.to_string(),
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> InferenceResult<Self> {
        let api_key = ApiKey::from_env(&["OPENAI_API_KEY"])
            .ok_or_else(|| InferenceError::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set the chat model (default: gpt-4o).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.credentials = ServiceCredentials::new(self.credentials.api_key.clone(), url);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn chat_request(&self, prompt: &str, context: &GroundingContext) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: with_grounding(prompt, context),
                },
            ],
            temperature: 0.0,
        }
    }
}

#[async_trait]
impl Inference for OpenAI {
    async fn infer(&self, prompt: &str, context: &GroundingContext) -> InferenceResult<String> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.credentials.base_url))
            .bearer_auth(self.credentials.api_key.expose())
            .json(&self.chat_request(prompt, context))
            .send()
            .await
            .map_err(|e| InferenceError::Http(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(InferenceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::Parse(e.to_string()))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(InferenceError::EmptyResponse)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_builder() {
        let ai = OpenAI::new("sk-test")
            .with_model("gpt-4o-mini")
            .with_base_url("https://proxy.example/v1/");
        assert_eq!(ai.model(), "gpt-4o-mini");
        assert_eq!(ai.credentials.base_url, "https://proxy.example/v1");
        assert_eq!(ai.name(), "openai");
    }

    #[test]
    fn test_chat_request_shape() {
        let ai = OpenAI::new("sk-test");
        let context = GroundingContext::new().fact("listings_considered", 5);
        let body = serde_json::to_value(ai.chat_request("Summarize", &context)).unwrap();

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["messages"][0]["role"], "system");
        assert!(body["messages"][1]["content"]
            .as_str()
            .unwrap()
            .contains("listings_considered"));
    }

    #[test]
    fn test_response_without_content() {
        let chat: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap();
        assert!(chat.choices[0].message.content.is_none());
    }
}
