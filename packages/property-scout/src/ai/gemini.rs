//! Gemini implementation of the Inference trait.
//!
//! Calls the `generateContent` endpoint with the shared system instruction
//! and a single user turn carrying the prompt and its grounding facts.
//!
//! # Example
//!
//! ```rust,ignore
//! use property_scout::ai::Gemini;
//!
//! let gemini = Gemini::new(api_key).with_model("gemini-2.5-pro");
//! let pipeline = Pipeline::new(source, gemini);
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::error::{InferenceError, InferenceResult};
use crate::pipeline::prompts::{with_grounding, SYSTEM_PROMPT};
use crate::security::{ApiKey, ServiceCredentials};
use crate::traits::inference::{GroundingContext, Inference};

pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const MAX_OUTPUT_TOKENS: u32 = 2048;

/// Google Gemini client.
#[derive(Clone)]
pub struct Gemini {
    client: Client,
    credentials: ServiceCredentials,
    model: String,
    temperature: f32,
}

impl Gemini {
    pub fn new(api_key: impl Into<ApiKey>) -> Self {
        Self {
            client: Client::new(),
            credentials: ServiceCredentials::new(api_key.into(), GEMINI_API_URL),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            temperature: 0.2,
        }
    }

    /// Create from `GEMINI_API_KEY`, falling back to `GOOGLE_API_KEY`.
    pub fn from_env() -> InferenceResult<Self> {
        let api_key = ApiKey::from_env(&["GEMINI_API_KEY", "GOOGLE_API_KEY"])
            .ok_or_else(|| InferenceError::Config("GEMINI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set the model (default: gemini-2.5-flash).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.credentials = ServiceCredentials::new(self.credentials.api_key.clone(), url);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.credentials.base_url, self.model
        )
    }

    fn request_body(&self, prompt: &str, context: &GroundingContext) -> Value {
        json!({
            "system_instruction": {
                "parts": [{"text": SYSTEM_PROMPT}]
            },
            "contents": [{
                "role": "user",
                "parts": [{"text": with_grounding(prompt, context)}]
            }],
            "generation_config": {
                "temperature": self.temperature,
                "max_output_tokens": MAX_OUTPUT_TOKENS
            }
        })
    }

    /// Concatenated text parts of the first candidate.
    fn parse_response(body: &Value) -> InferenceResult<String> {
        let parts = body
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                let reason = body
                    .pointer("/promptFeedback/blockReason")
                    .and_then(Value::as_str)
                    .unwrap_or("missing candidates");
                InferenceError::Parse(reason.to_string())
            })?;

        let text: String = parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect();

        if text.trim().is_empty() {
            return Err(InferenceError::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl Inference for Gemini {
    async fn infer(&self, prompt: &str, context: &GroundingContext) -> InferenceResult<String> {
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.credentials.api_key.expose())])
            .json(&self.request_body(prompt, context))
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

        let body: Value = response
            .json()
            .await
            .map_err(|e| InferenceError::Parse(e.to_string()))?;

        tracing::debug!(model = %self.model, "Gemini response received");
        Self::parse_response(&body)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
