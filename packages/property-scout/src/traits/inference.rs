//! Inference trait: the language-model collaborator.
//!
//! The pipeline never asks a model for numbers it has not already computed.
//! Every call carries a [`GroundingContext`] of locally derived facts
//! (aggregates, baselines, counts), and the prompt asks the model to stay
//! consistent with them.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{InferenceError, InferenceResult};

/// Numeric facts handed to the model alongside a prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroundingContext {
    facts: Map<String, Value>,
}

impl GroundingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fact. Values that fail to serialize are recorded as null.
    pub fn fact(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.facts.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.facts.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Pretty JSON for embedding in a prompt.
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(&self.facts).unwrap_or_else(|_| "{}".to_string())
    }
}

/// The inference collaborator.
///
/// Implementations wrap a specific provider (Gemini, OpenAI) and return the
/// model's raw text. Parsing that text is the caller's concern.
#[async_trait]
pub trait Inference: Send + Sync {
    /// Complete `prompt`, grounded in `context`.
    async fn infer(&self, prompt: &str, context: &GroundingContext) -> InferenceResult<String>;

    /// Provider name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}

#[async_trait]
impl<T: Inference + ?Sized> Inference for Arc<T> {
    async fn infer(&self, prompt: &str, context: &GroundingContext) -> InferenceResult<String> {
        (**self).infer(prompt, context).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<T: Inference + ?Sized> Inference for Box<T> {
    async fn infer(&self, prompt: &str, context: &GroundingContext) -> InferenceResult<String> {
        (**self).infer(prompt, context).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Call `infer` with an optional time bound, treating blank output as an
/// error.
pub async fn infer_bounded<I: Inference + ?Sized>(
    inference: &I,
    prompt: &str,
    context: &GroundingContext,
    timeout: Option<Duration>,
) -> InferenceResult<String> {
    let call = inference.infer(prompt, context);
    let text = match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| InferenceError::Timeout)??,
        None => call.await?,
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(InferenceError::EmptyResponse);
    }
    Ok(trimmed.to_string())
}
