//! Inference provider implementations.

#[cfg(feature = "gemini")]
pub mod gemini;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "gemini")]
pub use gemini::Gemini;

#[cfg(feature = "openai")]
pub use openai::OpenAI;
