//! Generative backend
//!
//! Anything that turns an ordered list of role-tagged messages into text.

use crate::models::Message;
use crate::Result;
use async_trait::async_trait;

pub mod gemini;
pub use gemini::GeminiGenerator;

/// Trait for text generation (LLM backed)
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce a completion for the given prompt messages
    async fn generate(&self, messages: &[Message]) -> Result<String>;
}
