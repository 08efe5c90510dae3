//! Language-model collaborator abstractions.
//!
//! The control loop and the knowledge store only ever see the two traits
//! below: a stateless prompt-in/text-out completion contract and a batch
//! embedding contract. `MistralClient` implements both against the hosted
//! Mistral HTTP APIs; tests substitute deterministic local models.

mod mistral;

pub use mistral::MistralClient;

use async_trait::async_trait;

use crate::error::LlmError;

/// Stateless text-generation service used for planning, writing,
/// reviewing and Q&A.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Generate a completion for a system/user message pair.
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError>;
}

/// Embedding service backing the knowledge store's similarity search.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.embed_batch(std::slice::from_ref(&text.to_string()))
            .await?
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)
    }
}
