pub mod anthropic;
pub mod openai;
pub mod prompts;

pub use anthropic::*;
pub use openai::*;
pub use prompts::*;

use async_trait::async_trait;

use crate::error::CompletionError;

/// A language model that turns a prompt into text
///
/// Model and temperature belong to the client configuration. Implementations
/// must be safe to call concurrently from the per-document fan-out.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}
