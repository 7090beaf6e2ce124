//! Text Provider Abstraction
//!
//! One capability trait with the two call shapes the convergence loop needs:
//! one-shot generation and iterative expansion of prior text. Both concrete
//! providers speak an OpenAI-style chat completions protocol; the convergence
//! loop is tested against mock implementations without network access.

mod mistral;
mod openai;

pub use mistral::MistralProvider;
pub use openai::OpenAiProvider;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::ProviderSettings;
use crate::types::{LoomError, Result};

/// Shared provider handle for concurrent access across section tasks.
pub type SharedProvider = Arc<dyn TextProvider>;

/// Capability interface over an external text-generation API.
///
/// `generate` is the one-shot draft call; `expand` continues prior text under
/// an instruction. Implementations must return an error (not empty text) when
/// the upstream responds with no content, so the retry layer can act on it.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// One-shot generation from a prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Produce a continuation of `prior_text` following `instruction`.
    /// Returns only the continuation, not the combined text.
    async fn expand(&self, prior_text: &str, instruction: &str) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;

    /// Check if the provider is available
    async fn health_check(&self) -> Result<bool>;
}

/// Create a shared provider from configuration
pub fn create_provider(settings: &ProviderSettings) -> Result<SharedProvider> {
    match settings.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(settings.clone())?)),
        "mistral" => Ok(Arc::new(MistralProvider::new(settings.clone())?)),
        other => Err(LoomError::Config(format!(
            "Unknown provider: {}. Supported: openai, mistral",
            other
        ))),
    }
}
