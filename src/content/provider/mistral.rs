//! Mistral API Provider
//!
//! Secondary provider using Mistral's chat completions API. Used by the
//! convergence loop for expansion rounds and short caption generation; the
//! wire protocol is OpenAI-compatible.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::TextProvider;
use crate::config::ProviderSettings;
use crate::types::{ErrorCategory, ErrorClassifier, LoomError, ProviderError, Result};

const DEFAULT_API_BASE: &str = "https://api.mistral.ai/v1";
const DEFAULT_MODEL: &str = "mistral-large-latest";

const GENERATE_SYSTEM_PROMPT: &str =
    "You are an AI assistant that writes concise, informative report text.";
const EXPAND_SYSTEM_PROMPT: &str =
    "You are an AI assistant tasked with expanding and enhancing text to meet a specific \
     word count. Reply with the additional text only, never repeating the original.";

/// Mistral API Provider with secure API key handling
pub struct MistralProvider {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
}

impl std::fmt::Debug for MistralProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MistralProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl MistralProvider {
    pub fn new(settings: ProviderSettings) -> Result<Self> {
        let api_key_str = settings
            .api_key
            .or_else(|| std::env::var("MISTRAL_API_KEY").ok())
            .ok_or_else(|| {
                LoomError::Config(
                    "Mistral API key not found. Set MISTRAL_API_KEY env var or provide in config"
                        .to_string(),
                )
            })?;

        let api_base = settings
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let model = settings.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| LoomError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key_str),
            api_base,
            model,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            client,
        })
    }

    async fn chat(&self, system: &str, user: String) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user,
                },
            ],
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
        };

        let url = format!("{}/chat/completions", self.api_base);
        debug!("Sending request to Mistral API");

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                LoomError::Provider(ErrorClassifier::classify(
                    &format!("Mistral request failed: {}", e),
                    "mistral",
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ErrorClassifier::classify_http_status(
                status,
                &format!("Mistral API error: {}", body),
                "mistral",
            )
            .into());
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|e| {
            LoomError::Provider(ProviderError::with_provider(
                ErrorCategory::Transient,
                format!("Failed to parse Mistral response: {}", e),
                "mistral",
            ))
        })?;

        let content = body
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::trim)
            .unwrap_or_default();

        if content.is_empty() {
            return Err(ProviderError::with_provider(
                ErrorCategory::Transient,
                "empty completion in Mistral response",
                "mistral",
            )
            .into());
        }

        Ok(content.to_string())
    }
}

#[async_trait]
impl TextProvider for MistralProvider {
    async fn generate(&self, prompt: &str) -> Result<String> {
        info!(
            "Generating with Mistral (model: {}, temperature: {})",
            self.model, self.temperature
        );
        self.chat(GENERATE_SYSTEM_PROMPT, prompt.to_string()).await
    }

    async fn expand(&self, prior_text: &str, instruction: &str) -> Result<String> {
        info!("Expanding with Mistral (model: {})", self.model);
        let user = format!("{}\n\nText so far:\n\n{}", instruction, prior_text);
        self.chat(EXPAND_SYSTEM_PROMPT, user).await
    }

    fn name(&self) -> &str {
        "mistral"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.api_base);

        let response = self
            .client
            .get(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                info!("Mistral API is available");
                Ok(true)
            }
            Ok(resp) => {
                warn!("Mistral API check failed: {}", resp.status());
                Ok(false)
            }
            Err(e) => {
                warn!("Mistral API check failed: {}", e);
                Ok(false)
            }
        }
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
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
