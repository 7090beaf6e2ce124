//! Configuration Types
//!
//! All configuration structures with sensible defaults. The engine receives
//! its configuration at construction; nothing reads process-wide state
//! mid-algorithm, so tests can inject fake providers and tuned values.

use serde::{Deserialize, Serialize};

use crate::constants::{convergence, diagram, network, retry};
use crate::types::{LoomError, Result, DEFAULT_TOLERANCE_PCT};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Configuration version
    pub version: String,

    /// Primary provider (one-shot section generation)
    pub primary: ProviderSettings,

    /// Secondary provider (iterative expansion, captions)
    pub secondary: ProviderSettings,

    /// Content convergence tuning
    pub convergence: ConvergenceSettings,

    /// Diagram layout tuning
    pub diagram: DiagramSettings,

    /// Outbound retry policy
    pub retry: RetrySettings,

    /// Maximum simultaneous outbound provider calls
    pub max_concurrent_requests: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            primary: ProviderSettings::openai_defaults(),
            secondary: ProviderSettings::mistral_defaults(),
            convergence: ConvergenceSettings::default(),
            diagram: DiagramSettings::default(),
            retry: RetrySettings::default(),
            max_concurrent_requests: network::MAX_CONCURRENT_REQUESTS,
        }
    }
}

impl EngineConfig {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `LoomError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_requests == 0 {
            return Err(LoomError::Config(
                "max_concurrent_requests must be greater than 0".to_string(),
            ));
        }
        if self.convergence.max_expansion_rounds == 0 {
            return Err(LoomError::Config(
                "convergence.max_expansion_rounds must be greater than 0".to_string(),
            ));
        }
        if self.convergence.overshoot_factor < 1.0 {
            return Err(LoomError::Config(format!(
                "convergence.overshoot_factor must be >= 1.0, got {}",
                self.convergence.overshoot_factor
            )));
        }
        if self.diagram.capacity_threshold == 0 {
            return Err(LoomError::Config(
                "diagram.capacity_threshold must be greater than 0".to_string(),
            ));
        }
        self.primary.validate("primary")?;
        self.secondary.validate("secondary")?;
        Ok(())
    }
}

// =============================================================================
// Provider Settings
// =============================================================================

/// Configuration for one text provider.
///
/// Note: API keys are handled securely - they are never serialized to output.
/// Each provider converts the key to SecretString internally for runtime
/// protection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Provider type: "openai", "mistral"
    pub provider: String,
    /// Model name (provider-specific, None = provider default)
    pub model: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Temperature for generation (0.0 = deterministic)
    pub temperature: f32,
    /// API key. Never serialized to output for security.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,
    /// Maximum tokens to generate
    pub max_tokens: usize,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self::openai_defaults()
    }
}

impl ProviderSettings {
    pub fn openai_defaults() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            temperature: 0.7,
            api_key: None,
            api_base: None,
            max_tokens: 4096,
        }
    }

    pub fn mistral_defaults() -> Self {
        Self {
            provider: "mistral".to_string(),
            ..Self::openai_defaults()
        }
    }

    fn validate(&self, role: &str) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(LoomError::Config(format!(
                "{}.timeout_secs must be greater than 0",
                role
            )));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(LoomError::Config(format!(
                "{}.temperature must be between 0.0 and 2.0, got {}",
                role, self.temperature
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Convergence Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceSettings {
    /// Maximum expansion rounds before returning best-effort content
    pub max_expansion_rounds: usize,
    /// Overshoot factor triggering sentence-boundary trimming
    pub overshoot_factor: f64,
    /// Default tolerance (percent of target) when a request doesn't set one
    pub tolerance_pct: usize,
}

impl Default for ConvergenceSettings {
    fn default() -> Self {
        Self {
            max_expansion_rounds: convergence::MAX_EXPANSION_ROUNDS,
            overshoot_factor: convergence::OVERSHOOT_FACTOR,
            tolerance_pct: DEFAULT_TOLERANCE_PCT,
        }
    }
}

// =============================================================================
// Diagram Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramSettings {
    /// Canvas width in pixels
    pub canvas_width: u32,
    /// Canvas height in pixels
    pub canvas_height: u32,
    /// Entity count above which node and font sizes shrink proportionally
    /// (nodes are never omitted)
    pub capacity_threshold: usize,
}

impl Default for DiagramSettings {
    fn default() -> Self {
        Self {
            canvas_width: diagram::CANVAS_WIDTH,
            canvas_height: diagram::CANVAS_HEIGHT,
            capacity_threshold: diagram::CAPACITY_THRESHOLD,
        }
    }
}

// =============================================================================
// Retry Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum attempts per outbound call
    pub max_attempts: u32,
    /// Base delay for exponential backoff (milliseconds)
    pub base_delay_ms: u64,
    /// Maximum delay between retries (seconds)
    pub max_delay_secs: u64,
    /// Backoff multiplier
    pub backoff_factor: f32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: retry::DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: retry::BASE_DELAY_MS,
            max_delay_secs: retry::MAX_DELAY_SECS,
            backoff_factor: retry::BACKOFF_FACTOR,
        }
    }
}
