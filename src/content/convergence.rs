//! Content Convergence Engine
//!
//! The generate → measure → expand loop that drives section text toward a
//! target word count. A primary provider drafts the section in one shot; if
//! the draft falls short of `target - tolerance`, a secondary provider is
//! asked for continuations until the target is met or the round budget runs
//! out. Falling short after all rounds is a partial success
//! (`met_target = false`), not an error.
//!
//! ## Guarantees
//!
//! - If the primary draft already meets the target, no expansion call is made.
//! - Word count never decreases across rounds: a shrinking or no-op expansion
//!   is retried once with a stronger instruction, then the round is abandoned.
//! - The loop runs at most `max_expansion_rounds` rounds.
//! - Moderate overshoot is kept as-is; overshoot beyond
//!   `target * overshoot_factor` is trimmed back to a sentence boundary at or
//!   below `target + tolerance`, never mid-sentence.
//!
//! Outbound calls pass through a shared semaphore (provider rate limits are a
//! bounded resource), an explicit timeout, and the bounded retry policy.

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::{ConvergenceSettings, EngineConfig};
use crate::content::provider::SharedProvider;
use crate::content::retry::RetryPolicy;
use crate::content::timeout::with_timeout;
use crate::content::wordcount;
use crate::types::{
    ErrorCategory, GeneratedContent, LoomError, ProviderError, Result, SectionRequest,
};

/// Drives section drafts toward their target word count.
pub struct ConvergenceEngine {
    primary: SharedProvider,
    secondary: SharedProvider,
    settings: ConvergenceSettings,
    retry: RetryPolicy,
    primary_timeout: Duration,
    secondary_timeout: Duration,
    /// Concurrency gate over all outbound provider calls
    gate: Semaphore,
    max_concurrency: usize,
}

impl ConvergenceEngine {
    /// Build an engine from two providers and tuning values. Providers are
    /// injected so tests can run the loop against mocks without network
    /// access.
    pub fn new(primary: SharedProvider, secondary: SharedProvider, config: &EngineConfig) -> Self {
        Self {
            primary,
            secondary,
            settings: config.convergence.clone(),
            retry: RetryPolicy::from_settings(&config.retry),
            primary_timeout: Duration::from_secs(config.primary.timeout_secs),
            secondary_timeout: Duration::from_secs(config.secondary.timeout_secs),
            gate: Semaphore::new(config.max_concurrent_requests),
            max_concurrency: config.max_concurrent_requests,
        }
    }

    /// Build an engine with both providers constructed from configuration.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let primary = crate::content::provider::create_provider(&config.primary)?;
        let secondary = crate::content::provider::create_provider(&config.secondary)?;
        Ok(Self::new(primary, secondary, config))
    }

    /// Generate section text meeting `target_word_count` within tolerance.
    ///
    /// Fails only when the primary provider yields no content after the retry
    /// budget; a content shortfall after all expansion rounds returns
    /// best-effort text with `met_target = false`.
    pub async fn expand_to_target(&self, request: &SectionRequest) -> Result<GeneratedContent> {
        request.validate()?;

        let target = request.target_word_count;
        let floor = request.acceptance_floor();
        let prompt = self.primary_prompt(request);

        let mut text = self.call_primary(&prompt).await?;
        let mut words = wordcount::count(&text);
        debug!(
            section = %request.name,
            words,
            target,
            "primary draft measured"
        );

        // Idempotent short-circuit: primary met the target, no expansion
        if words >= floor {
            return Ok(self.finish(text, words, request, true));
        }

        for round in 1..=self.settings.max_expansion_rounds {
            let deficit = target - words;
            match self.run_expansion_round(request, &text, words, deficit, round).await {
                Ok(Some(expanded)) => {
                    text = expanded;
                    words = wordcount::count(&text);
                    debug!(section = %request.name, round, words, "expansion round grew text");
                    if words >= floor {
                        return Ok(self.finish(text, words, request, true));
                    }
                }
                Ok(None) => {
                    // Round produced no growth even after the strengthened
                    // retry; remaining rounds may still make progress.
                    warn!(section = %request.name, round, "expansion round produced no growth");
                }
                Err(err) => {
                    // The draft is usable; hand it back as a partial result
                    // rather than discarding work the orchestrator can place.
                    warn!(
                        section = %request.name,
                        round,
                        error = %err,
                        "expansion provider failed, returning partial content"
                    );
                    return Ok(GeneratedContent::new(text, false));
                }
            }
        }

        info!(
            section = %request.name,
            words,
            target,
            "round budget exhausted below target"
        );
        Ok(GeneratedContent::new(text, false))
    }

    /// Run many section requests concurrently, preserving input order in the
    /// output. Failures are per-section; one failed section never aborts the
    /// others.
    pub async fn expand_many(
        &self,
        requests: Vec<SectionRequest>,
    ) -> Vec<Result<GeneratedContent>> {
        let mut indexed: Vec<(usize, Result<GeneratedContent>)> =
            futures::stream::iter(requests.into_iter().enumerate())
                .map(|(i, request)| async move { (i, self.expand_to_target(&request).await) })
                .buffer_unordered(self.max_concurrency.max(1))
                .collect()
                .await;
        indexed.sort_by_key(|(i, _)| *i);
        indexed.into_iter().map(|(_, result)| result).collect()
    }

    /// One-shot short text for an image caption, drafted by the secondary
    /// provider.
    pub async fn caption(&self, section: &str, image_name: &str) -> Result<String> {
        let prompt = format!(
            "Generate a brief, informative caption for an image named '{}' in the {} section of a report.",
            image_name, section
        );
        self.retry
            .run("caption generation", || async {
                let _permit = self.acquire_permit().await?;
                with_timeout(
                    self.secondary_timeout,
                    self.secondary.generate(&prompt),
                    "caption generation",
                )
                .await
            })
            .await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// One expansion round: ask for ~`deficit` more words, enforce monotonic
    /// growth, retry once with a stronger instruction on a no-op response.
    /// Returns the grown text, or `None` when the round is abandoned.
    async fn run_expansion_round(
        &self,
        request: &SectionRequest,
        text: &str,
        words: usize,
        deficit: usize,
        round: usize,
    ) -> Result<Option<String>> {
        info!(section = %request.name, round, deficit, "expansion round");

        let instruction = self.expansion_instruction(request, deficit, false);
        let continuation = self.call_secondary(text, &instruction).await?;
        let candidate = append_continuation(text, &continuation);
        if wordcount::count(&candidate) > words {
            return Ok(Some(candidate));
        }

        debug!(section = %request.name, round, "no-op expansion, retrying with stronger instruction");
        let stronger = self.expansion_instruction(request, deficit, true);
        let continuation = self.call_secondary(text, &stronger).await?;
        let candidate = append_continuation(text, &continuation);
        if wordcount::count(&candidate) > words {
            return Ok(Some(candidate));
        }

        Ok(None)
    }

    /// Accept text, trimming extreme overshoot back to a sentence boundary.
    fn finish(
        &self,
        text: String,
        words: usize,
        request: &SectionRequest,
        met_target: bool,
    ) -> GeneratedContent {
        let ceiling =
            (request.target_word_count as f64 * self.settings.overshoot_factor) as usize;
        if words > ceiling {
            let budget = request.target_word_count + request.tolerance;
            debug!(
                section = %request.name,
                words,
                budget,
                "trimming overshoot to sentence boundary"
            );
            let trimmed = wordcount::trim_to_sentence_boundary(&text, budget);
            return GeneratedContent::new(trimmed, met_target);
        }
        GeneratedContent::new(text, met_target)
    }

    fn primary_prompt(&self, request: &SectionRequest) -> String {
        format!(
            "Generate a {}-word '{}' section for a report based on this description: {}",
            request.target_word_count, request.name, request.description
        )
    }

    fn expansion_instruction(
        &self,
        request: &SectionRequest,
        deficit: usize,
        stronger: bool,
    ) -> String {
        if stronger {
            format!(
                "The text is still {} words short. Write at least {} additional words of new \
                 supporting detail about '{}'. Do not repeat any prior sentence.",
                deficit, deficit, request.description
            )
        } else {
            format!(
                "Add approximately {} more words elaborating on '{}' without repeating prior \
                 sentences.",
                deficit, request.description
            )
        }
    }

    async fn call_primary(&self, prompt: &str) -> Result<String> {
        self.retry
            .run("primary generation", || async {
                let _permit = self.acquire_permit().await?;
                with_timeout(
                    self.primary_timeout,
                    self.primary.generate(prompt),
                    "primary generation",
                )
                .await
            })
            .await
    }

    async fn call_secondary(&self, prior_text: &str, instruction: &str) -> Result<String> {
        self.retry
            .run("expansion", || async {
                let _permit = self.acquire_permit().await?;
                with_timeout(
                    self.secondary_timeout,
                    self.secondary.expand(prior_text, instruction),
                    "expansion",
                )
                .await
            })
            .await
    }

    async fn acquire_permit(&self) -> Result<tokio::sync::SemaphorePermit<'_>> {
        self.gate.acquire().await.map_err(|_| {
            LoomError::Provider(ProviderError::new(
                ErrorCategory::Unavailable,
                "request gate closed",
            ))
        })
    }
}

/// Append a continuation with a paragraph break.
fn append_continuation(text: &str, continuation: &str) -> String {
    let continuation = continuation.trim();
    if continuation.is_empty() {
        return text.to_string();
    }
    format!("{}\n\n{}", text.trim_end(), continuation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::provider::TextProvider;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn words(n: usize) -> String {
        (0..n)
            .map(|i| format!("w{}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    struct MockProvider {
        draft: String,
        growth_per_call: usize,
        fail_expand: bool,
        generate_calls: AtomicU32,
        expand_calls: AtomicU32,
    }

    impl MockProvider {
        fn drafting(draft_words: usize) -> Self {
            Self::with_draft(words(draft_words))
        }

        fn with_draft(draft: String) -> Self {
            Self {
                draft,
                growth_per_call: 0,
                fail_expand: false,
                generate_calls: AtomicU32::new(0),
                expand_calls: AtomicU32::new(0),
            }
        }

        fn expanding(growth_per_call: usize) -> Self {
            Self {
                growth_per_call,
                ..Self::drafting(0)
            }
        }

        fn failing_expansion() -> Self {
            Self {
                fail_expand: true,
                ..Self::drafting(0)
            }
        }
    }

    #[async_trait]
    impl TextProvider for MockProvider {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.draft.clone())
        }

        async fn expand(&self, _prior_text: &str, _instruction: &str) -> Result<String> {
            self.expand_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_expand {
                return Err(LoomError::Provider(ProviderError::new(
                    ErrorCategory::BadRequest,
                    "mock expansion failure",
                )));
            }
            Ok(words(self.growth_per_call))
        }

        fn name(&self) -> &str {
            "mock"
        }

        fn model(&self) -> &str {
            "mock-model"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn engine(primary: Arc<MockProvider>, secondary: Arc<MockProvider>) -> ConvergenceEngine {
        ConvergenceEngine::new(primary, secondary, &EngineConfig::default())
    }

    #[tokio::test]
    async fn test_draft_meeting_target_skips_expansion() {
        let primary = Arc::new(MockProvider::drafting(460));
        let secondary = Arc::new(MockProvider::expanding(100));
        let engine = engine(primary.clone(), secondary.clone());

        let request = SectionRequest::new("Overview", "service overview", 500);
        let content = engine.expand_to_target(&request).await.unwrap();

        assert!(content.met_target);
        assert_eq!(content.word_count, 460);
        assert_eq!(secondary.expand_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expansion_rounds_grow_to_target() {
        let primary = Arc::new(MockProvider::drafting(300));
        let secondary = Arc::new(MockProvider::expanding(100));
        let engine = engine(primary.clone(), secondary.clone());

        let request = SectionRequest::new("Details", "detailed design", 500);
        let content = engine.expand_to_target(&request).await.unwrap();

        // 300 -> 400 -> 500: two rounds, floor at 450
        assert!(content.met_target);
        assert_eq!(content.word_count, 500);
        assert_eq!(secondary.expand_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_plateau_exhausts_rounds_and_returns_partial() {
        let primary = Arc::new(MockProvider::drafting(300));
        let secondary = Arc::new(MockProvider::expanding(0));
        let engine = engine(primary.clone(), secondary.clone());

        let request = SectionRequest::new("Stuck", "never grows", 500);
        let content = engine.expand_to_target(&request).await.unwrap();

        assert!(!content.met_target);
        assert_eq!(content.word_count, 300);
        assert!(!content.text.is_empty());
        // Each abandoned round makes a normal and a strengthened attempt.
        assert_eq!(
            secondary.expand_calls.load(Ordering::SeqCst) as usize,
            2 * crate::constants::convergence::MAX_EXPANSION_ROUNDS
        );
    }

    #[tokio::test]
    async fn test_slow_growth_stays_monotonic_and_returns_partial() {
        let primary = Arc::new(MockProvider::drafting(300));
        let secondary = Arc::new(MockProvider::expanding(2));
        let engine = engine(primary.clone(), secondary.clone());

        let request = SectionRequest::new("Slow", "barely grows", 500);
        let content = engine.expand_to_target(&request).await.unwrap();

        // 300 + 2 per round over 5 rounds: 310 words, still below the floor.
        assert!(!content.met_target);
        assert_eq!(content.word_count, 310);
        assert!(!content.text.is_empty());
        assert_eq!(secondary.expand_calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_expansion_failure_returns_partial_not_error() {
        let primary = Arc::new(MockProvider::drafting(300));
        let secondary = Arc::new(MockProvider::failing_expansion());
        let engine = engine(primary.clone(), secondary.clone());

        let request = SectionRequest::new("Fragile", "expansion dies", 500);
        let content = engine.expand_to_target(&request).await.unwrap();

        assert!(!content.met_target);
        assert_eq!(content.word_count, 300);
    }

    #[tokio::test]
    async fn test_extreme_overshoot_trimmed_to_sentence_boundary() {
        // Five 4-word sentences: 20 words against a target of 10.
        let draft = "One two three four. Five six seven eight. \
                     Nine ten eleven twelve. More filler words here. Final sentence goes here."
            .to_string();
        let primary = Arc::new(MockProvider::with_draft(draft));
        let secondary = Arc::new(MockProvider::expanding(0));
        let engine = engine(primary.clone(), secondary.clone());

        let request = SectionRequest::new("Tiny", "short section", 10).with_tolerance(1);
        let content = engine.expand_to_target(&request).await.unwrap();

        assert!(content.met_target);
        assert!(content.word_count <= 11, "got {}", content.word_count);
        assert!(content.text.ends_with('.'));
    }

    #[tokio::test]
    async fn test_moderate_overshoot_kept_as_is() {
        let primary = Arc::new(MockProvider::drafting(550));
        let secondary = Arc::new(MockProvider::expanding(0));
        let engine = engine(primary.clone(), secondary.clone());

        let request = SectionRequest::new("Over", "slightly long", 500);
        let content = engine.expand_to_target(&request).await.unwrap();

        // 550 < 500 * 1.5, so nothing is trimmed.
        assert!(content.met_target);
        assert_eq!(content.word_count, 550);
    }

    #[tokio::test]
    async fn test_expand_many_preserves_request_order() {
        let primary = Arc::new(MockProvider::drafting(500));
        let secondary = Arc::new(MockProvider::expanding(0));
        let engine = engine(primary.clone(), secondary.clone());

        let requests = vec![
            SectionRequest::new("First", "a", 500),
            SectionRequest::new("Second", "b", 500),
            SectionRequest::new("Third", "c", 500),
        ];
        let results = engine.expand_many(requests).await;

        assert_eq!(results.len(), 3);
        for result in results {
            assert!(result.unwrap().met_target);
        }
        assert_eq!(primary.generate_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_caption_uses_secondary_provider() {
        let primary = Arc::new(MockProvider::drafting(10));
        let secondary = Arc::new(MockProvider::with_draft("A short caption.".to_string()));
        let engine = engine(primary.clone(), secondary.clone());

        let caption = engine.caption("Architecture", "diagram.svg").await.unwrap();
        assert_eq!(caption, "A short caption.");
        assert_eq!(secondary.generate_calls.load(Ordering::SeqCst), 1);
        assert_eq!(primary.generate_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_append_continuation_paragraph_break() {
        let combined = append_continuation("First part.\n", "  Second part.  ");
        assert_eq!(combined, "First part.\n\nSecond part.");
    }

    #[test]
    fn test_append_empty_continuation_is_noop() {
        assert_eq!(append_continuation("Body.", "   "), "Body.");
    }
}
