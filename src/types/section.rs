//! Section request and generated content types.
//!
//! A `SectionRequest` is the immutable per-section input built by the document
//! assembler; `GeneratedContent` is what the convergence engine hands back.

use serde::{Deserialize, Serialize};

use crate::content::wordcount;
use crate::types::{LoomError, Result};

/// Default tolerance as a percentage of the target word count
pub const DEFAULT_TOLERANCE_PCT: usize = 10;

/// Immutable input describing one report section to draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionRequest {
    /// Section name (e.g. "Introduction", "Methodology")
    pub name: String,
    /// Brief topic description supplied by the user
    pub description: String,
    /// Target word count for the section body
    pub target_word_count: usize,
    /// Acceptable shortfall in words. Defaults to 10% of the target.
    pub tolerance: usize,
}

impl SectionRequest {
    /// Create a request with the default tolerance (10% of target).
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        target_word_count: usize,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            target_word_count,
            tolerance: target_word_count * DEFAULT_TOLERANCE_PCT / 100,
        }
    }

    /// Override the tolerance in words.
    pub fn with_tolerance(mut self, tolerance: usize) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Minimum acceptable word count (`target - tolerance`, floored at zero).
    pub fn acceptance_floor(&self) -> usize {
        self.target_word_count.saturating_sub(self.tolerance)
    }

    /// Validate request fields are usable.
    pub fn validate(&self) -> Result<()> {
        if self.target_word_count == 0 {
            return Err(LoomError::InvalidRequest(format!(
                "section '{}': target_word_count must be positive",
                self.name
            )));
        }
        if self.description.trim().is_empty() {
            return Err(LoomError::InvalidRequest(format!(
                "section '{}': description must not be empty",
                self.name
            )));
        }
        Ok(())
    }
}

/// Body text produced for a section.
///
/// `word_count` is always recomputed from `text` at construction; it is never
/// carried forward from a previous measurement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedContent {
    /// Final section text
    pub text: String,
    /// Whitespace-delimited word count of `text`
    pub word_count: usize,
    /// Whether the target (within tolerance) was reached
    pub met_target: bool,
}

impl GeneratedContent {
    pub fn new(text: String, met_target: bool) -> Self {
        let word_count = wordcount::count(&text);
        Self {
            text,
            word_count,
            met_target,
        }
    }
}

/// Raw source text handed to structure extraction. Treated as opaque text,
/// never executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceUnit {
    pub raw_text: String,
}

impl SourceUnit {
    pub fn new(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tolerance_is_ten_percent() {
        let request = SectionRequest::new("Introduction", "background of the project", 500);
        assert_eq!(request.tolerance, 50);
        assert_eq!(request.acceptance_floor(), 450);
    }

    #[test]
    fn test_tolerance_override() {
        let request = SectionRequest::new("Results", "experiment outcomes", 300).with_tolerance(0);
        assert_eq!(request.acceptance_floor(), 300);
    }

    #[test]
    fn test_validate_rejects_zero_target() {
        let request = SectionRequest::new("Results", "experiment outcomes", 0);
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_description() {
        let request = SectionRequest::new("Results", "   ", 200);
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_word_count_recomputed() {
        let content = GeneratedContent::new("one two three".to_string(), true);
        assert_eq!(content.word_count, 3);
        assert!(content.met_target);
    }
}
