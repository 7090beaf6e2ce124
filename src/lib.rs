//! ReportLoom - Report Content and Diagram Engine
//!
//! Stateless core for AI-assisted report generation. Two subsystems:
//!
//! - **Content convergence**: drafts section text with a primary provider and
//!   iteratively expands it with a secondary provider until the word count
//!   reaches the requested target window, trimming overshoot at sentence
//!   boundaries. Falling short after the round limit is a partial success,
//!   not an error.
//! - **Structure diagrams**: parses Python source into a closed entity graph
//!   (modules, classes, functions, call edges) and renders it as a
//!   deterministic SVG image. Identical input always yields identical bytes.
//!
//! ## Quick Start
//!
//! ```ignore
//! use reportloom::{ConvergenceEngine, SectionRequest, StructureExtractor};
//! use reportloom::config::ConfigLoader;
//! use reportloom::diagram;
//!
//! let config = ConfigLoader::load()?;
//! let engine = ConvergenceEngine::from_config(&config)?;
//! let request = SectionRequest::new("Architecture", "Describe the service layout", 500);
//! let content = engine.expand_to_target(&request).await?;
//!
//! let graph = StructureExtractor::new()?.extract(&source_unit)?;
//! let image = diagram::render(&graph, &config.diagram);
//! ```
//!
//! ## Modules
//!
//! - [`content`]: text providers, retry/timeout plumbing, convergence engine
//! - [`analyzer`]: Python structure extraction via tree-sitter
//! - [`diagram`]: deterministic layout and SVG rendering
//! - [`config`]: figment-based configuration with env overrides
//! - [`types`]: shared request/result/graph/error types

pub mod analyzer;
pub mod config;
pub mod constants;
pub mod content;
pub mod diagram;
pub mod telemetry;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{ConfigLoader, DiagramSettings, EngineConfig};

// Error Types
pub use types::error::{ErrorCategory, LoomError, ProviderError, Result};

// Content
pub use content::{
    create_provider, ConvergenceEngine, MistralProvider, OpenAiProvider, SharedProvider,
    TextProvider,
};
pub use types::{GeneratedContent, SectionRequest, SourceUnit};

// Structure
pub use analyzer::StructureExtractor;
pub use diagram::{render, RenderedImage};
pub use types::{CodeEntity, DiagramGraph, EntityKind};
