pub mod error;
pub mod graph;
pub mod section;

pub use error::{ErrorCategory, ErrorClassifier, LoomError, ProviderError, Result};
pub use graph::{CallEdge, CodeEntity, DiagramGraph, EntityKind, EXTERN_PREFIX};
pub use section::{GeneratedContent, SectionRequest, SourceUnit, DEFAULT_TOLERANCE_PCT};
