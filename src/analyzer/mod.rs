//! Python structure extraction.
//!
//! Turns source text into a [`DiagramGraph`](crate::types::DiagramGraph) of
//! modules, classes and functions plus the call edges between them.

pub mod extract;
pub mod scope;

pub use extract::{StructureExtractor, MODULE_ID};
