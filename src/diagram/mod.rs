//! Diagram layout and SVG rendering.
//!
//! `layout` computes deterministic node positions; `render` serializes the
//! placed graph to SVG bytes.

pub mod layout;
pub mod render;

pub use layout::{place, Layout, PlacedNode};
pub use render::{render, render_layout, RenderedImage};
