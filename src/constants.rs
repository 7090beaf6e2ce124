//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Convergence loop constants
pub mod convergence {
    /// Maximum expansion rounds before returning best-effort content
    pub const MAX_EXPANSION_ROUNDS: usize = 5;

    /// Content above `target * OVERSHOOT_FACTOR` is trimmed back to a sentence
    /// boundary at or below `target + tolerance`
    pub const OVERSHOOT_FACTOR: f64 = 1.5;
}

/// Retry constants
pub mod retry {
    /// Default maximum attempts per outbound call
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 500;

    /// Maximum delay between retries (seconds)
    pub const MAX_DELAY_SECS: u64 = 30;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: f32 = 2.0;
}

/// HTTP/Network constants
pub mod network {
    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;

    /// Maximum simultaneous outbound provider calls
    pub const MAX_CONCURRENT_REQUESTS: usize = 4;
}

/// Diagram layout constants
pub mod diagram {
    /// Canvas width in pixels
    pub const CANVAS_WIDTH: u32 = 1200;

    /// Canvas height in pixels
    pub const CANVAS_HEIGHT: u32 = 800;

    /// Node box width at scale 1.0
    pub const NODE_WIDTH: f64 = 150.0;

    /// Node box height at scale 1.0
    pub const NODE_HEIGHT: f64 = 44.0;

    /// Horizontal center-to-center spacing at scale 1.0
    pub const H_SPACING: f64 = 180.0;

    /// Vertical row spacing at scale 1.0
    pub const ROW_HEIGHT: f64 = 120.0;

    /// Canvas margin
    pub const MARGIN: f64 = 24.0;

    /// Label font size at scale 1.0
    pub const FONT_SIZE: f64 = 13.0;

    /// Entity count above which node and font sizes shrink proportionally
    pub const CAPACITY_THRESHOLD: usize = 48;

    /// Labels longer than this are truncated with an ellipsis
    pub const MAX_LABEL_CHARS: usize = 30;
}
