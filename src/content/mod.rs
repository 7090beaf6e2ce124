//! Content Generation Layer
//!
//! Text providers, the retry/timeout plumbing around them, and the
//! convergence engine that drives section drafts to a target word count.

pub mod convergence;
pub mod provider;
pub mod retry;
pub mod timeout;
pub mod wordcount;

pub use convergence::ConvergenceEngine;
pub use provider::{
    create_provider, MistralProvider, OpenAiProvider, SharedProvider, TextProvider,
};
pub use retry::RetryPolicy;
pub use timeout::with_timeout;
