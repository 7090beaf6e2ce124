//! Engine configuration: types, defaults, and the figment-based loader.

pub mod loader;
pub mod types;

pub use loader::{ConfigLoader, DEFAULT_CONFIG_FILE};
pub use types::{
    ConvergenceSettings, DiagramSettings, EngineConfig, ProviderSettings, RetrySettings,
};
