//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Config file (reportloom.toml, or an explicit path)
//! 3. Environment variables (REPORTLOOM_* prefix)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::Path;

use tracing::debug;

use super::types::EngineConfig;
use crate::types::{LoomError, Result};

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "reportloom.toml";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with the full resolution chain:
    /// defaults → reportloom.toml (if present) → env vars.
    pub fn load() -> Result<EngineConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(EngineConfig::default()));

        let file = Path::new(DEFAULT_CONFIG_FILE);
        if file.exists() {
            debug!("Loading config from: {}", file.display());
            figment = figment.merge(Toml::file(file));
        }

        // e.g. REPORTLOOM_PRIMARY_MODEL -> primary.model
        figment = figment.merge(Env::prefixed("REPORTLOOM_").split('_').lowercase(true));

        let config: EngineConfig = figment
            .extract()
            .map_err(|e| LoomError::Config(format!("configuration error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file only (plus defaults).
    pub fn load_from_file(path: &Path) -> Result<EngineConfig> {
        let config: EngineConfig = Figment::new()
            .merge(Serialized::defaults(EngineConfig::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| LoomError::Config(format!("configuration error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }
}
