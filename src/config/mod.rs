//! Configuration management for distfft planning.
//!
//! Planner settings (log level, planning rigor, cost reduction) with
//! builder-based construction and loading from files or the environment.

pub mod core;

// Re-export commonly used configuration types
pub use self::core::{ConfigBuilder, PlannerConfig, DEFAULT_MAX_SURVEY_ELEMENTS};

pub use crate::core::constants::DEFAULT_CONFIG_FILE;

use crate::core::error::{DistError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigFormat {
    /// TOML configuration format
    Toml,
    /// JSON configuration format
    Json,
}

impl Default for ConfigFormat {
    fn default() -> Self {
        ConfigFormat::Toml
    }
}

impl ConfigFormat {
    /// Format implied by a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            _ => Err(DistError::config(
                "Unsupported config file format. Use .json or .toml",
            )),
        }
    }
}

/// Load the configuration from [`DEFAULT_CONFIG_FILE`] in the working
/// directory if present, then apply environment overrides.
pub fn load_default() -> Result<PlannerConfig> {
    let path = Path::new(DEFAULT_CONFIG_FILE);
    let mut config = if path.exists() {
        PlannerConfig::load_from_file(path)?
    } else {
        PlannerConfig::default()
    };
    config.apply_environment_overrides()?;
    Ok(config)
}
