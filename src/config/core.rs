//! Core configuration structures for distfft planning.
//!
//! This module provides the planner configuration and a builder for it,
//! with loading from JSON/TOML files and `DISTFFT_*` environment variables.

use crate::config::ConfigFormat;
use crate::core::constants::ENV_PREFIX;
use crate::core::error::{DistError, Result};
use crate::core::types::{PlanRigor, VerbosityLevel};
use crate::plan::cost::CostKind;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default limit on global elements for the layout self-check.
pub const DEFAULT_MAX_SURVEY_ELEMENTS: usize = 1 << 24;

/// Configuration of a planning context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Log level installed when the context initializes
    pub verbosity: VerbosityLevel,
    /// How many candidate algorithms are compared
    pub rigor: PlanRigor,
    /// How local costs combine across a process group
    pub cost_kind: CostKind,
    /// Check that per-rank layouts tile the global array before planning
    pub survey_layouts: bool,
    /// Requests with more global elements skip the layout check
    pub max_survey_elements: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            verbosity: VerbosityLevel::default(),
            rigor: PlanRigor::default(),
            cost_kind: CostKind::default(),
            survey_layouts: false,
            max_survey_elements: DEFAULT_MAX_SURVEY_ELEMENTS,
        }
    }
}

impl PlannerConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.survey_layouts && self.max_survey_elements == 0 {
            return Err(DistError::invalid_parameter(
                "max_survey_elements",
                self.max_survey_elements.to_string(),
                "must be positive when survey_layouts is enabled",
            ));
        }
        Ok(())
    }

    /// Load configuration from a `.json` or `.toml` file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;

        let config: PlannerConfig = match format {
            ConfigFormat::Json => serde_json::from_str(&content)?,
            ConfigFormat::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        log::debug!("Loaded planner configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a `.json` or `.toml` file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match ConfigFormat::from_path(path)? {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from environment variables
    ///
    /// Reads `DISTFFT_VERBOSITY`, `DISTFFT_RIGOR`, `DISTFFT_COST_KIND`,
    /// `DISTFFT_SURVEY_LAYOUTS` and `DISTFFT_MAX_SURVEY_ELEMENTS`; unset
    /// variables keep their defaults.
    pub fn load_from_environment() -> Result<Self> {
        let mut config = PlannerConfig::default();
        config.apply_overrides(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())?;
        Ok(config)
    }

    /// Apply environment variable overrides to an existing configuration
    pub fn apply_environment_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("VERBOSITY") {
            self.verbosity = parse_verbosity(&val)?;
        }
        if let Some(val) = lookup("RIGOR") {
            self.rigor = val.parse()?;
        }
        if let Some(val) = lookup("COST_KIND") {
            self.cost_kind = val.parse()?;
        }
        if let Some(val) = lookup("SURVEY_LAYOUTS") {
            self.survey_layouts = val
                .parse()
                .map_err(|_| DistError::config(format!("Invalid {}SURVEY_LAYOUTS", ENV_PREFIX)))?;
        }
        if let Some(val) = lookup("MAX_SURVEY_ELEMENTS") {
            self.max_survey_elements = val.parse().map_err(|_| {
                DistError::config(format!("Invalid {}MAX_SURVEY_ELEMENTS", ENV_PREFIX))
            })?;
        }
        self.validate()
    }
}

fn parse_verbosity(value: &str) -> Result<VerbosityLevel> {
    if let Ok(level) = value.parse::<i32>() {
        return Ok(VerbosityLevel::from(level));
    }
    match value.to_ascii_lowercase().as_str() {
        "fatal" | "error" => Ok(VerbosityLevel::Fatal),
        "warning" | "warn" => Ok(VerbosityLevel::Warning),
        "info" => Ok(VerbosityLevel::Info),
        "debug" => Ok(VerbosityLevel::Debug),
        _ => Err(DistError::config(format!("Invalid {}VERBOSITY", ENV_PREFIX))),
    }
}

/// Configuration builder for fluent configuration creation
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: PlannerConfig,
    validation_errors: Vec<String>,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        ConfigBuilder {
            config: PlannerConfig::default(),
            validation_errors: Vec::new(),
        }
    }

    /// Set the log level
    pub fn verbosity(mut self, verbosity: VerbosityLevel) -> Self {
        self.config.verbosity = verbosity;
        self
    }

    /// Set the planning rigor
    pub fn rigor(mut self, rigor: PlanRigor) -> Self {
        self.config.rigor = rigor;
        self
    }

    /// Set how costs are combined across processes
    pub fn cost_kind(mut self, cost_kind: CostKind) -> Self {
        self.config.cost_kind = cost_kind;
        self
    }

    /// Enable or disable the layout self-check
    pub fn survey_layouts(mut self, enabled: bool) -> Self {
        self.config.survey_layouts = enabled;
        self
    }

    /// Set the element limit of the layout self-check
    pub fn max_survey_elements(mut self, limit: usize) -> Self {
        if limit == 0 {
            self.validation_errors
                .push("max_survey_elements must be positive".to_string());
        }
        self.config.max_survey_elements = limit;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<PlannerConfig> {
        if !self.validation_errors.is_empty() {
            return Err(DistError::config(format!(
                "Configuration validation failed: {}",
                self.validation_errors.join(", ")
            )));
        }

        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_config_default() {
        let config = PlannerConfig::default();
        assert_eq!(config.verbosity, VerbosityLevel::Warning);
        assert_eq!(config.rigor, PlanRigor::Measure);
        assert_eq!(config.cost_kind, CostKind::Max);
        assert!(!config.survey_layouts);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = PlannerConfig::default();
        config.max_survey_elements = 0;
        assert!(config.validate().is_ok());
        config.survey_layouts = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .verbosity(VerbosityLevel::Debug)
            .rigor(PlanRigor::Patient)
            .cost_kind(CostKind::Sum)
            .survey_layouts(true)
            .build()
            .unwrap();

        assert_eq!(config.verbosity, VerbosityLevel::Debug);
        assert_eq!(config.rigor, PlanRigor::Patient);
        assert_eq!(config.cost_kind, CostKind::Sum);
        assert!(config.survey_layouts);
    }

    #[test]
    fn test_config_builder_validation() {
        let result = ConfigBuilder::new().max_survey_elements(0).build();
        assert!(matches!(result, Err(DistError::Config { .. })));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempdir().unwrap();
        let config = ConfigBuilder::new()
            .rigor(PlanRigor::Estimate)
            .cost_kind(CostKind::Sum)
            .build()
            .unwrap();

        for name in ["planner.toml", "planner.json"] {
            let path = dir.path().join(name);
            config.save_to_file(&path).unwrap();
            assert_eq!(PlannerConfig::load_from_file(&path).unwrap(), config);
        }
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "rigor = \"patient\"\n").unwrap();
        let config = PlannerConfig::load_from_file(&path).unwrap();
        assert_eq!(config.rigor, PlanRigor::Patient);
        assert_eq!(config.cost_kind, CostKind::Max);
    }

    #[test]
    fn test_unsupported_and_malformed_files() {
        let dir = tempdir().unwrap();
        let yaml = dir.path().join("planner.yaml");
        assert!(PlannerConfig::default().save_to_file(&yaml).is_err());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(
            PlannerConfig::load_from_file(&bad),
            Err(DistError::Json { .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("VERBOSITY", "2"),
            ("RIGOR", "estimate"),
            ("COST_KIND", "sum"),
            ("SURVEY_LAYOUTS", "true"),
        ]
        .into_iter()
        .collect();

        let mut config = PlannerConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.verbosity, VerbosityLevel::Debug);
        assert_eq!(config.rigor, PlanRigor::Estimate);
        assert_eq!(config.cost_kind, CostKind::Sum);
        assert!(config.survey_layouts);

        let mut config = PlannerConfig::default();
        assert!(config
            .apply_overrides(|key| (key == "RIGOR").then(|| "thorough".to_string()))
            .is_err());
    }

    #[test]
    fn test_parse_verbosity_names() {
        assert_eq!(parse_verbosity("info").unwrap(), VerbosityLevel::Info);
        assert_eq!(parse_verbosity("-1").unwrap(), VerbosityLevel::Fatal);
        assert!(parse_verbosity("loud").is_err());
    }
}
