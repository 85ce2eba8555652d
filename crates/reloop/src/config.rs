//! Project configuration file support for reloop.
//!
//! Loads configuration from `reloop.toml` in the working directory.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Project-level configuration loaded from `reloop.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Backend CLI used for every configured model
    pub backend: Option<String>,
    /// Role assignment policy (single, dual, multi-rotation)
    pub architecture: Option<String>,
    /// Ordered model list; order matters for dual and rotation modes
    pub models: Option<Vec<String>>,
    /// Per-run defaults
    #[serde(default)]
    pub run: RunDefaults,
}

/// Defaults applied to a run unless overridden on the command line
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RunDefaults {
    pub max_iterations: Option<usize>,
    pub quality_threshold: Option<f64>,
    pub convergence_threshold: Option<f64>,
    pub check_convergence: Option<bool>,
    pub criteria: Option<Vec<String>>,
    pub temperature: Option<f64>,
    pub temperature_decay: Option<f64>,
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
}

/// The config file name
pub const CONFIG_FILE_NAME: &str = "reloop.toml";

impl ProjectConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ProjectConfig::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_full_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
backend = "llm"
architecture = "dual"
models = ["gpt-4o", "claude-3-5-sonnet"]

[run]
max_iterations = 4
quality_threshold = 8.5
criteria = ["accuracy", "brevity"]
"#,
        )
        .unwrap();

        let config = ProjectConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(config.backend.as_deref(), Some("llm"));
        assert_eq!(config.architecture.as_deref(), Some("dual"));
        assert_eq!(config.models.as_ref().unwrap().len(), 2);
        assert_eq!(config.run.max_iterations, Some(4));
        assert_eq!(config.run.quality_threshold, Some(8.5));
        assert_eq!(config.run.criteria.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_field_is_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "no_such_field = 1\n").unwrap();
        assert!(ProjectConfig::load(dir.path()).is_err());
    }
}
