use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::temperature::TemperaturePolicy;
use reloop_critic::{MAX_QUALITY_SCORE, MIN_QUALITY_SCORE};

/// Policy assigning critic/generator roles to configured models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    /// One model plays both roles every iteration
    Single,
    /// Fixed roles: models[0] generates, models[1] critiques
    Dual,
    /// Models take turns; the model that critiques also produces the
    /// improved answer in the same pass
    MultiRotation,
}

impl std::fmt::Display for Architecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Architecture::Single => write!(f, "single"),
            Architecture::Dual => write!(f, "dual"),
            Architecture::MultiRotation => write!(f, "multi-rotation"),
        }
    }
}

impl std::str::FromStr for Architecture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(Architecture::Single),
            "dual" => Ok(Architecture::Dual),
            "multi" | "multi-rotation" | "multirotation" | "rotation" => {
                Ok(Architecture::MultiRotation)
            }
            _ => Err(format!("Unknown architecture: {}", s)),
        }
    }
}

/// Default convergence threshold: a score delta below 10% stops the loop
pub const DEFAULT_CONVERGENCE_THRESHOLD: f64 = 0.10;

fn default_convergence_threshold() -> f64 {
    DEFAULT_CONVERGENCE_THRESHOLD
}

fn default_check_convergence() -> bool {
    true
}

fn default_criteria() -> Vec<String> {
    vec![
        "accuracy".to_string(),
        "clarity".to_string(),
        "completeness".to_string(),
    ]
}

/// Immutable configuration for one refinement run
///
/// Constructed by the caller before the loop starts; read-only for the
/// lifetime of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Role assignment policy
    pub architecture: Architecture,
    /// Hard iteration limit; the loop always terminates within this bound
    pub max_iterations: usize,
    /// Relative score improvement below which the loop is considered
    /// converged
    #[serde(default = "default_convergence_threshold")]
    pub convergence_threshold: f64,
    /// Stop as soon as a critique scores at or above this bound (1-10)
    #[serde(default)]
    pub quality_threshold: Option<f64>,
    /// Whether convergence detection runs at all
    #[serde(default = "default_check_convergence")]
    pub check_convergence: bool,
    /// Criteria the critic judges against
    #[serde(default = "default_criteria")]
    pub default_criteria: Vec<String>,
    /// Sampling temperature schedule across iterations
    #[serde(default)]
    pub temperature_policy: TemperaturePolicy,
    /// Per-run criteria override; when set it replaces default_criteria and
    /// is also passed to the generator as a focus instruction
    #[serde(default)]
    pub focus_on: Option<Vec<String>>,
    /// System prompt forwarded to every model invocation
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Token cap forwarded to backends that support one
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl RunConfig {
    pub fn new(architecture: Architecture, max_iterations: usize) -> Self {
        Self {
            architecture,
            max_iterations,
            convergence_threshold: DEFAULT_CONVERGENCE_THRESHOLD,
            quality_threshold: None,
            check_convergence: true,
            default_criteria: default_criteria(),
            temperature_policy: TemperaturePolicy::default(),
            focus_on: None,
            system_prompt: None,
            max_tokens: None,
        }
    }

    pub fn with_quality_threshold(mut self, threshold: f64) -> Self {
        self.quality_threshold = Some(threshold);
        self
    }

    pub fn with_convergence_threshold(mut self, threshold: f64) -> Self {
        self.convergence_threshold = threshold;
        self
    }

    pub fn with_check_convergence(mut self, check: bool) -> Self {
        self.check_convergence = check;
        self
    }

    pub fn with_temperature_policy(mut self, policy: TemperaturePolicy) -> Self {
        self.temperature_policy = policy;
        self
    }

    pub fn with_focus_on(mut self, focus: Vec<String>) -> Self {
        self.focus_on = Some(focus);
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: String) -> Self {
        self.system_prompt = Some(system_prompt);
        self
    }

    /// The criteria in effect for this run
    pub fn active_criteria(&self) -> &[String] {
        match self.focus_on {
            Some(ref focus) if !focus.is_empty() => focus,
            _ => &self.default_criteria,
        }
    }

    /// Validate the configuration against the number of configured models.
    ///
    /// Runs before any model call; an invalid config never starts a run.
    pub fn validate(&self, model_count: usize) -> Result<(), ConfigError> {
        if model_count == 0 {
            return Err(ConfigError::NoModels);
        }
        if self.max_iterations < 1 {
            return Err(ConfigError::InvalidMaxIterations(self.max_iterations));
        }
        match self.architecture {
            Architecture::Dual if model_count < 2 => {
                return Err(ConfigError::NotEnoughModels {
                    architecture: self.architecture,
                    required: 2,
                    configured: model_count,
                });
            }
            Architecture::MultiRotation if model_count < 2 => {
                return Err(ConfigError::NotEnoughModels {
                    architecture: self.architecture,
                    required: 2,
                    configured: model_count,
                });
            }
            _ => {}
        }
        if let Some(threshold) = self.quality_threshold {
            if !(MIN_QUALITY_SCORE..=MAX_QUALITY_SCORE).contains(&threshold) {
                return Err(ConfigError::InvalidQualityThreshold(threshold));
            }
        }
        if !self.convergence_threshold.is_finite() {
            return Err(ConfigError::InvalidConvergenceThreshold(
                self.convergence_threshold,
            ));
        }
        self.temperature_policy.validate()?;
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("At least one model must be configured")]
    NoModels,

    #[error("max_iterations must be at least 1, got {0}")]
    InvalidMaxIterations(usize),

    #[error("{architecture} architecture requires {required} models, {configured} configured")]
    NotEnoughModels {
        architecture: Architecture,
        required: usize,
        configured: usize,
    },

    #[error("quality_threshold must be within 1.0-10.0, got {0}")]
    InvalidQualityThreshold(f64),

    #[error("convergence_threshold must be finite, got {0}")]
    InvalidConvergenceThreshold(f64),

    #[error("Custom temperature schedule must not be empty")]
    EmptyTemperatureSchedule,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = RunConfig::new(Architecture::Single, 5);
        assert!(config.validate(1).is_ok());
    }

    #[test]
    fn test_zero_max_iterations_rejected() {
        let config = RunConfig::new(Architecture::Single, 0);
        assert!(matches!(
            config.validate(1),
            Err(ConfigError::InvalidMaxIterations(0))
        ));
    }

    #[test]
    fn test_no_models_rejected() {
        let config = RunConfig::new(Architecture::Single, 3);
        assert!(matches!(config.validate(0), Err(ConfigError::NoModels)));
    }

    #[test]
    fn test_rotation_needs_two_models() {
        let config = RunConfig::new(Architecture::MultiRotation, 3);
        assert!(matches!(
            config.validate(1),
            Err(ConfigError::NotEnoughModels { .. })
        ));
        assert!(config.validate(2).is_ok());
    }

    #[test]
    fn test_dual_needs_two_models() {
        let config = RunConfig::new(Architecture::Dual, 3);
        assert!(matches!(
            config.validate(1),
            Err(ConfigError::NotEnoughModels { .. })
        ));
    }

    #[test]
    fn test_quality_threshold_bounds() {
        let config = RunConfig::new(Architecture::Single, 3).with_quality_threshold(0.5);
        assert!(matches!(
            config.validate(1),
            Err(ConfigError::InvalidQualityThreshold(_))
        ));

        let config = RunConfig::new(Architecture::Single, 3).with_quality_threshold(10.5);
        assert!(config.validate(1).is_err());

        let config = RunConfig::new(Architecture::Single, 3).with_quality_threshold(9.0);
        assert!(config.validate(1).is_ok());
    }

    #[test]
    fn test_empty_custom_schedule_rejected() {
        let config = RunConfig::new(Architecture::Single, 3)
            .with_temperature_policy(TemperaturePolicy::Custom { schedule: vec![] });
        assert!(matches!(
            config.validate(1),
            Err(ConfigError::EmptyTemperatureSchedule)
        ));
    }

    #[test]
    fn test_focus_on_overrides_criteria() {
        let config = RunConfig::new(Architecture::Single, 3)
            .with_focus_on(vec!["brevity".to_string()]);
        assert_eq!(config.active_criteria(), ["brevity".to_string()]);

        let config = RunConfig::new(Architecture::Single, 3);
        assert_eq!(config.active_criteria().len(), 3);
    }
}
