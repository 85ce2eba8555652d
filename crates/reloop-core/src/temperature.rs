use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Default starting temperature for the decreasing schedule
pub const DEFAULT_INITIAL_TEMPERATURE: f64 = 0.7;
/// Default per-iteration multiplicative decay
pub const DEFAULT_TEMPERATURE_DECAY: f64 = 0.7;

fn default_decay() -> f64 {
    DEFAULT_TEMPERATURE_DECAY
}

/// Rule mapping an iteration index to the sampling temperature passed to a
/// model call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum TemperaturePolicy {
    /// Same temperature for every iteration
    Fixed { temperature: f64 },
    /// `initial * decay^index`; later iterations sample more conservatively
    Decreasing {
        initial: f64,
        #[serde(default = "default_decay")]
        decay: f64,
    },
    /// Explicit per-iteration schedule; indices past the end clamp to the
    /// last element
    Custom { schedule: Vec<f64> },
}

impl Default for TemperaturePolicy {
    fn default() -> Self {
        TemperaturePolicy::Decreasing {
            initial: DEFAULT_INITIAL_TEMPERATURE,
            decay: DEFAULT_TEMPERATURE_DECAY,
        }
    }
}

impl TemperaturePolicy {
    /// Shorthand constructors
    pub fn fixed(temperature: f64) -> Self {
        TemperaturePolicy::Fixed { temperature }
    }

    pub fn decreasing(initial: f64, decay: f64) -> Self {
        TemperaturePolicy::Decreasing { initial, decay }
    }

    /// The temperature to use at a given iteration index (0 = seed)
    pub fn temperature_for(&self, iteration_index: usize) -> f64 {
        match self {
            TemperaturePolicy::Fixed { temperature } => *temperature,
            TemperaturePolicy::Decreasing { initial, decay } => {
                initial * decay.powi(iteration_index as i32)
            }
            TemperaturePolicy::Custom { schedule } => {
                let index = iteration_index.min(schedule.len().saturating_sub(1));
                schedule[index]
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if let TemperaturePolicy::Custom { schedule } = self {
            if schedule.is_empty() {
                return Err(ConfigError::EmptyTemperatureSchedule);
            }
        }
        Ok(())
    }
}
