mod config;
mod error;
mod history;
mod outcome;
mod roles;
mod runner;
mod similarity;
mod stopping;
mod temperature;

pub use config::{Architecture, ConfigError, RunConfig};
pub use error::RunError;
pub use history::{IterationRecord, RunResult, StopReason};
pub use outcome::RunOutcome;
pub use roles::{resolve_roles, RolePair};
pub use runner::{ProgressCallback, ProgressEvent, RefineRunner};
pub use similarity::similarity;
pub use stopping::{evaluate_stop, improvement_ratio, StopDecision};
pub use temperature::TemperaturePolicy;
