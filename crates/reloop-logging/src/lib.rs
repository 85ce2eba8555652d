//! # reloop-logging
//!
//! Logging for the reloop refinement engine.
//!
//! This crate provides structured logging for run events.
//!
//! ## Key Types
//!
//! - [`Logger`] - Structured event logging
//! - [`LogEvent`] - Log event types
//! - [`LogFormat`] - Output formats (Pretty, JSON, Compact)
//!
//! ## Log Formats
//!
//! - `Pretty` - Human-readable colored output
//! - `JSON` - Structured JSON lines
//! - `Compact` - Minimal text output

mod events;

pub use events::{LogEvent, LogFormat, Logger};

use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default directory for run log files (`~/.reloop/logs`)
pub fn default_log_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".reloop").join("logs"))
}

/// Initialize tracing for the application
///
/// When a log directory is given, a daily-rolling JSON log file is written
/// there in addition to console output. The returned guard must be held for
/// the lifetime of the program so buffered log lines are flushed.
pub fn init_tracing(
    level: &str,
    format: LogFormat,
    log_dir: Option<&PathBuf>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "reloop.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_target(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    match format {
        LogFormat::Json => {
            registry.with(fmt::layer().json().with_target(false)).init();
        }
        LogFormat::Pretty | LogFormat::Compact => {
            registry.with(fmt::layer().with_target(false)).init();
        }
    }

    guard
}
