use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

/// Structured log events for the refinement loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    RunStarted {
        run_id: Uuid,
        prompt_preview: String,
        architecture: String,
        max_iterations: usize,
    },
    /// Caller supplied the seed answer; no model call was made
    SeedProvided {
        answer_chars: usize,
    },
    SeedGenerated {
        model: String,
        temperature: f64,
        duration_secs: f64,
    },
    CritiqueStarted {
        iteration: usize,
        model: String,
    },
    CritiqueCompleted {
        iteration: usize,
        model: String,
        score: f64,
        improvement: Option<f64>,
        duration_secs: f64,
    },
    ImprovementStarted {
        iteration: usize,
        model: String,
        temperature: f64,
    },
    ImprovementCompleted {
        iteration: usize,
        duration_secs: f64,
    },
    ThresholdMet {
        iteration: usize,
        score: f64,
        threshold: f64,
    },
    Converged {
        iteration: usize,
        improvement: Option<f64>,
        similarity: f64,
    },
    MaxIterationsReached {
        iterations: usize,
    },
    RunCompleted {
        run_id: Uuid,
        iterations: usize,
        initial_score: f64,
        final_score: f64,
        duration_secs: f64,
    },
    RunCancelled {
        iterations: usize,
        duration_secs: f64,
    },
    ErrorEncountered {
        iteration: usize,
        error: String,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for reloop events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // Log to file if configured (always JSON format for file)
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        // Log to console based on format
        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::RunStarted {
                prompt_preview,
                architecture,
                max_iterations,
                ..
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╭─────────────────────────────────────────────────────────────────────╮"
                        .bright_blue()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {}{}",
                    "│".bright_blue(),
                    "reloop".bold().bright_white(),
                    " ".repeat(61) + &"│".bright_blue().to_string()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Prompt:".dimmed(),
                    Self::truncate_with_padding(prompt_preview, 60, 68).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Mode:".dimmed(),
                    Self::truncate_with_padding(
                        &format!("{} (max {} iterations)", architecture, max_iterations),
                        62,
                        68
                    )
                    .dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╰─────────────────────────────────────────────────────────────────────╯"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::SeedProvided { answer_chars } => {
                let _ = writeln!(
                    stderr,
                    "  {} {} ({} chars)",
                    "▶".bright_cyan(),
                    "SEED provided by caller".dimmed(),
                    answer_chars
                );
                let _ = writeln!(stderr);
            }
            LogEvent::SeedGenerated {
                model,
                duration_secs,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "  {} {} {} ({:.1}s)",
                    "▶".bright_cyan(),
                    "SEED generated by".dimmed(),
                    model,
                    duration_secs
                );
                let _ = writeln!(stderr);
            }
            LogEvent::CritiqueStarted { iteration, model } => {
                // Iteration header
                let iter_text = format!("─ Iteration {} ", iteration);
                let padding = "─".repeat(67_usize.saturating_sub(iter_text.len()));
                let _ = writeln!(
                    stderr,
                    "{}{}{}",
                    "┌".bright_blue(),
                    iter_text.bright_blue().bold(),
                    padding.bright_blue()
                );
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "  {} {} ({})",
                    "▶".bright_magenta(),
                    "CRITIC".bright_magenta().bold(),
                    model
                );
            }
            LogEvent::CritiqueCompleted {
                score, improvement, ..
            } => {
                let delta = match improvement {
                    Some(delta) if *delta >= 0.0 => {
                        format!(" (+{:.1}%)", delta * 100.0).green().to_string()
                    }
                    Some(delta) => format!(" ({:.1}%)", delta * 100.0).red().to_string(),
                    None => String::new(),
                };
                let _ = writeln!(
                    stderr,
                    "    {} Score: {:.1}/10{}",
                    "✓".bright_green(),
                    score,
                    delta
                );
                let _ = writeln!(stderr);
            }
            LogEvent::ImprovementStarted {
                model, temperature, ..
            } => {
                let _ = writeln!(
                    stderr,
                    "  {} {} ({}, temp {:.2})",
                    "▶".bright_cyan(),
                    "GENERATOR".bright_cyan().bold(),
                    model,
                    temperature
                );
            }
            LogEvent::ImprovementCompleted { duration_secs, .. } => {
                let _ = writeln!(
                    stderr,
                    "    {} Revised ({:.1}s)",
                    "✓".bright_green(),
                    duration_secs
                );
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "└─────────────────────────────────────────────────────────────────────┘"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::ThresholdMet {
                score, threshold, ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} Quality threshold met: {:.1} >= {:.1}",
                    "✓".bright_green(),
                    score,
                    threshold
                );
            }
            LogEvent::Converged {
                improvement,
                similarity,
                ..
            } => {
                let improvement_text = match improvement {
                    Some(delta) => format!("{:.1}%", delta * 100.0),
                    None => "n/a".to_string(),
                };
                let _ = writeln!(
                    stderr,
                    "    {} Converged (improvement {}, similarity {:.2})",
                    "→".bright_yellow(),
                    improvement_text,
                    similarity
                );
            }
            LogEvent::MaxIterationsReached { iterations } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Maximum iterations reached ({})",
                    "⚠".bright_yellow(),
                    iterations
                );
            }
            LogEvent::RunCompleted { .. } => {
                // Final outcome printing is handled in main.rs; skip here to
                // avoid duplication
            }
            LogEvent::RunCancelled {
                iterations,
                duration_secs,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Cancelled after {} iteration(s) ({:.1}s)",
                    "⚠".bright_yellow(),
                    iterations,
                    duration_secs
                );
            }
            LogEvent::ErrorEncountered { iteration, error } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Error in iteration {}: {}",
                    "✗".bright_red(),
                    iteration,
                    error.bright_red()
                );
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::RunStarted { architecture, .. } => {
                format!("[{}] run:start {}", timestamp, architecture)
            }
            LogEvent::SeedProvided { answer_chars } => {
                format!("[{}] seed:provided {}c", timestamp, answer_chars)
            }
            LogEvent::SeedGenerated {
                model,
                duration_secs,
                ..
            } => format!("[{}] seed:done {} {:.1}s", timestamp, model, duration_secs),
            LogEvent::CritiqueStarted { iteration, model } => {
                format!("[{}] critic:start:{} {}", timestamp, iteration, model)
            }
            LogEvent::CritiqueCompleted {
                iteration,
                score,
                duration_secs,
                ..
            } => format!(
                "[{}] critic:done:{} score={:.1} {:.1}s",
                timestamp, iteration, score, duration_secs
            ),
            LogEvent::ImprovementStarted {
                iteration,
                model,
                temperature,
            } => format!(
                "[{}] generator:start:{} {} t={:.2}",
                timestamp, iteration, model, temperature
            ),
            LogEvent::ImprovementCompleted {
                iteration,
                duration_secs,
            } => format!(
                "[{}] generator:done:{} {:.1}s",
                timestamp, iteration, duration_secs
            ),
            LogEvent::ThresholdMet {
                iteration, score, ..
            } => format!(
                "[{}] stop:threshold:{} score={:.1}",
                timestamp, iteration, score
            ),
            LogEvent::Converged {
                iteration,
                similarity,
                ..
            } => format!(
                "[{}] stop:converged:{} sim={:.2}",
                timestamp, iteration, similarity
            ),
            LogEvent::MaxIterationsReached { iterations } => {
                format!("[{}] stop:limit:{}", timestamp, iterations)
            }
            LogEvent::RunCompleted {
                iterations,
                final_score,
                duration_secs,
                ..
            } => format!(
                "[{}] run:done:{} score={:.1} {:.1}s",
                timestamp, iterations, final_score, duration_secs
            ),
            LogEvent::RunCancelled { iterations, .. } => {
                format!("[{}] run:cancelled:{}", timestamp, iterations)
            }
            LogEvent::ErrorEncountered { iteration, error } => {
                format!("[{}] error:{}:{}", timestamp, iteration, error)
            }
        };
        let _ = writeln!(stderr, "{}", msg);
    }

    /// Truncate a string and pad to exact width
    fn truncate_with_padding(s: &str, max_len: usize, total_width: usize) -> String {
        let truncated = if s.chars().count() > max_len {
            let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{}...", cut)
        } else {
            s.to_string()
        };

        let padding_needed = total_width.saturating_sub(truncated.chars().count() + 1); // +1 for trailing │
        format!("{}{}│", truncated, " ".repeat(padding_needed))
    }
}
