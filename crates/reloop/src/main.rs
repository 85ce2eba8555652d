mod config;

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use config::ProjectConfig;
use reloop_core::{Architecture, RefineRunner, RunConfig, RunOutcome, TemperaturePolicy};
use reloop_logging::{default_log_dir, init_tracing, LogFormat, Logger};
use reloop_model::{create_model, BackendKind, TextModel};

#[derive(Parser, Debug)]
#[command(
    name = "reloop",
    about = "Iterative critique-and-refine harness for LLM answers",
    version,
    author
)]
struct Cli {
    /// Task prompt (or reads from prompt.md if not provided)
    #[arg(short, long)]
    prompt: Option<String>,

    /// Path to prompt file (default: ./prompt.md)
    #[arg(long, default_value = "prompt.md")]
    prompt_file: PathBuf,

    /// File with a pre-written first draft; skips the seed generation call
    #[arg(long)]
    initial_answer_file: Option<PathBuf>,

    /// Working directory (default: current directory)
    #[arg(short = 'd', long)]
    working_dir: Option<PathBuf>,

    /// Backend CLI used for all configured models (default: claude)
    #[arg(short, long, value_enum)]
    backend: Option<BackendChoice>,

    /// Model name; repeat for dual or rotation architectures (order matters)
    #[arg(short, long)]
    model: Vec<String>,

    /// Role assignment policy
    #[arg(short, long, value_enum)]
    architecture: Option<ArchitectureChoice>,

    /// Maximum iterations
    #[arg(short = 'n', long)]
    max_iterations: Option<usize>,

    /// Stop once a critique scores at or above this bound (1-10)
    #[arg(short, long)]
    quality_threshold: Option<f64>,

    /// Relative score improvement below which the run is converged
    #[arg(long)]
    convergence_threshold: Option<f64>,

    /// Disable convergence detection entirely
    #[arg(long)]
    no_convergence_check: bool,

    /// Evaluation criterion; repeat to override the defaults
    #[arg(long)]
    criteria: Vec<String>,

    /// Criterion to prioritize this run; repeat for several
    #[arg(long)]
    focus: Vec<String>,

    /// Fixed sampling temperature (becomes a decreasing schedule when
    /// --temperature-decay is also given)
    #[arg(short, long)]
    temperature: Option<f64>,

    /// Per-iteration multiplicative temperature decay
    #[arg(long)]
    temperature_decay: Option<f64>,

    /// System prompt forwarded to every model call
    #[arg(long)]
    system_prompt: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatChoice,

    /// Append run events as JSON lines to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Filter for internal tracing output (e.g. "debug")
    #[arg(long, default_value = "warn")]
    trace_level: String,

    /// Output final result as JSON
    #[arg(long)]
    json_output: bool,

    /// Dry run: show what would happen without executing
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendChoice {
    Claude,
    Llm,
}

impl From<BackendChoice> for BackendKind {
    fn from(choice: BackendChoice) -> Self {
        match choice {
            BackendChoice::Claude => BackendKind::ClaudeCli,
            BackendChoice::Llm => BackendKind::LlmCli,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ArchitectureChoice {
    Single,
    Dual,
    MultiRotation,
}

impl From<ArchitectureChoice> for Architecture {
    fn from(choice: ArchitectureChoice) -> Self {
        match choice {
            ArchitectureChoice::Single => Architecture::Single,
            ArchitectureChoice::Dual => Architecture::Dual,
            ArchitectureChoice::MultiRotation => Architecture::MultiRotation,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_format: LogFormat = cli.log_format.into();
    let trace_dir = default_log_dir();
    let _trace_guard = init_tracing(&cli.trace_level, log_format, trace_dir.as_ref());

    // Determine working directory
    let working_dir = cli
        .working_dir
        .clone()
        .unwrap_or_else(|| std::env::current_dir().expect("Failed to get current directory"));

    let project = ProjectConfig::load(&working_dir)?.unwrap_or_default();

    let prompt = get_prompt(&cli, &working_dir)?;
    let initial_answer = match cli.initial_answer_file {
        Some(ref path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?
                .trim()
                .to_string(),
        ),
        None => None,
    };

    let architecture = resolve_architecture(&cli, &project)?;
    let run_config = build_run_config(&cli, &project, architecture);

    // Ordered model list: CLI flags beat the project config; a bare backend
    // with no model name is the last resort
    let backend: BackendKind = match cli.backend {
        Some(choice) => choice.into(),
        None => match project.backend {
            Some(ref name) => name.parse().map_err(anyhow::Error::msg)?,
            None => BackendKind::ClaudeCli,
        },
    };
    let model_names: Vec<Option<String>> = if !cli.model.is_empty() {
        cli.model.iter().cloned().map(Some).collect()
    } else if let Some(ref models) = project.models {
        models.iter().cloned().map(Some).collect()
    } else {
        vec![None]
    };
    let models: Vec<Arc<dyn TextModel>> = model_names
        .into_iter()
        .map(|name| create_model(backend, name))
        .collect();

    if cli.dry_run {
        println!("=== Dry Run ===");
        println!(
            "Prompt: {}",
            if prompt.chars().count() > 100 {
                format!("{}...", prompt.chars().take(100).collect::<String>())
            } else {
                prompt.clone()
            }
        );
        println!("Architecture: {}", architecture);
        println!(
            "Models: {}",
            models
                .iter()
                .map(|m| m.name())
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!("Max iterations: {}", run_config.max_iterations);
        match run_config.quality_threshold {
            Some(threshold) => println!("Quality threshold: {:.1}", threshold),
            None => println!("Quality threshold: none"),
        }
        return Ok(());
    }

    // Verify each backend is reachable before burning a run on it
    for model in &models {
        if !model.is_available().await {
            anyhow::bail!(
                "Model backend '{}' is not available. Make sure it's installed and in PATH.",
                model.name()
            );
        }
    }

    let logger = match cli.log_file {
        Some(ref path) => Logger::with_file(log_format, path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?,
        None => Logger::new(log_format),
    };

    let runner = RefineRunner::new(models, Arc::new(logger));

    // Handle Ctrl+C gracefully
    let interrupt_handle = runner.interrupt_handle();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted. Stopping before the next model call...");
        interrupt_handle.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    let outcome = runner.run(&prompt, initial_answer, &run_config).await?;

    if cli.json_output {
        let json = serde_json::to_string_pretty(&outcome)?;
        println!("{}", json);
    } else {
        print_outcome(&outcome);
    }

    std::process::exit(outcome.exit_code());
}

fn resolve_architecture(cli: &Cli, project: &ProjectConfig) -> Result<Architecture> {
    if let Some(choice) = cli.architecture {
        return Ok(choice.into());
    }
    if let Some(ref name) = project.architecture {
        return name.parse().map_err(anyhow::Error::msg);
    }
    Ok(Architecture::Single)
}

fn build_run_config(cli: &Cli, project: &ProjectConfig, architecture: Architecture) -> RunConfig {
    let defaults = &project.run;

    let max_iterations = cli
        .max_iterations
        .or(defaults.max_iterations)
        .unwrap_or(5);
    let mut config = RunConfig::new(architecture, max_iterations);

    if let Some(threshold) = cli.quality_threshold.or(defaults.quality_threshold) {
        config = config.with_quality_threshold(threshold);
    }
    if let Some(threshold) = cli
        .convergence_threshold
        .or(defaults.convergence_threshold)
    {
        config = config.with_convergence_threshold(threshold);
    }
    if cli.no_convergence_check {
        config = config.with_check_convergence(false);
    } else if let Some(check) = defaults.check_convergence {
        config = config.with_check_convergence(check);
    }
    if !cli.criteria.is_empty() {
        config.default_criteria = cli.criteria.clone();
    } else if let Some(ref criteria) = defaults.criteria {
        config.default_criteria = criteria.clone();
    }
    if !cli.focus.is_empty() {
        config = config.with_focus_on(cli.focus.clone());
    }
    if let Some(system_prompt) = cli
        .system_prompt
        .clone()
        .or_else(|| defaults.system_prompt.clone())
    {
        config = config.with_system_prompt(system_prompt);
    }
    config.max_tokens = defaults.max_tokens;

    let temperature = cli.temperature.or(defaults.temperature);
    let decay = cli.temperature_decay.or(defaults.temperature_decay);
    config = match (temperature, decay) {
        (Some(t), Some(d)) => config.with_temperature_policy(TemperaturePolicy::decreasing(t, d)),
        (Some(t), None) => config.with_temperature_policy(TemperaturePolicy::fixed(t)),
        _ => config,
    };

    config
}

fn get_prompt(cli: &Cli, working_dir: &Path) -> Result<String> {
    // Prefer --prompt flag
    if let Some(ref prompt) = cli.prompt {
        return Ok(prompt.clone());
    }

    // Try to read from prompt file
    let prompt_path = if cli.prompt_file.is_absolute() {
        cli.prompt_file.clone()
    } else {
        working_dir.join(&cli.prompt_file)
    };

    if prompt_path.exists() {
        let content =
            std::fs::read_to_string(&prompt_path).context("Failed to read prompt file")?;
        Ok(content.trim().to_string())
    } else {
        anyhow::bail!(
            "No prompt provided. Use --prompt or create a {} file",
            cli.prompt_file.display()
        )
    }
}

fn print_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Completed(result) => {
            eprintln!();
            eprintln!("=== COMPLETE ===");
            eprintln!("Stopped: {}", result.stop_reason);
            eprintln!("Iterations: {}", result.iterations.len());
            eprintln!(
                "Score: {:.1} -> {:.1}",
                result.initial_score(),
                result.final_score()
            );
            eprintln!("Duration: {:.1}s", result.total_duration_secs);
            eprintln!();
            // The refined answer goes to stdout so it can be piped
            println!("{}", result.final_answer);
        }
        RunOutcome::Cancelled {
            iterations,
            total_duration_secs,
        } => {
            eprintln!();
            eprintln!("=== CANCELLED ===");
            eprintln!("Stopped after {} iteration(s)", iterations);
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
    }
}
