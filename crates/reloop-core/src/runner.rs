use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use reloop_critic::{CritiqueInput, CritiquePrompts, CritiqueStep};
use reloop_logging::{LogEvent, Logger};
use reloop_model::{GenerationRequest, TextModel};

use crate::history::{IterationRecord, RunResult, StopReason};
use crate::roles::resolve_roles;
use crate::similarity::similarity;
use crate::stopping::{evaluate_stop, improvement_ratio, StopDecision};
use crate::{RunConfig, RunError, RunOutcome};

/// Progress notifications emitted during a run.
///
/// An observation channel only: emitting these never blocks or alters loop
/// behavior.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    IterationCompleted {
        iteration_number: usize,
        quality_score: f64,
        answer_excerpt: String,
    },
    RunFinished {
        result: RunResult,
    },
}

pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

const EXCERPT_CHARS: usize = 120;

/// Orchestrates the generate-critique-improve loop
///
/// Owns no mutable state across runs: the history is a local value threaded
/// through each `run` call, so concurrent runs on separate tasks share
/// nothing but the configured models.
pub struct RefineRunner {
    models: Vec<Arc<dyn TextModel>>,
    logger: Arc<Logger>,
    interrupted: Arc<AtomicBool>,
    progress: Option<ProgressCallback>,
}

impl RefineRunner {
    pub fn new(models: Vec<Arc<dyn TextModel>>, logger: Arc<Logger>) -> Self {
        Self {
            models,
            logger,
            interrupted: Arc::new(AtomicBool::new(false)),
            progress: None,
        }
    }

    /// Register an observer for per-iteration progress events
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Get a handle to signal cancellation
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    fn emit(&self, event: &ProgressEvent) {
        if let Some(ref callback) = self.progress {
            callback(event);
        }
    }

    fn cancelled(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Run the refinement loop to completion.
    ///
    /// Seeds the initial answer (verbatim `initial_answer` when supplied,
    /// otherwise one generator call), then drives critique -> stopping
    /// evaluation -> improvement until a criterion fires. Exactly one
    /// critique call and at most one improvement call happen per iteration.
    pub async fn run(
        &self,
        prompt: &str,
        initial_answer: Option<String>,
        config: &RunConfig,
    ) -> Result<RunOutcome, RunError> {
        config.validate(self.models.len())?;

        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let system_prompt = config.system_prompt.as_deref();

        self.logger.log(&LogEvent::RunStarted {
            run_id,
            prompt_preview: prompt.chars().take(100).collect(),
            architecture: config.architecture.to_string(),
            max_iterations: config.max_iterations,
        });

        // Seed answer: iteration index 0
        let mut answer = match initial_answer {
            Some(answer) => {
                self.logger.log(&LogEvent::SeedProvided {
                    answer_chars: answer.chars().count(),
                });
                answer
            }
            None => {
                if self.cancelled() {
                    return Ok(self.cancel(0, started));
                }
                let roles = resolve_roles(config.architecture, self.models.len(), 0);
                let model = &self.models[roles.generator];
                let temperature = config.temperature_policy.temperature_for(0);
                let request = GenerationRequest::new(prompt, temperature)
                    .with_system_prompt(system_prompt)
                    .with_max_tokens(config.max_tokens);
                let seed = model.generate(&request).await?;
                self.logger.log(&LogEvent::SeedGenerated {
                    model: model.name().to_string(),
                    temperature,
                    duration_secs: seed.duration.as_secs_f64(),
                });
                seed.text
            }
        };

        let mut history: Vec<IterationRecord> = Vec::new();

        for iteration_number in 1..=config.max_iterations {
            if self.cancelled() {
                return Ok(self.cancel(history.len(), started));
            }

            let roles = resolve_roles(config.architecture, self.models.len(), iteration_number);
            let critic = &self.models[roles.critic];
            let generator = &self.models[roles.generator];
            let temperature = config.temperature_policy.temperature_for(iteration_number);

            self.logger.log(&LogEvent::CritiqueStarted {
                iteration: iteration_number,
                model: critic.name().to_string(),
            });

            debug!(iteration = iteration_number, "Running critique step");
            let pass_started = Instant::now();
            let step = CritiqueStep::new(critic.as_ref());
            let critique = step
                .evaluate(CritiqueInput {
                    task: prompt,
                    answer: &answer,
                    criteria: config.active_criteria(),
                    iteration: iteration_number,
                    temperature,
                    system_prompt,
                    max_tokens: config.max_tokens,
                })
                .await?;

            let improvement = history
                .last()
                .map(|prev| improvement_ratio(prev.critique.quality_score, critique.quality_score));

            self.logger.log(&LogEvent::CritiqueCompleted {
                iteration: iteration_number,
                model: critic.name().to_string(),
                score: critique.quality_score,
                improvement,
                duration_secs: pass_started.elapsed().as_secs_f64(),
            });

            history.push(IterationRecord {
                iteration_number,
                answer: answer.clone(),
                critique: critique.clone(),
                critic_model: critic.name().to_string(),
                generator_model: generator.name().to_string(),
                duration_secs: pass_started.elapsed().as_secs_f64(),
                improvement_from_previous: improvement,
                timestamp: Utc::now(),
            });

            self.emit(&ProgressEvent::IterationCompleted {
                iteration_number,
                quality_score: critique.quality_score,
                answer_excerpt: excerpt(&answer, EXCERPT_CHARS),
            });

            match evaluate_stop(&history, config) {
                StopDecision::Stop(reason) => {
                    self.log_stop(reason, &history, config);
                    let result = self.finish(run_id, history, answer, reason, started);
                    return Ok(RunOutcome::Completed(result));
                }
                StopDecision::Continue => {
                    if self.cancelled() {
                        return Ok(self.cancel(history.len(), started));
                    }

                    self.logger.log(&LogEvent::ImprovementStarted {
                        iteration: iteration_number,
                        model: generator.name().to_string(),
                        temperature,
                    });

                    let improvement_prompt = CritiquePrompts::build_improvement_prompt(
                        prompt,
                        &answer,
                        &critique,
                        config.focus_on.as_deref(),
                    );
                    let request = GenerationRequest::new(&improvement_prompt, temperature)
                        .with_system_prompt(system_prompt)
                        .with_max_tokens(config.max_tokens);
                    let revised = generator.generate(&request).await?;

                    self.logger.log(&LogEvent::ImprovementCompleted {
                        iteration: iteration_number,
                        duration_secs: revised.duration.as_secs_f64(),
                    });

                    // The improvement call belongs to the pass that requested
                    // it; fold its time into the record before moving on
                    if let Some(record) = history.last_mut() {
                        record.duration_secs += revised.duration.as_secs_f64();
                    }

                    answer = revised.text;
                }
            }
        }

        // Unreachable: evaluate_stop fires MaxIterations on the final pass
        unreachable!("loop exits via a stopping criterion");
    }

    fn log_stop(&self, reason: StopReason, history: &[IterationRecord], config: &RunConfig) {
        let last = match history.last() {
            Some(last) => last,
            None => return,
        };
        match reason {
            StopReason::MaxIterations => {
                self.logger.log(&LogEvent::MaxIterationsReached {
                    iterations: last.iteration_number,
                });
            }
            StopReason::ThresholdMet => {
                self.logger.log(&LogEvent::ThresholdMet {
                    iteration: last.iteration_number,
                    score: last.critique.quality_score,
                    threshold: config.quality_threshold.unwrap_or_default(),
                });
            }
            StopReason::Converged => {
                let answer_similarity = history
                    .len()
                    .checked_sub(2)
                    .map(|i| similarity(&last.answer, &history[i].answer))
                    .unwrap_or(0.0);
                self.logger.log(&LogEvent::Converged {
                    iteration: last.iteration_number,
                    improvement: last.improvement_from_previous,
                    similarity: answer_similarity,
                });
            }
        }
    }

    fn finish(
        &self,
        run_id: Uuid,
        history: Vec<IterationRecord>,
        final_answer: String,
        reason: StopReason,
        started: Instant,
    ) -> RunResult {
        let result = RunResult {
            run_id,
            iterations: history,
            final_answer,
            stop_reason: reason,
            convergence_detected: reason == StopReason::Converged,
            total_duration_secs: started.elapsed().as_secs_f64(),
        };

        self.logger.log(&LogEvent::RunCompleted {
            run_id,
            iterations: result.iterations.len(),
            initial_score: result.initial_score(),
            final_score: result.final_score(),
            duration_secs: result.total_duration_secs,
        });

        self.emit(&ProgressEvent::RunFinished {
            result: result.clone(),
        });

        info!(
            iterations = result.iterations.len(),
            stop_reason = %result.stop_reason,
            final_score = result.final_score(),
            "Run completed"
        );

        result
    }

    fn cancel(&self, iterations: usize, started: Instant) -> RunOutcome {
        info!(iterations, "Run cancelled");
        self.logger.log(&LogEvent::RunCancelled {
            iterations,
            duration_secs: started.elapsed().as_secs_f64(),
        });
        RunOutcome::cancelled(iterations, started.elapsed())
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}
