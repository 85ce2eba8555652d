use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reloop_core::{
    Architecture, ProgressEvent, RefineRunner, RunConfig, RunError, RunOutcome, StopReason,
};
use reloop_logging::{LogFormat, Logger};
use reloop_model::{GeneratedText, GenerationRequest, ModelError, TextModel};

/// Test backend that replays a scripted sequence of critique scores and
/// improvement answers. Critique calls are recognized by the `<critique>`
/// block instructions in the prompt.
struct ScriptedModel {
    name: String,
    scores: Mutex<VecDeque<f64>>,
    critique_calls: AtomicUsize,
    generate_calls: AtomicUsize,
    call_log: Option<Arc<Mutex<Vec<String>>>>,
    fail_all: bool,
    garbage_critique: bool,
}

impl ScriptedModel {
    fn new(name: &str, scores: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            scores: Mutex::new(scores.into()),
            critique_calls: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
            call_log: None,
            fail_all: false,
            garbage_critique: false,
        }
    }

    fn with_call_log(mut self, log: Arc<Mutex<Vec<String>>>) -> Self {
        self.call_log = Some(log);
        self
    }

    fn failing(name: &str) -> Self {
        let mut model = Self::new(name, vec![]);
        model.fail_all = true;
        model
    }

    fn garbage(name: &str) -> Self {
        let mut model = Self::new(name, vec![]);
        model.garbage_critique = true;
        model
    }

    fn record(&self, kind: &str) {
        if let Some(ref log) = self.call_log {
            log.lock().unwrap().push(format!("{}:{}", self.name, kind));
        }
    }
}

#[async_trait]
impl TextModel for ScriptedModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn generate(
        &self,
        request: &GenerationRequest<'_>,
    ) -> Result<GeneratedText, ModelError> {
        if self.fail_all {
            return Err(ModelError::InvocationFailed("scripted failure".to_string()));
        }

        if request.prompt.contains("<critique>") {
            self.record("critique");
            self.critique_calls.fetch_add(1, Ordering::SeqCst);
            if self.garbage_critique {
                return Ok(GeneratedText::new(
                    "nothing structured in here".to_string(),
                    Duration::from_millis(5),
                ));
            }
            let score = self
                .scores
                .lock()
                .unwrap()
                .pop_front()
                .expect("critique script exhausted");
            let payload = format!(
                r#"<critique>{{"quality_score": {}, "weaknesses": ["thin"], "improvement_suggestions": ["expand"], "reasoning": "scripted"}}</critique>"#,
                score
            );
            Ok(GeneratedText::new(payload, Duration::from_millis(5)))
        } else {
            self.record("generate");
            let n = self.generate_calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(GeneratedText::new(
                format!("{} draft v{}", self.name, n),
                Duration::from_millis(5),
            ))
        }
    }
}

fn runner_for(models: Vec<Arc<dyn TextModel>>) -> RefineRunner {
    RefineRunner::new(models, Arc::new(Logger::new(LogFormat::Compact)))
}

fn completed(outcome: RunOutcome) -> reloop_core::RunResult {
    match outcome {
        RunOutcome::Completed(result) => result,
        RunOutcome::Cancelled { .. } => panic!("expected a completed run"),
    }
}

#[tokio::test]
async fn scenario_threshold_met() {
    let model = Arc::new(ScriptedModel::new("m0", vec![6.0, 9.2]));
    let runner = runner_for(vec![model.clone()]);
    let config = RunConfig::new(Architecture::Single, 5).with_quality_threshold(9.0);

    let outcome = runner
        .run("write a summary", Some("first draft".to_string()), &config)
        .await
        .unwrap();
    let result = completed(outcome);

    assert_eq!(result.iterations.len(), 2);
    assert_eq!(result.stop_reason, StopReason::ThresholdMet);
    assert!((result.final_score() - 9.2).abs() < 1e-9);
    assert!(!result.convergence_detected);
    // One improvement between the two critiques, no seed call
    assert_eq!(model.generate_calls.load(Ordering::SeqCst), 1);
    assert_eq!(model.critique_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn scenario_max_iterations() {
    let model = Arc::new(ScriptedModel::new("m0", vec![5.0, 6.0, 7.0]));
    let runner = runner_for(vec![model.clone()]);
    let config = RunConfig::new(Architecture::Single, 3).with_check_convergence(false);

    let result = completed(
        runner
            .run("task", Some("seed".to_string()), &config)
            .await
            .unwrap(),
    );

    assert_eq!(result.iterations.len(), 3);
    assert_eq!(result.stop_reason, StopReason::MaxIterations);
    // The final pass critiques without improving
    assert_eq!(model.generate_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn scenario_convergence_via_score_delta() {
    let model = Arc::new(ScriptedModel::new("m0", vec![6.0, 6.3]));
    let runner = runner_for(vec![model]);
    let config = RunConfig::new(Architecture::Single, 10);

    let result = completed(
        runner
            .run("task", Some("seed".to_string()), &config)
            .await
            .unwrap(),
    );

    assert_eq!(result.iterations.len(), 2);
    assert_eq!(result.stop_reason, StopReason::Converged);
    assert!(result.convergence_detected);
    let improvement = result.iterations[1].improvement_from_previous.unwrap();
    assert!((improvement - 0.05).abs() < 1e-9);
    assert!(result.iterations[0].improvement_from_previous.is_none());
}

#[tokio::test]
async fn seed_answer_used_verbatim() {
    let model = Arc::new(ScriptedModel::new("m0", vec![9.5]));
    let runner = runner_for(vec![model.clone()]);
    let config = RunConfig::new(Architecture::Single, 5).with_quality_threshold(9.0);

    let result = completed(
        runner
            .run("task", Some("exact seed text".to_string()), &config)
            .await
            .unwrap(),
    );

    assert_eq!(result.iterations[0].answer, "exact seed text");
    assert_eq!(result.final_answer, "exact seed text");
    assert_eq!(model.generate_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_seed_is_generated_by_first_model() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let m0 = Arc::new(ScriptedModel::new("m0", vec![9.5]).with_call_log(log.clone()));
    let runner = runner_for(vec![m0]);
    let config = RunConfig::new(Architecture::Single, 3).with_quality_threshold(9.0);

    let result = completed(runner.run("task", None, &config).await.unwrap());

    assert_eq!(log.lock().unwrap()[0], "m0:generate");
    assert_eq!(result.iterations[0].answer, "m0 draft v1");
}

#[tokio::test]
async fn single_architecture_same_model_both_roles() {
    let model = Arc::new(ScriptedModel::new("m0", vec![5.0, 6.5, 8.5]));
    let runner = runner_for(vec![model]);
    let config = RunConfig::new(Architecture::Single, 3).with_check_convergence(false);

    let result = completed(
        runner
            .run("task", Some("seed".to_string()), &config)
            .await
            .unwrap(),
    );

    for record in &result.iterations {
        assert_eq!(record.critic_model, "m0");
        assert_eq!(record.generator_model, "m0");
    }
}

#[tokio::test]
async fn dual_architecture_fixed_roles() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let generator = Arc::new(ScriptedModel::new("gen", vec![]).with_call_log(log.clone()));
    let critic = Arc::new(ScriptedModel::new("crit", vec![5.0, 6.5]).with_call_log(log.clone()));
    let runner = runner_for(vec![generator, critic]);
    let config = RunConfig::new(Architecture::Dual, 2).with_check_convergence(false);

    let result = completed(runner.run("task", None, &config).await.unwrap());

    for record in &result.iterations {
        assert_eq!(record.critic_model, "crit");
        assert_eq!(record.generator_model, "gen");
    }
    let log = log.lock().unwrap();
    assert_eq!(log[0], "gen:generate"); // seed
    assert_eq!(log[1], "crit:critique");
    assert_eq!(log[2], "gen:generate");
    assert_eq!(log[3], "crit:critique");
}

#[tokio::test]
async fn rotation_cycles_through_models() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let m0 = Arc::new(ScriptedModel::new("m0", vec![5.0]).with_call_log(log.clone()));
    let m1 = Arc::new(ScriptedModel::new("m1", vec![5.0]).with_call_log(log.clone()));
    let m2 = Arc::new(ScriptedModel::new("m2", vec![5.0]).with_call_log(log.clone()));
    let runner = runner_for(vec![m0, m1, m2]);
    let config = RunConfig::new(Architecture::MultiRotation, 3).with_check_convergence(false);

    let result = completed(runner.run("task", None, &config).await.unwrap());

    // Seed comes from models[0]; iteration i uses models[i % 3]
    assert_eq!(log.lock().unwrap()[0], "m0:generate");
    let critics: Vec<&str> = result
        .iterations
        .iter()
        .map(|it| it.critic_model.as_str())
        .collect();
    assert_eq!(critics, ["m1", "m2", "m0"]);
    for record in &result.iterations {
        assert_eq!(record.critic_model, record.generator_model);
    }
}

#[tokio::test]
async fn cancellation_returns_distinct_outcome() {
    let model = Arc::new(ScriptedModel::new("m0", vec![5.0]));
    let runner = runner_for(vec![model]);
    runner.interrupt_handle().store(true, Ordering::SeqCst);
    let config = RunConfig::new(Architecture::Single, 5);

    let outcome = runner
        .run("task", Some("seed".to_string()), &config)
        .await
        .unwrap();

    match outcome {
        RunOutcome::Cancelled { iterations, .. } => assert_eq!(iterations, 0),
        RunOutcome::Completed(_) => panic!("expected cancellation"),
    }
}

#[tokio::test]
async fn provider_failure_during_seed_aborts_run() {
    let model = Arc::new(ScriptedModel::failing("m0"));
    let runner = runner_for(vec![model]);
    let config = RunConfig::new(Architecture::Single, 5);

    let err = runner.run("task", None, &config).await.unwrap_err();
    assert!(matches!(err, RunError::Model(_)));
}

#[tokio::test]
async fn provider_failure_during_critique_aborts_run() {
    let model = Arc::new(ScriptedModel::failing("m0"));
    let runner = runner_for(vec![model]);
    let config = RunConfig::new(Architecture::Single, 5);

    let err = runner
        .run("task", Some("seed".to_string()), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Critique(_)));
}

#[tokio::test]
async fn unparseable_critique_aborts_run() {
    let model = Arc::new(ScriptedModel::garbage("m0"));
    let runner = runner_for(vec![model]);
    let config = RunConfig::new(Architecture::Single, 5);

    let err = runner
        .run("task", Some("seed".to_string()), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Critique(_)));
}

#[tokio::test]
async fn invalid_config_rejected_before_any_call() {
    let model = Arc::new(ScriptedModel::new("m0", vec![5.0]));
    let runner = runner_for(vec![model.clone()]);
    let config = RunConfig::new(Architecture::MultiRotation, 5);

    let err = runner.run("task", None, &config).await.unwrap_err();
    assert!(matches!(err, RunError::Config(_)));
    assert_eq!(model.generate_calls.load(Ordering::SeqCst), 0);
    assert_eq!(model.critique_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn progress_events_observe_each_iteration() {
    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();

    let model = Arc::new(ScriptedModel::new("m0", vec![6.0, 6.3]));
    let runner = runner_for(vec![model]).with_progress(Arc::new(move |event: &ProgressEvent| {
        let tag = match event {
            ProgressEvent::IterationCompleted {
                iteration_number,
                quality_score,
                ..
            } => format!("iter:{}:{}", iteration_number, quality_score),
            ProgressEvent::RunFinished { result } => {
                format!("finished:{}", result.iterations.len())
            }
        };
        sink.lock().unwrap().push(tag);
    }));
    let config = RunConfig::new(Architecture::Single, 10);

    runner
        .run("task", Some("seed".to_string()), &config)
        .await
        .unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.as_slice(), ["iter:1:6", "iter:2:6.3", "finished:2"]);
}
