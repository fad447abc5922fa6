//! Integration tests for the logging and caching decorator chain.

use modelrun_abstraction::{ModelRunner, RunnerError, TaskInput, TaskOutput};
use modelrun_models::{
    Cached, CallNotice, Logged, MemorySink, NoticeSink, Operation, instrument,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// A runner that only overrides what every runner must provide.
struct AbstractRunner;

impl ModelRunner for AbstractRunner {
    fn model_id(&self) -> &str {
        "abstract"
    }

    fn is_loaded(&self) -> bool {
        true
    }
}

/// A text-generation stand-in that counts real generations.
struct CountingGenerator {
    model_id: String,
    handle: Option<String>,
    generations: Arc<AtomicUsize>,
    fail_on: Option<String>,
}

impl CountingGenerator {
    fn new(model_id: &str, generations: &Arc<AtomicUsize>) -> Self {
        Self {
            model_id: model_id.to_string(),
            handle: None,
            generations: Arc::clone(generations),
            fail_on: None,
        }
    }
}

impl ModelRunner for CountingGenerator {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }

    fn load(&mut self) -> Result<(), RunnerError> {
        self.handle = Some(format!("pipeline:{}", self.model_id));
        Ok(())
    }

    fn run(&mut self, input: &TaskInput) -> Result<TaskOutput, RunnerError> {
        if self.handle.is_none() {
            self.load()?;
        }
        self.generations.fetch_add(1, Ordering::SeqCst);

        let prompt = input.as_text().unwrap_or_default();
        if self.fail_on.as_deref() == Some(prompt) {
            return Err(RunnerError::RequestError("service unavailable".into()));
        }
        Ok(TaskOutput::Text(format!("{prompt} and then some")))
    }
}

fn demo_chain() -> (impl ModelRunner, Arc<AtomicUsize>, Arc<MemorySink>) {
    let generations = Arc::new(AtomicUsize::new(0));
    let sink = Arc::new(MemorySink::new());
    let runner = instrument(
        CountingGenerator::new("demo-model", &generations),
        Arc::clone(&sink) as Arc<dyn NoticeSink>,
    );
    (runner, generations, sink)
}

fn run_notices(sink: &MemorySink) -> Vec<CallNotice> {
    sink.notices()
        .into_iter()
        .filter(|n| n.is_started(Operation::Run) || n.is_finished(Operation::Run))
        .collect()
}

#[test]
fn test_same_prompt_twice_generates_once() {
    let (mut runner, generations, sink) = demo_chain();

    let first = runner.run(&TaskInput::text("hello")).unwrap();
    let second = runner.run(&TaskInput::text("hello")).unwrap();

    assert_eq!(first, second);
    assert_eq!(generations.load(Ordering::SeqCst), 1);

    let notices = run_notices(&sink);
    assert_eq!(notices.len(), 2);
    assert!(notices[0].is_started(Operation::Run));
    assert!(notices[1].is_finished(Operation::Run));
}

#[test]
fn test_distinct_prompts_generate_separately() {
    let (mut runner, generations, sink) = demo_chain();

    runner.run(&TaskInput::text("hello")).unwrap();
    runner.run(&TaskInput::text("world")).unwrap();

    assert_eq!(generations.load(Ordering::SeqCst), 2);
    assert_eq!(run_notices(&sink).len(), 4);
}

#[test]
fn test_result_matches_undecorated_runner() {
    let generations = Arc::new(AtomicUsize::new(0));
    let mut plain = CountingGenerator::new("demo-model", &generations);
    let (mut decorated, _, _) = demo_chain();

    let input = TaskInput::text("hello");
    assert_eq!(decorated.run(&input).unwrap(), plain.run(&input).unwrap());
}

#[test]
fn test_finished_reports_elapsed_time() {
    let (mut runner, _, sink) = demo_chain();
    let start = Instant::now();
    runner.run(&TaskInput::text("hello")).unwrap();
    let total = start.elapsed();

    let finished = sink
        .notices()
        .into_iter()
        .find(|n| n.is_finished(Operation::Run))
        .unwrap();
    let CallNotice::Finished { model_id, elapsed, .. } = finished else {
        panic!("expected a finished notice");
    };
    assert_eq!(model_id, "demo-model");
    assert!(elapsed <= total);
}

#[test]
fn test_failure_is_returned_and_not_cached() {
    let generations = Arc::new(AtomicUsize::new(0));
    let sink = Arc::new(MemorySink::new());
    let mut generator = CountingGenerator::new("demo-model", &generations);
    generator.fail_on = Some("hello".into());
    let mut runner = instrument(generator, Arc::clone(&sink) as Arc<dyn NoticeSink>);

    for _ in 0..2 {
        let err = runner.run(&TaskInput::text("hello")).unwrap_err();
        assert_eq!(err, RunnerError::RequestError("service unavailable".into()));
    }

    assert_eq!(generations.load(Ordering::SeqCst), 2);
    assert!(!runner.contains(&TaskInput::text("hello")));
    let failed = sink.count(|n| matches!(n, CallNotice::Failed { operation: Operation::Run, .. }));
    assert_eq!(failed, 2);
}

#[test]
fn test_not_implemented_passes_through_chain() {
    let sink = Arc::new(MemorySink::new());
    let mut runner = instrument(AbstractRunner, Arc::clone(&sink) as Arc<dyn NoticeSink>);

    assert_eq!(runner.load(), Err(RunnerError::not_implemented("abstract", "load")));
    assert_eq!(
        runner.run(&TaskInput::text("hello")),
        Err(RunnerError::not_implemented("abstract", "run"))
    );
    assert!(runner.is_empty());
}

#[test]
fn test_logging_outside_cache_times_hits_too() {
    let generations = Arc::new(AtomicUsize::new(0));
    let sink = Arc::new(MemorySink::new());
    let inner = Cached::new(
        CountingGenerator::new("demo-model", &generations),
        Arc::clone(&sink) as Arc<dyn NoticeSink>,
    );
    let mut runner = Logged::new(inner, Arc::clone(&sink) as Arc<dyn NoticeSink>);

    runner.run(&TaskInput::text("hello")).unwrap();
    runner.run(&TaskInput::text("hello")).unwrap();

    assert_eq!(generations.load(Ordering::SeqCst), 1);
    assert_eq!(sink.count(|n| n.is_started(Operation::Run)), 2);
}
