//! Memoizing decorator keyed by task input.

use modelrun_abstraction::{ModelRunner, RunnerError, TaskInput, TaskOutput};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::notice::{CallNotice, NoticeSink, TracingSink};

/// Cache statistics for observability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls answered from the cache.
    pub hits: u64,
    /// Calls forwarded to the wrapped runner.
    pub misses: u64,
    /// Number of stored results.
    pub entries: usize,
}

/// Wraps a runner and stores every successful `run` result under its input.
///
/// A repeated input is answered from the cache without touching the wrapped
/// runner. Failed calls are not stored. Entries are never evicted: the cache
/// lives exactly as long as the decorator and grows with each distinct input.
pub struct Cached<R> {
    inner: R,
    entries: HashMap<TaskInput, TaskOutput>,
    stats: CacheStats,
    sink: Arc<dyn NoticeSink>,
}

impl<R: ModelRunner> Cached<R> {
    /// Wraps `inner`, reporting cache hits to `sink`.
    pub fn new(inner: R, sink: Arc<dyn NoticeSink>) -> Self {
        Self { inner, entries: HashMap::new(), stats: CacheStats::default(), sink }
    }

    /// Wraps `inner`, reporting cache hits through `tracing`.
    pub fn with_tracing(inner: R) -> Self {
        Self::new(inner, Arc::new(TracingSink))
    }

    /// Returns the wrapped runner.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Returns a snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats { entries: self.entries.len(), ..self.stats.clone() }
    }

    /// Returns true if a result is stored for `input`.
    pub fn contains(&self, input: &TaskInput) -> bool {
        self.entries.contains_key(input)
    }

    /// Number of stored results.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<R: ModelRunner> ModelRunner for Cached<R> {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn is_loaded(&self) -> bool {
        self.inner.is_loaded()
    }

    fn load(&mut self) -> Result<(), RunnerError> {
        self.inner.load()
    }

    fn validate(&self, input: &TaskInput) -> Result<(), RunnerError> {
        self.inner.validate(input)
    }

    fn run(&mut self, input: &TaskInput) -> Result<TaskOutput, RunnerError> {
        if let Some(stored) = self.entries.get(input) {
            self.stats.hits += 1;
            self.sink.emit(&CallNotice::CacheHit {
                model_id: self.inner.model_id().to_string(),
                input: input.clone(),
            });
            return Ok(stored.clone());
        }

        self.stats.misses += 1;
        debug!(model_id = %self.inner.model_id(), "Cache miss");

        let output = self.inner.run(input)?;
        self.entries.insert(input.clone(), output.clone());
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::MemorySink;
    use crate::MockRunner;

    fn cached() -> (Cached<MockRunner>, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let runner =
            Cached::new(MockRunner::new("demo-model"), Arc::clone(&sink) as Arc<dyn NoticeSink>);
        (runner, sink)
    }

    #[test]
    fn test_repeated_input_runs_once() {
        let (mut runner, sink) = cached();

        let first = runner.run(&TaskInput::text("hello")).unwrap();
        let second = runner.run(&TaskInput::text("hello")).unwrap();

        assert_eq!(first, second);
        assert_eq!(runner.inner().run_count(), 1);
        assert_eq!(runner.stats(), CacheStats { hits: 1, misses: 1, entries: 1 });
        assert_eq!(sink.count(|n| matches!(n, CallNotice::CacheHit { .. })), 1);
    }

    #[test]
    fn test_distinct_inputs_run_separately() {
        let (mut runner, _sink) = cached();

        runner.run(&TaskInput::text("hello")).unwrap();
        runner.run(&TaskInput::text("world")).unwrap();

        assert_eq!(runner.inner().run_count(), 2);
        assert_eq!(runner.len(), 2);
        assert!(runner.contains(&TaskInput::text("hello")));
        assert!(runner.contains(&TaskInput::text("world")));
    }

    #[test]
    fn test_failed_run_is_not_stored() {
        let mut runner = Cached::with_tracing(
            MockRunner::new("demo-model")
                .failing_with(RunnerError::ModelResponseError("boom".into())),
        );

        for _ in 0..2 {
            let err = runner.run(&TaskInput::text("hello")).unwrap_err();
            assert_eq!(err, RunnerError::ModelResponseError("boom".into()));
        }

        assert!(runner.is_empty());
        assert_eq!(runner.inner().run_count(), 2);
        assert_eq!(runner.stats().misses, 2);
    }

    #[test]
    fn test_load_is_forwarded() {
        let (mut runner, sink) = cached();
        assert!(!runner.is_loaded());
        runner.load().unwrap();
        assert!(runner.is_loaded());
        assert!(sink.notices().is_empty());
    }
}
