//! Logging decorator: start/finish notices and wall-clock timing.

use modelrun_abstraction::{ModelRunner, RunnerError, TaskInput, TaskOutput};
use std::sync::Arc;
use std::time::Instant;

use super::notice::{CallNotice, NoticeSink, Operation, TracingSink};

/// Wraps a runner and reports every `load` and `run` call to a [`NoticeSink`].
///
/// Results and errors pass through untouched. Input rejected by the inner
/// runner's `validate` is returned before any notice is emitted. A lazy load
/// triggered by `run` goes through this decorator's own `load`, so it is
/// reported as a nested call.
pub struct Logged<R> {
    inner: R,
    sink: Arc<dyn NoticeSink>,
}

impl<R: ModelRunner> Logged<R> {
    /// Wraps `inner`, reporting to `sink`.
    pub fn new(inner: R, sink: Arc<dyn NoticeSink>) -> Self {
        Self { inner, sink }
    }

    /// Wraps `inner`, reporting through `tracing`.
    pub fn with_tracing(inner: R) -> Self {
        Self::new(inner, Arc::new(TracingSink))
    }

    /// Returns the wrapped runner.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn observe<T>(
        &mut self,
        operation: Operation,
        call: impl FnOnce(&mut Self) -> Result<T, RunnerError>,
    ) -> Result<T, RunnerError> {
        let sink = Arc::clone(&self.sink);
        let model_id = self.inner.model_id().to_string();

        sink.emit(&CallNotice::Started { operation, model_id: model_id.clone() });
        let start = Instant::now();
        let result = call(self);
        let elapsed = start.elapsed();

        match &result {
            Ok(_) => sink.emit(&CallNotice::Finished { operation, model_id, elapsed }),
            Err(error) => sink.emit(&CallNotice::Failed {
                operation,
                model_id,
                elapsed,
                error: error.clone(),
            }),
        }
        result
    }
}

impl<R: ModelRunner> ModelRunner for Logged<R> {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn is_loaded(&self) -> bool {
        self.inner.is_loaded()
    }

    fn load(&mut self) -> Result<(), RunnerError> {
        self.observe(Operation::Load, |this| this.inner.load())
    }

    fn validate(&self, input: &TaskInput) -> Result<(), RunnerError> {
        self.inner.validate(input)
    }

    fn run(&mut self, input: &TaskInput) -> Result<TaskOutput, RunnerError> {
        self.inner.validate(input)?;
        self.observe(Operation::Run, |this| {
            if !this.inner.is_loaded() {
                this.load()?;
            }
            this.inner.run(input)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::MemorySink;
    use crate::MockRunner;

    fn logged(sink: &Arc<MemorySink>) -> Logged<MockRunner> {
        Logged::new(MockRunner::new("demo-model"), Arc::clone(sink) as Arc<dyn NoticeSink>)
    }

    #[test]
    fn test_run_emits_started_then_finished() {
        let sink = Arc::new(MemorySink::new());
        let mut runner = logged(&sink);
        runner.load().unwrap();

        let output = runner.run(&TaskInput::text("hello")).unwrap();
        assert_eq!(output, MockRunner::new("demo-model").run(&TaskInput::text("hello")).unwrap());

        let notices = sink.notices();
        assert_eq!(notices.len(), 4);
        assert!(notices[2].is_started(Operation::Run));
        assert!(notices[3].is_finished(Operation::Run));
    }

    #[test]
    fn test_lazy_load_is_logged_inside_run() {
        let sink = Arc::new(MemorySink::new());
        let mut runner = logged(&sink);
        assert!(!runner.is_loaded());

        runner.run(&TaskInput::text("hello")).unwrap();
        assert!(runner.is_loaded());

        let notices = sink.notices();
        assert_eq!(notices.len(), 4);
        assert!(notices[0].is_started(Operation::Run));
        assert!(notices[1].is_started(Operation::Load));
        assert!(notices[2].is_finished(Operation::Load));
        assert!(notices[3].is_finished(Operation::Run));
    }

    #[test]
    fn test_failure_passes_through_with_failed_notice() {
        let sink = Arc::new(MemorySink::new());
        let mut runner = Logged::new(
            MockRunner::new("demo-model").failing_with(RunnerError::RequestError("down".into())),
            Arc::clone(&sink) as Arc<dyn NoticeSink>,
        );

        let err = runner.run(&TaskInput::text("hello")).unwrap_err();
        assert_eq!(err, RunnerError::RequestError("down".into()));

        let last = sink.notices().pop().unwrap();
        assert!(matches!(
            last,
            CallNotice::Failed {
                operation: Operation::Run,
                error: RunnerError::RequestError(_),
                ..
            }
        ));
        assert_eq!(sink.count(|n| n.is_finished(Operation::Run)), 0);
    }
}
