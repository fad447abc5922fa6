//! Notices emitted by the instrumentation decorators.

use modelrun_abstraction::{RunnerError, TaskInput};
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{info, warn};

/// The runner operation a notice refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `ModelRunner::load`.
    Load,
    /// `ModelRunner::run`.
    Run,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => f.write_str("load"),
            Self::Run => f.write_str("run"),
        }
    }
}

/// A single event observed around a runner call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallNotice {
    /// The operation was entered.
    Started {
        /// Which operation.
        operation: Operation,
        /// The runner's model.
        model_id: String,
    },
    /// The operation returned successfully.
    Finished {
        /// Which operation.
        operation: Operation,
        /// The runner's model.
        model_id: String,
        /// Wall-clock time spent in the call.
        elapsed: Duration,
    },
    /// The operation returned an error, which was passed on unchanged.
    Failed {
        /// Which operation.
        operation: Operation,
        /// The runner's model.
        model_id: String,
        /// Wall-clock time spent in the call.
        elapsed: Duration,
        /// The error returned to the caller.
        error: RunnerError,
    },
    /// A stored result was returned without calling the runner.
    CacheHit {
        /// The runner's model.
        model_id: String,
        /// The key that hit.
        input: TaskInput,
    },
}

impl CallNotice {
    /// Returns true for a `Started` notice of `operation`.
    pub fn is_started(&self, operation: Operation) -> bool {
        matches!(self, Self::Started { operation: op, .. } if *op == operation)
    }

    /// Returns true for a `Finished` notice of `operation`.
    pub fn is_finished(&self, operation: Operation) -> bool {
        matches!(self, Self::Finished { operation: op, .. } if *op == operation)
    }
}

/// Destination for call notices.
pub trait NoticeSink: Send + Sync {
    /// Records one notice.
    fn emit(&self, notice: &CallNotice);
}

/// Emits notices as `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NoticeSink for TracingSink {
    fn emit(&self, notice: &CallNotice) {
        match notice {
            CallNotice::Started { operation, model_id } => {
                info!(operation = %operation, model_id = %model_id, "Call started");
            }
            CallNotice::Finished { operation, model_id, elapsed } => {
                info!(
                    operation = %operation,
                    model_id = %model_id,
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    "Call finished"
                );
            }
            CallNotice::Failed { operation, model_id, elapsed, error } => {
                warn!(
                    operation = %operation,
                    model_id = %model_id,
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    error = %error,
                    "Call failed"
                );
            }
            CallNotice::CacheHit { model_id, input } => {
                info!(model_id = %model_id, input = %input, "Returning cached result");
            }
        }
    }
}

/// Keeps every notice in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    notices: Mutex<Vec<CallNotice>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded notices.
    pub fn notices(&self) -> Vec<CallNotice> {
        self.notices.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Counts the recorded notices matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&CallNotice) -> bool) -> usize {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|notice| predicate(notice))
            .count()
    }
}

impl NoticeSink for MemorySink {
    fn emit(&self, notice: &CallNotice) {
        self.notices.lock().unwrap_or_else(PoisonError::into_inner).push(notice.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemorySink::new();
        sink.emit(&CallNotice::Started { operation: Operation::Run, model_id: "m".into() });
        sink.emit(&CallNotice::Finished {
            operation: Operation::Run,
            model_id: "m".into(),
            elapsed: Duration::from_millis(3),
        });

        let notices = sink.notices();
        assert_eq!(notices.len(), 2);
        assert!(notices[0].is_started(Operation::Run));
        assert!(notices[1].is_finished(Operation::Run));
        assert!(!notices[1].is_finished(Operation::Load));
        assert_eq!(sink.count(|n| n.is_started(Operation::Run)), 1);
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::Load.to_string(), "load");
        assert_eq!(Operation::Run.to_string(), "run");
    }
}
