//! Cross-cutting decorators around `ModelRunner`.
//!
//! The decorators implement `ModelRunner` themselves and are stacked in a
//! fixed order: caching outside, logging inside. A cache hit therefore
//! returns before the logging decorator sees the call.

pub mod caching;
pub mod logging;
pub mod notice;

pub use caching::{CacheStats, Cached};
pub use logging::Logged;
pub use notice::{CallNotice, MemorySink, NoticeSink, Operation, TracingSink};

use modelrun_abstraction::ModelRunner;
use std::sync::Arc;

/// A runner wrapped in the standard decorator chain.
pub type Instrumented<R> = Cached<Logged<R>>;

/// Wraps `runner` in logging, then caching, both reporting to `sink`.
pub fn instrument<R: ModelRunner>(runner: R, sink: Arc<dyn NoticeSink>) -> Instrumented<R> {
    Cached::new(Logged::new(runner, Arc::clone(&sink)), sink)
}
