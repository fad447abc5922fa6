//! Task-indexed runner table.

use modelrun_abstraction::{ModelRunner, RunnerError, TaskInput, TaskOutput};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::config::ModelrunConfig;
use crate::factory::{Backend, RunnerFactory};
use crate::instrument::{Logged, NoticeSink, instrument};
use crate::task::Task;

/// Holds one runner per task and dispatches by lookup.
#[derive(Default)]
pub struct RunnerRegistry {
    runners: BTreeMap<Task, Box<dyn ModelRunner>>,
}

impl RunnerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a decorated runner for every task that has a model.
    ///
    /// With the hub backend only configured tasks are registered; the mock
    /// backend covers every task, falling back to `mock-<task>` model ids.
    pub fn from_config(
        config: &ModelrunConfig,
        backend: Backend,
        sink: Arc<dyn NoticeSink>,
    ) -> Self {
        let mut registry = Self::new();

        for task in Task::ALL {
            let Some(runner_config) = config.runner_config(task, backend) else {
                continue;
            };
            let runner = RunnerFactory::create(runner_config);
            let runner: Box<dyn ModelRunner> = if config.cache.enabled {
                Box::new(instrument(runner, Arc::clone(&sink)))
            } else {
                Box::new(Logged::new(runner, Arc::clone(&sink)))
            };
            registry.register(task, runner);
        }

        info!(tasks = registry.runners.len(), backend = ?backend, "Runner registry ready");
        registry
    }

    /// Registers `runner` for `task`, returning the runner it replaced.
    pub fn register(
        &mut self,
        task: Task,
        runner: Box<dyn ModelRunner>,
    ) -> Option<Box<dyn ModelRunner>> {
        self.runners.insert(task, runner)
    }

    /// Returns true if a runner is registered for `task`.
    pub fn contains(&self, task: Task) -> bool {
        self.runners.contains_key(&task)
    }

    /// Registered tasks, in menu order.
    pub fn tasks(&self) -> Vec<Task> {
        self.runners.keys().copied().collect()
    }

    /// Returns the runner registered for `task`.
    pub fn get_mut(&mut self, task: Task) -> Result<&mut (dyn ModelRunner + 'static), RunnerError> {
        match self.runners.get_mut(&task) {
            Some(runner) => Ok(runner.as_mut()),
            None => Err(RunnerError::UnsupportedTask(format!("No model configured for {task}"))),
        }
    }

    /// Validates `input` for `task`, then runs the task's runner.
    pub fn run(&mut self, task: Task, input: &TaskInput) -> Result<TaskOutput, RunnerError> {
        task.validate(input)?;
        self.get_mut(task)?.run(input)
    }
}
