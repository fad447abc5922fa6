//! Runner factory for creating runners from configuration.
//!
//! Maps a task and backend to exactly one concrete runner.

use crate::{
    AudioTranscriptionRunner, HubSettings, ImageClassificationRunner, MockRunner, Task,
    TextGenerationRunner, TextToImageRunner,
};
use modelrun_abstraction::{GenerationParameters, ModelRunner};
use std::str::FromStr;
use tracing::debug;

/// Where a runner sends its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// The hosted inference service.
    #[default]
    Hub,
    /// Offline mock for testing and demos.
    Mock,
}

impl FromStr for Backend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hub" | "huggingface" | "remote" => Ok(Self::Hub),
            "mock" => Ok(Self::Mock),
            _ => Err(()),
        }
    }
}

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// The task the runner serves.
    pub task: Task,
    /// The model ID passed to the service.
    pub model_id: String,
    /// The backend to use.
    pub backend: Backend,
    /// Service connection settings.
    pub hub: HubSettings,
    /// Fixed inference budget.
    pub parameters: GenerationParameters,
}

impl RunnerConfig {
    /// Creates a hub-backed configuration with default settings.
    #[must_use]
    pub fn new(task: Task, model_id: String) -> Self {
        Self {
            task,
            model_id,
            backend: Backend::Hub,
            hub: HubSettings::default(),
            parameters: GenerationParameters::default(),
        }
    }

    /// Sets the backend.
    #[must_use]
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Sets the service connection settings.
    #[must_use]
    pub fn with_hub(mut self, hub: HubSettings) -> Self {
        self.hub = hub;
        self
    }

    /// Sets the inference budget.
    #[must_use]
    pub fn with_parameters(mut self, parameters: GenerationParameters) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Factory for creating runner instances.
pub struct RunnerFactory;

impl RunnerFactory {
    /// Creates an unloaded runner from the given configuration.
    pub fn create(config: RunnerConfig) -> Box<dyn ModelRunner> {
        debug!(
            task = %config.task,
            backend = ?config.backend,
            model_id = %config.model_id,
            "Creating runner instance"
        );

        let RunnerConfig { task, model_id, backend, hub, parameters } = config;
        match (backend, task) {
            (Backend::Mock, task) => Box::new(MockRunner::for_task(model_id, task)),
            (Backend::Hub, Task::TextGeneration) => {
                Box::new(TextGenerationRunner::new(model_id, hub, parameters))
            }
            (Backend::Hub, Task::TextToImage) => {
                Box::new(TextToImageRunner::new(model_id, hub, parameters))
            }
            (Backend::Hub, Task::ImageClassification) => {
                Box::new(ImageClassificationRunner::new(model_id, hub))
            }
            (Backend::Hub, Task::AudioTranscription) => {
                Box::new(AudioTranscriptionRunner::new(model_id, hub))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelrun_abstraction::{TaskInput, TaskOutput};

    #[test]
    fn test_backend_from_str() {
        assert_eq!(Backend::from_str("hub"), Ok(Backend::Hub));
        assert_eq!(Backend::from_str("HuggingFace"), Ok(Backend::Hub));
        assert_eq!(Backend::from_str("MOCK"), Ok(Backend::Mock));
        assert_eq!(Backend::from_str("gpu"), Err(()));
    }

    #[test]
    fn test_runner_config() {
        let config = RunnerConfig::new(Task::TextGeneration, "demo-model".to_string());
        assert_eq!(config.backend, Backend::Hub);
        assert_eq!(config.parameters.max_new_tokens, 50);

        let config = config.with_backend(Backend::Mock);
        assert_eq!(config.backend, Backend::Mock);
    }

    #[test]
    fn test_factory_creates_unloaded_runner() {
        for task in Task::ALL {
            let config = RunnerConfig::new(task, format!("{}-model", task.slug()));
            let runner = RunnerFactory::create(config);
            assert_eq!(runner.model_id(), format!("{}-model", task.slug()));
            assert!(!runner.is_loaded());
        }
    }

    #[test]
    fn test_factory_mock_backend_runs_offline() {
        let config = RunnerConfig::new(Task::TextGeneration, "demo-model".to_string())
            .with_backend(Backend::Mock);
        let mut runner = RunnerFactory::create(config);
        let output = runner.run(&TaskInput::text("hello")).unwrap();
        assert!(matches!(output, TaskOutput::Text(_)));
    }

    #[test]
    fn test_hub_runner_rejects_missing_input_before_loading() {
        let config = RunnerConfig::new(Task::TextToImage, "sd".to_string());
        let mut runner = RunnerFactory::create(config);
        let err = runner.run(&TaskInput::text("  ")).unwrap_err();
        assert!(err.is_missing_input());
        assert!(!runner.is_loaded());
    }
}
