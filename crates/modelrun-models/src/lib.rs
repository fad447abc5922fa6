//! Model runners for modelrun.
//!
//! This crate provides concrete implementations of the `ModelRunner` trait,
//! the decorators that instrument them, and the task registry that selects
//! one.
//!
//! # Supported Tasks
//!
//! - **Text-to-Image**: prompt in, image bytes out
//! - **Image-Classification**: image file in, label/score pairs out
//! - **Audio-Transcription**: audio file in, transcript out
//! - **Text-Generation**: prompt in, first generated candidate out
//!
//! Every task is served by the hosted inference service (`Backend::Hub`) or
//! by the offline `MockRunner` (`Backend::Mock`).

pub mod audio_transcription;
pub mod config;
pub mod factory;
pub mod hub;
pub mod image_classification;
pub mod instrument;
pub mod registry;
pub mod task;
pub mod text_generation;
pub mod text_to_image;

use modelrun_abstraction::{
    GeneratedImage, LabelScore, ModelRunner, RunnerError, TaskInput, TaskOutput,
};
use tracing::debug;

pub use audio_transcription::AudioTranscriptionRunner;
pub use config::{CacheSettings, ConfigError, ModelrunConfig};
pub use factory::{Backend, RunnerConfig, RunnerFactory};
pub use hub::{Endpoint, HubSettings};
pub use image_classification::ImageClassificationRunner;
pub use instrument::{
    CacheStats, Cached, CallNotice, Instrumented, Logged, MemorySink, NoticeSink, Operation,
    TracingSink, instrument,
};
pub use registry::RunnerRegistry;
pub use task::{InputKind, Task};
pub use text_generation::TextGenerationRunner;
pub use text_to_image::TextToImageRunner;

/// A mock implementation of the `ModelRunner` trait for testing and demonstration.
///
/// Produces deterministic, task-shaped output without any network access
/// and counts how often `run` actually executes.
#[derive(Debug)]
pub struct MockRunner {
    id: String,
    task: Task,
    loaded: bool,
    runs: usize,
    failure: Option<RunnerError>,
}

impl MockRunner {
    /// Creates an unloaded text-generation `MockRunner` with the given ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self::for_task(id, Task::TextGeneration)
    }

    /// Creates an unloaded `MockRunner` answering `task`.
    #[must_use]
    pub fn for_task(id: impl Into<String>, task: Task) -> Self {
        Self { id: id.into(), task, loaded: false, runs: 0, failure: None }
    }

    /// Makes every `run` fail with `error`.
    #[must_use]
    pub fn failing_with(mut self, error: RunnerError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Number of times `run` reached the model.
    pub const fn run_count(&self) -> usize {
        self.runs
    }

    fn respond(&self, input: &TaskInput) -> Result<TaskOutput, RunnerError> {
        Ok(match self.task {
            Task::TextGeneration => {
                let prompt = self.task.text_input(input)?;
                TaskOutput::Text(format!("{prompt}\nMock response from {}", self.id))
            }
            Task::TextToImage => {
                let prompt = self.task.text_input(input)?;
                TaskOutput::Image(GeneratedImage {
                    bytes: mock_pixmap(prompt),
                    content_type: "image/x-portable-pixmap".to_string(),
                })
            }
            Task::ImageClassification => {
                let path = self.task.file_input(input)?;
                let label = path
                    .file_stem()
                    .map_or_else(|| "unknown".to_string(), |s| s.to_string_lossy().into_owned());
                TaskOutput::Labels(vec![
                    LabelScore { label, score: 0.9 },
                    LabelScore { label: "other".to_string(), score: 0.1 },
                ])
            }
            Task::AudioTranscription => {
                let path = self.task.file_input(input)?;
                TaskOutput::Transcript(format!("mock transcript of {}", path.display()))
            }
        })
    }
}

impl ModelRunner for MockRunner {
    fn model_id(&self) -> &str {
        &self.id
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn load(&mut self) -> Result<(), RunnerError> {
        debug!(model_id = %self.id, task = %self.task, "MockRunner loading");
        self.loaded = true;
        Ok(())
    }

    fn validate(&self, input: &TaskInput) -> Result<(), RunnerError> {
        self.task.validate(input)
    }

    fn run(&mut self, input: &TaskInput) -> Result<TaskOutput, RunnerError> {
        if !self.loaded {
            self.load()?;
        }
        self.runs += 1;

        debug!(model_id = %self.id, input = %input, "MockRunner running");

        match &self.failure {
            Some(error) => Err(error.clone()),
            None => self.respond(input),
        }
    }
}

/// A tiny 2x2 binary PPM whose colour depends on the prompt.
fn mock_pixmap(prompt: &str) -> Vec<u8> {
    let shade = prompt.bytes().fold(0u8, u8::wrapping_add);
    let mut bytes = b"P6\n2 2\n255\n".to_vec();
    for _ in 0..4 {
        bytes.extend_from_slice(&[shade, shade.wrapping_mul(3), 255 - shade]);
    }
    bytes
}
