//! Speech recognition runner.

use modelrun_abstraction::{ModelRunner, RunnerError, TaskInput, TaskOutput};
use serde::Deserialize;
use tracing::debug;

use crate::hub::{HubModel, HubSettings, read_input_file};
use crate::task::Task;

/// Uploads an audio file and returns its transcript.
#[derive(Debug, Clone)]
pub struct AudioTranscriptionRunner {
    model: HubModel,
}

#[derive(Deserialize)]
struct Transcription {
    text: String,
}

impl AudioTranscriptionRunner {
    /// Creates an unloaded runner for `model_id`.
    pub fn new(model_id: impl Into<String>, settings: HubSettings) -> Self {
        Self { model: HubModel::new(model_id, settings) }
    }
}

impl ModelRunner for AudioTranscriptionRunner {
    fn model_id(&self) -> &str {
        self.model.model_id()
    }

    fn is_loaded(&self) -> bool {
        self.model.is_loaded()
    }

    fn load(&mut self) -> Result<(), RunnerError> {
        self.model.load()
    }

    fn validate(&self, input: &TaskInput) -> Result<(), RunnerError> {
        Task::AudioTranscription.validate(input)
    }

    fn run(&mut self, input: &TaskInput) -> Result<TaskOutput, RunnerError> {
        let path = Task::AudioTranscription.file_input(input)?;
        if !self.is_loaded() {
            self.load()?;
        }

        let bytes = read_input_file(path)?;
        debug!(
            model_id = %self.model.model_id(),
            path = %path.display(),
            size = bytes.len(),
            "Transcribing audio"
        );

        let transcription: Transcription = self.model.endpoint()?.infer_bytes(bytes)?;
        Ok(TaskOutput::Transcript(transcription.text))
    }
}
