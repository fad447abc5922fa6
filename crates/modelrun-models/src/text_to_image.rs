//! Text-to-image runner.

use modelrun_abstraction::{
    GeneratedImage, GenerationParameters, ModelRunner, RunnerError, TaskInput, TaskOutput,
};
use serde::Serialize;
use tracing::debug;

use crate::hub::{HubModel, HubSettings};
use crate::task::Task;

/// Generates one image per prompt.
#[derive(Debug, Clone)]
pub struct TextToImageRunner {
    model: HubModel,
    parameters: GenerationParameters,
}

#[derive(Serialize)]
struct DiffusionParameters {
    num_inference_steps: u32,
}

impl TextToImageRunner {
    /// Creates an unloaded runner for `model_id`.
    pub fn new(
        model_id: impl Into<String>,
        settings: HubSettings,
        parameters: GenerationParameters,
    ) -> Self {
        Self { model: HubModel::new(model_id, settings), parameters }
    }
}

impl ModelRunner for TextToImageRunner {
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
        Task::TextToImage.validate(input)
    }

    fn run(&mut self, input: &TaskInput) -> Result<TaskOutput, RunnerError> {
        let prompt = Task::TextToImage.text_input(input)?;
        if !self.is_loaded() {
            self.load()?;
        }

        let parameters =
            DiffusionParameters { num_inference_steps: self.parameters.num_inference_steps };
        let (bytes, content_type) = self.model.endpoint()?.infer_binary(prompt, parameters)?;

        if bytes.is_empty() {
            return Err(RunnerError::ModelResponseError(format!(
                "Model '{}' returned an empty image",
                self.model.model_id()
            )));
        }

        debug!(
            model_id = %self.model.model_id(),
            size = bytes.len(),
            %content_type,
            "Image generated"
        );
        Ok(TaskOutput::Image(GeneratedImage { bytes, content_type }))
    }
}
