//! Text generation runner.

use modelrun_abstraction::{
    GenerationParameters, ModelRunner, RunnerError, TaskInput, TaskOutput,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::hub::{HubModel, HubSettings};
use crate::task::Task;

/// Continues a text prompt with a fixed token budget.
#[derive(Debug, Clone)]
pub struct TextGenerationRunner {
    model: HubModel,
    parameters: GenerationParameters,
}

#[derive(Serialize)]
struct TextGenerationParameters {
    max_new_tokens: u32,
    do_sample: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct Candidate {
    generated_text: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Candidates {
    Many(Vec<Candidate>),
    One(Candidate),
}

impl TextGenerationRunner {
    /// Creates an unloaded runner for `model_id`.
    pub fn new(
        model_id: impl Into<String>,
        settings: HubSettings,
        parameters: GenerationParameters,
    ) -> Self {
        Self { model: HubModel::new(model_id, settings), parameters }
    }
}

impl ModelRunner for TextGenerationRunner {
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
        Task::TextGeneration.validate(input)
    }

    fn run(&mut self, input: &TaskInput) -> Result<TaskOutput, RunnerError> {
        let prompt = Task::TextGeneration.text_input(input)?;
        if !self.is_loaded() {
            self.load()?;
        }

        debug!(
            model_id = %self.model.model_id(),
            prompt_len = prompt.len(),
            max_new_tokens = self.parameters.max_new_tokens,
            "Generating text"
        );

        let parameters = TextGenerationParameters {
            max_new_tokens: self.parameters.max_new_tokens,
            do_sample: self.parameters.do_sample,
            temperature: self.parameters.temperature,
        };
        let candidates: Candidates = self.model.endpoint()?.infer_json(prompt, parameters)?;

        let first = match candidates {
            Candidates::Many(list) => list.into_iter().next(),
            Candidates::One(candidate) => Some(candidate),
        };
        first.map(|c| TaskOutput::Text(c.generated_text)).ok_or_else(|| {
            RunnerError::ModelResponseError(format!(
                "Model '{}' returned no candidates",
                self.model.model_id()
            ))
        })
    }
}
