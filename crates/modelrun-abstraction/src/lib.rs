//! Model runner abstraction for modelrun.
//!
//! This crate defines the `ModelRunner` capability together with the input,
//! output and error types shared by every runner and decorator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Represents an error that can occur when loading or running a model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunnerError {
    /// The runner does not provide this operation.
    #[error("'{operation}' is not implemented for model '{model_id}'")]
    NotImplemented {
        /// The model the runner is bound to.
        model_id: String,
        /// The operation that was invoked (`load` or `run`).
        operation: String,
    },

    /// Required text or file input is absent or of the wrong kind.
    #[error("{0}")]
    MissingInput(String),

    /// The input file could not be read.
    #[error("Input Error: {0}")]
    InputError(String),

    /// An error occurred during the service request (e.g., network issues).
    #[error("Request Error: {0}")]
    RequestError(String),

    /// The model service returned an error or an unusable response.
    #[error("Model Response Error: {0}")]
    ModelResponseError(String),

    /// An error occurred during serialization or deserialization.
    #[error("Serialization Error: {0}")]
    SerializationError(String),

    /// No runner is available for the requested task.
    #[error("Unsupported Task: {0}")]
    UnsupportedTask(String),

    /// Other unexpected errors.
    #[error("Other Runner Error: {0}")]
    Other(String),
}

impl RunnerError {
    /// Builds a `NotImplemented` error for `operation` on `model_id`.
    pub fn not_implemented(model_id: &str, operation: &str) -> Self {
        Self::NotImplemented { model_id: model_id.to_string(), operation: operation.to_string() }
    }

    /// Returns true when the error is a user-facing missing-input status.
    pub const fn is_missing_input(&self) -> bool {
        matches!(self, Self::MissingInput(_))
    }
}

/// Input handed to a runner. Also the memoization key, compared by exact equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TaskInput {
    /// Raw text, e.g. a prompt.
    Text(String),
    /// Path to an image or audio file.
    File(PathBuf),
}

impl TaskInput {
    /// Creates a text input.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Creates a file input.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Returns the text, if this is a text input.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::File(_) => None,
        }
    }

    /// Returns the path, if this is a file input.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for TaskInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A single classification result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    /// The predicted label.
    pub label: String,
    /// Confidence in `[0, 1]`.
    pub score: f32,
}

/// Raw image bytes returned by an image generation model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Encoded image data (PNG, JPEG, ...).
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
    /// MIME type reported by the service.
    pub content_type: String,
}

/// The result of one model invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TaskOutput {
    /// Generated text.
    Text(String),
    /// Label/score pairs, most likely first.
    Labels(Vec<LabelScore>),
    /// Transcribed speech.
    Transcript(String),
    /// A generated image.
    Image(GeneratedImage),
}

impl fmt::Display for TaskOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Labels(labels) => {
                let lines: Vec<String> =
                    labels.iter().map(|l| format!("{}: {:.3}", l.label, l.score)).collect();
                f.write_str(&lines.join("\n"))
            }
            Self::Transcript(text) => write!(f, "Transcription: {text}"),
            Self::Image(image) => {
                write!(f, "Generated image ({} bytes, {})", image.bytes.len(), image.content_type)
            }
        }
    }
}

/// Fixed inference budget a runner passes on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParameters {
    /// Maximum number of tokens to generate.
    pub max_new_tokens: u32,

    /// Whether to sample instead of decoding greedily.
    pub do_sample: bool,

    /// Sampling temperature. Left to the service when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Denoising steps for image generation.
    pub num_inference_steps: u32,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self { max_new_tokens: 50, do_sample: true, temperature: None, num_inference_steps: 20 }
    }
}

/// A runner owning one model identifier and a lazily loaded model handle.
///
/// Both operations fail with [`RunnerError::NotImplemented`] unless a
/// concrete runner overrides them. Concrete runners load lazily: `run`
/// calls `load` first when `is_loaded` is false.
pub trait ModelRunner: Send {
    /// Returns the identifier of the model this runner is bound to.
    fn model_id(&self) -> &str;

    /// Returns true once the model handle exists.
    fn is_loaded(&self) -> bool;

    /// Loads the model handle.
    ///
    /// # Errors
    /// Returns a `RunnerError` if the handle cannot be created.
    fn load(&mut self) -> Result<(), RunnerError> {
        Err(RunnerError::not_implemented(self.model_id(), "load"))
    }

    /// Checks that `input` has the kind this runner consumes.
    ///
    /// Called before any load or model work. Runners that accept anything
    /// keep the default.
    ///
    /// # Errors
    /// Returns [`RunnerError::MissingInput`] when the input is absent or of
    /// the wrong kind.
    fn validate(&self, _input: &TaskInput) -> Result<(), RunnerError> {
        Ok(())
    }

    /// Runs the model on `input`, loading it first if needed.
    ///
    /// # Errors
    /// Returns a `RunnerError` if the input is unusable or the model fails.
    fn run(&mut self, _input: &TaskInput) -> Result<TaskOutput, RunnerError> {
        Err(RunnerError::not_implemented(self.model_id(), "run"))
    }
}

impl<R: ModelRunner + ?Sized> ModelRunner for Box<R> {
    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    fn is_loaded(&self) -> bool {
        (**self).is_loaded()
    }

    fn load(&mut self) -> Result<(), RunnerError> {
        (**self).load()
    }

    fn validate(&self, input: &TaskInput) -> Result<(), RunnerError> {
        (**self).validate(input)
    }

    fn run(&mut self, input: &TaskInput) -> Result<TaskOutput, RunnerError> {
        (**self).run(input)
    }
}

mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unimplemented;

    impl ModelRunner for Unimplemented {
        fn model_id(&self) -> &str {
            "abstract-model"
        }

        fn is_loaded(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_default_operations_are_not_implemented() {
        let mut runner = Unimplemented;
        assert_eq!(runner.load(), Err(RunnerError::not_implemented("abstract-model", "load")));
        assert_eq!(
            runner.run(&TaskInput::text("hello")),
            Err(RunnerError::not_implemented("abstract-model", "run"))
        );
    }

    #[test]
    fn test_boxed_runner_forwards() {
        let mut runner: Box<dyn ModelRunner> = Box::new(Unimplemented);
        assert_eq!(runner.model_id(), "abstract-model");
        assert!(matches!(runner.load(), Err(RunnerError::NotImplemented { .. })));
        assert_eq!(runner.validate(&TaskInput::text("")), Ok(()));
    }

    #[test]
    fn test_not_implemented_message() {
        let err = RunnerError::not_implemented("demo-model", "run");
        assert_eq!(err.to_string(), "'run' is not implemented for model 'demo-model'");
        assert!(!err.is_missing_input());
        let missing = RunnerError::MissingInput("Please choose an image file first.".into());
        assert!(missing.is_missing_input());
    }

    #[test]
    fn test_task_input_keys_by_exact_value() {
        use std::collections::HashSet;

        let mut keys = HashSet::new();
        keys.insert(TaskInput::text("hello"));
        keys.insert(TaskInput::text("hello"));
        keys.insert(TaskInput::text("Hello"));
        keys.insert(TaskInput::text("hello "));
        keys.insert(TaskInput::file("hello"));
        assert_eq!(keys.len(), 4);
    }

    #[test]
    fn test_output_display() {
        let labels = TaskOutput::Labels(vec![
            LabelScore { label: "tabby cat".into(), score: 0.91234 },
            LabelScore { label: "tiger cat".into(), score: 0.05 },
        ]);
        assert_eq!(labels.to_string(), "tabby cat: 0.912\ntiger cat: 0.050");
        assert_eq!(
            TaskOutput::Transcript("hi there".into()).to_string(),
            "Transcription: hi there"
        );

        let image = TaskOutput::Image(GeneratedImage {
            bytes: vec![0; 16],
            content_type: "image/png".into(),
        });
        assert_eq!(image.to_string(), "Generated image (16 bytes, image/png)");
    }

    #[test]
    fn test_image_serializes_as_base64() {
        let output = TaskOutput::Image(GeneratedImage {
            bytes: b"png!".to_vec(),
            content_type: "image/png".into(),
        });
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["kind"], "image");
        assert_eq!(json["value"]["bytes"], "cG5nIQ==");

        let back: TaskOutput = serde_json::from_value(json).unwrap();
        assert_eq!(back, output);
    }

    #[test]
    fn test_generation_parameters_default() {
        let params = GenerationParameters::default();
        assert_eq!(params.max_new_tokens, 50);
        assert!(params.do_sample);
        assert_eq!(params.temperature, None);
        assert_eq!(params.num_inference_steps, 20);
    }
}
