//! The tasks a user can pick from.

use modelrun_abstraction::{RunnerError, TaskInput};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// What kind of input a task consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// A text prompt.
    Text,
    /// A path to an image or audio file.
    File,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::File => f.write_str("file"),
        }
    }
}

/// A pretrained-model task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Task {
    /// Generate an image from a text prompt.
    TextToImage,
    /// Label the contents of an image file.
    ImageClassification,
    /// Transcribe speech in an audio file.
    AudioTranscription,
    /// Continue a text prompt.
    TextGeneration,
}

impl Task {
    /// Every task, in menu order.
    pub const ALL: [Self; 4] = [
        Self::TextToImage,
        Self::ImageClassification,
        Self::AudioTranscription,
        Self::TextGeneration,
    ];

    /// Kebab-case name used in configuration and on the command line.
    pub const fn slug(self) -> &'static str {
        match self {
            Self::TextToImage => "text-to-image",
            Self::ImageClassification => "image-classification",
            Self::AudioTranscription => "audio-transcription",
            Self::TextGeneration => "text-generation",
        }
    }

    /// The input this task needs.
    pub const fn input_kind(self) -> InputKind {
        match self {
            Self::TextToImage | Self::TextGeneration => InputKind::Text,
            Self::ImageClassification | Self::AudioTranscription => InputKind::File,
        }
    }

    /// Status line shown while the task runs.
    pub const fn progress_message(self) -> &'static str {
        match self {
            Self::TextToImage => "Generating image, please wait...",
            Self::ImageClassification => "Classifying image...",
            Self::AudioTranscription => "Transcribing audio...",
            Self::TextGeneration => "Generating text...",
        }
    }

    /// Status line shown when the required input is missing.
    pub const fn missing_input_message(self) -> &'static str {
        match self {
            Self::TextToImage => "Please enter some text for text-to-image.",
            Self::ImageClassification => "Please choose an image file first.",
            Self::AudioTranscription => "Please choose an audio file first.",
            Self::TextGeneration => "Please enter a text prompt.",
        }
    }

    /// Returns the prompt of a text task's input.
    pub fn text_input(self, input: &TaskInput) -> Result<&str, RunnerError> {
        match input.as_text() {
            Some(text) if self.input_kind() == InputKind::Text && !text.trim().is_empty() => {
                Ok(text)
            }
            _ => Err(self.missing_input()),
        }
    }

    /// Returns the path of a file task's input.
    pub fn file_input(self, input: &TaskInput) -> Result<&Path, RunnerError> {
        match input.as_path() {
            Some(path) if self.input_kind() == InputKind::File && !path.as_os_str().is_empty() => {
                Ok(path)
            }
            _ => Err(self.missing_input()),
        }
    }

    /// Checks that `input` is present and of the right kind.
    pub fn validate(self, input: &TaskInput) -> Result<(), RunnerError> {
        match self.input_kind() {
            InputKind::Text => self.text_input(input).map(drop),
            InputKind::File => self.file_input(input).map(drop),
        }
    }

    fn missing_input(self) -> RunnerError {
        RunnerError::MissingInput(self.missing_input_message().to_string())
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TextToImage => f.write_str("Text-to-Image"),
            Self::ImageClassification => f.write_str("Image-Classification"),
            Self::AudioTranscription => f.write_str("Audio-Transcription"),
            Self::TextGeneration => f.write_str("Text-Generation"),
        }
    }
}

impl FromStr for Task {
    type Err = RunnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', ' '], "-");
        Self::ALL
            .into_iter()
            .find(|task| task.slug() == normalized)
            .ok_or_else(|| RunnerError::UnsupportedTask(format!("Unrecognized task: {s}")))
    }
}
