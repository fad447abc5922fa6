//! Run command implementation.

use anyhow::Result;
use colored::Colorize;
use modelrun_abstraction::TaskInput;
use modelrun_models::{ModelrunConfig, RunnerRegistry, TracingSink};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{print_output, report, resolve};
use crate::TargetArgs;

/// Execute the run command.
pub fn execute(
    config: &ModelrunConfig,
    target: &TargetArgs,
    text: Option<String>,
    file: Option<PathBuf>,
    output_path: &Path,
    json: bool,
) -> Result<()> {
    let (task, backend, config) = resolve(config, target)?;
    let mut registry = RunnerRegistry::from_config(&config, backend, Arc::new(TracingSink));

    let input = match file {
        Some(path) => TaskInput::File(path),
        None => TaskInput::Text(text.unwrap_or_default()),
    };

    let result = task.validate(&input).and_then(|()| {
        eprintln!("{}", task.progress_message().dimmed());
        registry.run(task, &input)
    });
    if let Some(output) = report(result)? {
        print_output(&output, output_path, json)?;
    }
    Ok(())
}
