//! Command implementations for the modelrun CLI.

pub mod init;
pub mod repl;
pub mod run;
pub mod tasks;

use anyhow::{Context, Result};
use colored::Colorize;
use modelrun_abstraction::{RunnerError, TaskOutput};
use modelrun_models::{Backend, ModelrunConfig, Task};
use std::path::Path;

use crate::TargetArgs;

/// Resolves the task and backend, folding a `--model` override into a copy
/// of the configuration.
fn resolve(
    config: &ModelrunConfig,
    target: &TargetArgs,
) -> Result<(Task, Backend, ModelrunConfig)> {
    let task: Task = target.task.parse()?;
    let backend = match (&target.backend, target.mock) {
        (_, true) => Backend::Mock,
        (Some(name), false) => name
            .parse::<Backend>()
            .map_err(|()| anyhow::anyhow!("Unknown backend: {name} (expected hub or mock)"))?,
        (None, false) => Backend::default(),
    };

    let mut config = config.clone();
    if let Some(model) = &target.model {
        config.models.insert(task, model.clone());
    }

    if backend == Backend::Hub && config.model_for(task).is_none() {
        anyhow::bail!(
            "No model configured for {task}; pass --model or set models.{} (or use --mock)",
            task.slug()
        );
    }

    Ok((task, backend, config))
}

/// Prints a missing-input status line; any other error is returned.
fn report(result: Result<TaskOutput, RunnerError>) -> Result<Option<TaskOutput>> {
    match result {
        Ok(output) => Ok(Some(output)),
        Err(err) if err.is_missing_input() => {
            eprintln!("{}", err.to_string().yellow());
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

/// Writes image bytes to `image_path` and prints everything else.
fn print_output(output: &TaskOutput, image_path: &Path, json: bool) -> Result<()> {
    if let TaskOutput::Image(image) = output {
        std::fs::write(image_path, &image.bytes)
            .with_context(|| format!("Failed to write image to {}", image_path.display()))?;
        eprintln!("{} {}", "Image saved to".green(), image_path.display());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(output)?);
    } else if !matches!(output, TaskOutput::Image(_)) {
        println!("{output}");
    }
    Ok(())
}
