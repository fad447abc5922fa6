//! Line-oriented session over one instrumented runner.

use anyhow::{Context, Result};
use colored::Colorize;
use modelrun_abstraction::{ModelRunner, TaskInput};
use modelrun_models::{InputKind, ModelrunConfig, RunnerFactory, TracingSink, instrument};
use std::io::{self, BufRead};
use std::path::Path;
use std::sync::Arc;

use super::{print_output, report, resolve};
use crate::TargetArgs;

const IMAGE_PATH: &str = "output.png";

/// Execute the repl command.
///
/// Every non-empty stdin line is one input. Repeated inputs are answered
/// from the runner's cache for the rest of the session.
pub fn execute(config: &ModelrunConfig, target: &TargetArgs) -> Result<()> {
    let (task, backend, config) = resolve(config, target)?;
    let runner_config = config
        .runner_config(task, backend)
        .with_context(|| format!("No model configured for {task}"))?;
    let mut runner = instrument(RunnerFactory::create(runner_config), Arc::new(TracingSink));

    eprintln!("{} {} ({})", "modelrun".bold().cyan(), task, runner.model_id());

    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read stdin")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let input = match task.input_kind() {
            InputKind::Text => TaskInput::text(line),
            InputKind::File => TaskInput::file(line),
        };

        match report(runner.run(&input)) {
            Ok(Some(output)) => print_output(&output, Path::new(IMAGE_PATH), false)?,
            Ok(None) => {}
            Err(err) => eprintln!("{} {}", "Error:".red().bold(), err),
        }
    }

    let stats = runner.stats();
    println!("Cache: {} hits, {} misses, {} entries", stats.hits, stats.misses, stats.entries);
    Ok(())
}
