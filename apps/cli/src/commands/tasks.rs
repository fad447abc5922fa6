//! Tasks command implementation.

use anyhow::Result;
use colored::Colorize;
use modelrun_models::{ModelrunConfig, Task};
use serde_json::json;

/// Execute the tasks command.
pub fn execute(config: &ModelrunConfig, json_output: bool) -> Result<()> {
    if json_output {
        let tasks: Vec<_> = Task::ALL
            .iter()
            .map(|task| {
                json!({
                    "task": task.slug(),
                    "name": task.to_string(),
                    "input": task.input_kind().to_string(),
                    "model": config.model_for(*task),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }

    println!("{}", format!("Tasks ({})", Task::ALL.len()).bold().cyan());
    for task in Task::ALL {
        let model = config
            .model_for(task)
            .map_or_else(|| "not configured".dimmed().to_string(), str::to_string);
        println!("  {:<22} {:<5} {}", task.slug(), task.input_kind().to_string(), model);
    }
    Ok(())
}
