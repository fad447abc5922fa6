//! modelrun CLI - run inference tasks against hosted or mock models.
//!
//! Provides the `modelrun-cli` command: pick a task, hand it text or a file,
//! and print what the model produced.

mod commands;

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use modelrun_models::ModelrunConfig;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{init, repl, run, tasks};

/// modelrun - run text, image and audio models from the command line
#[derive(Parser, Debug)]
#[command(
    name = "modelrun-cli",
    author,
    version,
    about = "Run inference tasks against hosted or mock models"
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Configuration file (skips ~/.modelrun/config.toml and ./.modelrunrc)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Which task to run and which model serves it.
#[derive(ClapArgs, Debug, Clone)]
pub struct TargetArgs {
    /// Task name (text-to-image, image-classification, audio-transcription, text-generation)
    #[arg(short, long)]
    pub task: String,

    /// Model id (overrides the configured model for the task)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Backend serving the model (hub, mock)
    #[arg(short, long)]
    pub backend: Option<String>,

    /// Use the offline mock backend (same as --backend mock)
    #[arg(long, conflicts_with = "backend")]
    pub mock: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a task once
    ///
    /// Text tasks take --text, file tasks take --file. Generated images are
    /// written to --output.
    Run {
        #[command(flatten)]
        target: TargetArgs,

        /// Text input (prompt)
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,

        /// File input (image or audio)
        #[arg(long)]
        file: Option<PathBuf>,

        /// Where generated images are written
        #[arg(short, long, default_value = "output.png")]
        output: PathBuf,

        /// Print the output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a task once per stdin line, caching repeated inputs
    Repl {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Write a default configuration file
    Init {
        /// Write ~/.modelrun/config.toml instead of ./.modelrunrc
        #[arg(long)]
        global: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// List tasks and their configured models
    Tasks {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ModelrunConfig> {
    let config = match path {
        Some(path) => {
            let mut config = ModelrunConfig::load_from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.apply_env(|key| std::env::var(key).ok());
            config.validate()?;
            config
        }
        None => ModelrunConfig::discover_and_load().context("Failed to load configuration")?,
    };
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = if matches!(args.command, Command::Init { .. }) {
        ModelrunConfig::default()
    } else {
        load_config(args.config.as_ref())?
    };

    let level = match args.log_level.as_deref().or(config.log_level.as_deref()).unwrap_or("info") {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Run { target, text, file, output, json } => {
            run::execute(&config, &target, text, file, &output, json)?;
        }
        Command::Repl { target } => {
            repl::execute(&config, &target)?;
        }
        Command::Init { global, force } => {
            init::execute(args.config.as_deref(), global, force)?;
        }
        Command::Tasks { json } => {
            tasks::execute(&config, json)?;
        }
    }

    Ok(())
}
