//! `tickflow` CLI entry-point.
//!
//! Available sub-commands:
//! - `validate`     — validate and compile a workflow JSON file.
//! - `compile`      — print the normalized interchange JSON of a workflow.
//! - `validate-dir` — validate every workflow JSON file in a directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use engine::{CompiledWorkflow, JinjaExpressionEvaluator, WorkflowLoader, WorkflowRegistry};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "tickflow",
    about = "Tick-driven workflow orchestration engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a workflow definition JSON file.
    Validate {
        /// Path to the workflow JSON file.
        path: PathBuf,
    },
    /// Print the compiled workflow as normalized JSON.
    Compile {
        /// Path to the workflow JSON file.
        path: PathBuf,
    },
    /// Validate every `*.json` workflow in a directory.
    ValidateDir {
        /// Directory holding workflow JSON files.
        dir: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        eprintln!("❌ {e:#}");
        std::process::exit(1);
    }
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Validate { path } => {
            let workflow = load(&path)?;
            println!(
                "✅ Workflow '{}' is valid. Steps: {:?}",
                workflow.id(),
                workflow.step_ids()
            );
        }
        Command::Compile { path } => {
            let workflow = load(&path)?;
            println!("{}", workflow.to_json()?);
        }
        Command::ValidateDir { dir } => {
            let registry = WorkflowRegistry::new();
            let count = loader(&dir)
                .register_all(&registry)
                .with_context(|| format!("cannot load workflows from {}", dir.display()))?;

            for workflow in registry.all() {
                debug!("'{}' has {} steps", workflow.id(), workflow.steps().len());
                println!("✅ {}", workflow.id());
            }
            println!("{count} workflow(s) valid");
        }
    }
    Ok(())
}

fn loader(dir: &Path) -> WorkflowLoader {
    WorkflowLoader::new(dir, Arc::new(JinjaExpressionEvaluator::new()))
}

fn load(path: &Path) -> anyhow::Result<CompiledWorkflow> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    loader(dir)
        .load_one(path)
        .with_context(|| format!("invalid workflow {}", path.display()))
}
