use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use trawler::config::TasksFile;
use trawler::plugins;
use trawler::registry::PluginRegistry;
use trawler::task::{Task, TaskOptions, run_tasks};

#[derive(Parser)]
#[command(name = "trawler")]
#[command(version, about = "Phase-ordered task execution engine")]
pub struct Cli {
    /// Path to the tasks file
    #[arg(short, long, default_value = "trawler.yml")]
    pub config: PathBuf,

    /// Run only the named task (repeatable); default is all tasks
    #[arg(short, long)]
    pub task: Vec<String>,

    /// Run state transitions and learn handlers without download/output
    #[arg(long)]
    pub learn: bool,

    /// Ignore plugin rerun requests
    #[arg(long)]
    pub no_rerun: bool,

    #[arg(short, long)]
    pub verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .init();

    let tasks_file = TasksFile::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    let mut registry = PluginRegistry::new();
    plugins::register_shipped(&mut registry).context("Failed to register shipped plugins")?;
    let registry = Arc::new(registry);

    let options = TaskOptions {
        learn: cli.learn,
        no_rerun: cli.no_rerun,
    };

    let mut tasks = Vec::new();
    for (name, config) in &tasks_file.tasks {
        if !cli.task.is_empty() && !cli.task.contains(name) {
            continue;
        }
        tasks.push(
            Task::new(name, Arc::clone(&registry), config.clone()).with_options(options),
        );
    }
    if tasks.is_empty() {
        anyhow::bail!("No matching tasks in {}", cli.config.display());
    }

    let mut failed = false;
    for result in run_tasks(tasks).await {
        match result {
            Ok((report, _run)) => {
                println!(
                    "{}: {} accepted, {} rejected, {} failed, {} undecided ({} reruns, {:.2?})",
                    report.task,
                    report.accepted,
                    report.rejected,
                    report.failed,
                    report.undecided,
                    report.reruns,
                    report.duration,
                );
                for warning in &report.warnings {
                    println!("  warning [{}/{}]: {}", warning.plugin, warning.phase, warning.message);
                }
                if let Some(reason) = &report.aborted {
                    println!("  aborted: {reason}");
                    failed = true;
                }
            }
            Err(err) => {
                eprintln!("task execution failed: {err}");
                failed = true;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}
