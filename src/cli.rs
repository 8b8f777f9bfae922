use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::engine::stdlib::{self, ClockDevice};
use crate::engine::{Project, Runtime, RuntimeEvent, TickSequencer};

#[derive(Parser)]
#[command(name = "blockflow")]
#[command(about = "Blockflow - run block scripts one tick at a time", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a project's green-flag scripts to completion
    Run {
        /// Project JSON file
        project: PathBuf,

        /// Tick limit (default: sequencer.max_ticks from config)
        #[arg(long)]
        ticks: Option<u64>,
    },

    /// List the top-level scripts of every target
    Scripts {
        /// Project JSON file
        project: PathBuf,
    },
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    let config = Config::builder()
        .config_path(cli.config.clone())
        .build()
        .context("Failed to load configuration")?;
    init_logging(&config);

    match cli.command {
        Commands::Run { project, ticks } => {
            let project = load_project(&project)?;
            let max_ticks = ticks.unwrap_or(config.sequencer.max_ticks);
            run_project(project, &config, max_ticks).await?;
        }

        Commands::Scripts { project } => {
            let project = load_project(&project)?;
            print_scripts(&project);
        }
    }

    Ok(())
}

fn init_logging(config: &Config) {
    // A second init (tests, embedding) is ignored
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_project(path: &Path) -> Result<Project> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read project {}", path.display()))?;
    Project::from_json(&json).with_context(|| format!("Failed to parse project {}", path.display()))
}

/// Runtime with the core primitives and the clock
pub fn build_runtime(project: Project) -> Runtime {
    let mut runtime = Runtime::new();
    stdlib::register_core_primitives(&mut runtime);
    runtime.register_io_device(stdlib::devices::CLOCK_DEVICE, ClockDevice::new());
    runtime.load_project(project);
    runtime
}

async fn run_project(project: Project, config: &Config, max_ticks: u64) -> Result<()> {
    let mut runtime = build_runtime(project);
    let mut sequencer = TickSequencer::new(config.sequencer.clone());

    let started = runtime.start_hats("event_whenflagclicked", None, None);
    info!(threads = started.len(), "Green flag");

    let mut interval = tokio::time::interval(Duration::from_millis(config.sequencer.tick_interval_ms.max(1)));
    let mut tick = 0;
    while tick < max_ticks {
        interval.tick().await;
        let finished = sequencer
            .step_threads(&mut runtime)
            .context("Primitive failed")?;
        tick += 1;

        for event in runtime.take_events() {
            print_event(&event);
        }
        if !finished.is_empty() {
            debug!(tick, finished = finished.len(), "Threads finished");
        }
        if runtime.threads().is_empty() {
            break;
        }
    }

    info!(
        ticks = tick,
        remaining = runtime.threads().len(),
        "Run complete"
    );
    Ok(())
}

fn print_event(event: &RuntimeEvent) {
    match event {
        RuntimeEvent::VisualReport { block_id, value } => println!("report {}: {}", block_id, value),
        RuntimeEvent::MonitorUpdate { block_id, value } => println!("monitor {}: {}", block_id, value),
    }
}

fn print_scripts(project: &Project) {
    for target in &project.targets {
        println!("Target: {} ({})", target.name, target.id);
        for top in target.blocks.scripts() {
            let opcode = target
                .blocks
                .get_block(top)
                .and_then(|b| b.opcode.as_deref())
                .unwrap_or("<none>");
            println!("  {}: {}", top, opcode);
        }
    }
}
