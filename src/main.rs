// ABOUTME: Entry point for the tinyci CLI application.
// ABOUTME: Loads configuration, connects to the local runtime and runs one pipeline.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use std::env;
use std::path::{Path, PathBuf};
use tinyci::config::{self, Config};
use tinyci::error::{Error, Result};
use tinyci::git::GitCli;
use tinyci::pipeline::{Orchestrator, PipelineError};
use tinyci::runtime::{self, BollardRuntime};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { namespace, force } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, namespace.as_deref(), force)?;
            println!("Wrote {}", cwd.join(config::CONFIG_FILENAME).display());
            Ok(())
        }
        Commands::Status => {
            let config = load_config(cli.config.as_deref())?;
            println!("Pipeline directory: {}", config.pipeline_dir().display());
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }
        Commands::Ci { url, name } => {
            let orchestrator = connect(cli.config.as_deref()).await?;
            let result = orchestrator.run_ci(&url, &name).await.map(|outcome| {
                if !outcome.pushed {
                    eprintln!("Warning: {} was built but not pushed", outcome.image);
                }
            });
            report(&orchestrator, result)
        }
        Commands::Deploy { image } => {
            let orchestrator = connect(cli.config.as_deref()).await?;
            let result = orchestrator.run_deploy(&image).await.map(|_| ());
            report(&orchestrator, result)
        }
        Commands::Shutdown => {
            let orchestrator = connect(cli.config.as_deref()).await?;
            let result = orchestrator.shutdown().await.map(|stopped| {
                eprintln!("Stopped {stopped} container(s)");
            });
            report(&orchestrator, result)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => {
            let cwd: PathBuf = env::current_dir()?;
            Config::discover(&cwd)
        }
    }
}

async fn connect(path: Option<&Path>) -> Result<Orchestrator<BollardRuntime, GitCli>> {
    let config = load_config(path)?;
    let runtime = runtime::connect_local(&config.runtime).await?;
    tracing::info!(runtime = %runtime.runtime_type(), "connected to container runtime");

    let source = GitCli::new(config.timeouts.git);
    Orchestrator::new(&config, runtime, source)
}

/// Print the run's snapshots as JSON, then surface its failure.
fn report(
    orchestrator: &Orchestrator<BollardRuntime, GitCli>,
    result: std::result::Result<(), PipelineError>,
) -> Result<()> {
    let snapshot = serde_json::json!({
        "details": orchestrator.details(),
        "last_deployment": orchestrator.last_deployment(),
    });
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    result.map_err(Error::from)
}
