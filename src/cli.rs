// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines the global flags and one subcommand per pipeline.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tinyci")]
#[command(about = "Test, build, publish and redeploy containers from a git repository")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file (default: discovered in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new tinyci.yml configuration file
    Init {
        /// Registry namespace for published images
        #[arg(long)]
        namespace: Option<String>,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Sync a repository, run its tests, then build and push its image
    Ci {
        /// Repository URL to clone or pull
        url: String,

        /// Repository name (working copy directory and image name)
        name: String,
    },

    /// Replace the running container with an image
    Deploy {
        /// Image reference, e.g. `namespace/app:abc1234`
        image: String,
    },

    /// Stop every container tinyci started
    Shutdown,

    /// Show the resolved configuration
    Status,
}
