use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "marquee")]
#[command(author, version, about = "On-demand HLS and transcoding gateway for a movie library")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the streaming server
    Start {
        /// Host to bind to (overrides the config file)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Scan the movie directory and rebuild the path registry and catalog
    Scan {
        /// Show what would change without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Probe a video file and display its duration and resolution
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the HLS playlist a file would be served with
    Playlist {
        /// Video file
        #[arg(required = true)]
        file: PathBuf,

        /// Prefix for segment URIs
        #[arg(long, default_value = ".")]
        base: String,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
