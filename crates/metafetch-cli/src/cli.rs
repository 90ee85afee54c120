//! # CLI Structure and Argument Parsing
//!
//! ```bash
//! # Canonical records, one JSON object per line
//! metafetch resolve BV17x411w7KC https://b23.tv/abc pixiv:12345-2
//!
//! # Fetch and parse metadata (short links report their target)
//! metafetch fetch sm9 --no-cache
//!
//! # Installed platforms and their route prefixes
//! metafetch platforms
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI structure for the `metafetch` command
#[derive(Parser, Clone, Debug)]
#[command(name = "metafetch")]
#[command(version)]
#[command(about = "metafetch - Resolve content identifiers and fetch their metadata", long_about = None)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH", env = "METAFETCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Bypass the metadata cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Cache directory override
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Log at debug level
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

/// Available subcommands
#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Print the canonical record each input resolves to
    Resolve {
        /// Identifiers or URLs
        #[arg(required = true, value_name = "INPUT")]
        inputs: Vec<String>,
    },

    /// Fetch and print merged metadata for each input
    Fetch {
        /// Identifiers or URLs
        #[arg(required = true, value_name = "INPUT")]
        inputs: Vec<String>,
    },

    /// List installed platforms
    Platforms,
}
