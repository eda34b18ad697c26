//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// Geoblocker - country-based access control demo service
#[derive(Parser, Debug)]
#[command(name = "geoblocker")]
#[command(version)]
#[command(about = "Resolves the caller's country and enforces a country block list", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML); GEOBLOCK__* environment variables override it
    #[arg(long, short = 'c', global = true, default_value = "config.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Generate example configuration file
    GenerateConfig {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
