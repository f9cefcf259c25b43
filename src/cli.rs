use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "anistream")]
#[command(author, version, about = "Episode source resolver and streaming proxy")]
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
    /// Start the HTTP server
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Decode a catalog source token and print the result
    Decode {
        /// Obfuscated token, usually starting with "--"
        #[arg(required = true, allow_hyphen_values = true)]
        token: String,

        /// Decode as a thumbnail, routed through the image proxy
        #[arg(long)]
        thumbnail: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default lookup if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
