use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "imageforged")]
#[command(author, version, about = "Bulk image conversion service")]
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
    /// Start the conversion server
    Start {
        /// Host to bind to (overrides the config file)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Convert local image files without starting the server
    Convert {
        /// Images to convert
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Target format (JPEG, PNG, WEBP, AVIF); defaults to the configured format
        #[arg(short, long)]
        format: Option<String>,

        /// Directory to write converted files into
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
