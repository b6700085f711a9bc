//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "deflect-geoip")]
#[command(author, version, about = "Country IP prefix database builder from RIR statistics")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path (YAML, optional)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Quiet mode (for cron/CI)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug output)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch all RIR statistics and write a new release
    Build {
        /// Output directory (default: config output_dir, then "dist")
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Release version label (default: today's UTC date, YYYY-MM-DD)
        #[arg(long, value_name = "LABEL")]
        version_label: Option<String>,
    },

    /// List the configured statistics sources
    Sources,

    /// Check the latest release against its manifest and checksum file
    Verify {
        /// Output directory holding releases/ (default: config output_dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show version
    Version,
}
