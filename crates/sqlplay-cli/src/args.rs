use crate::types::{LogLevel, OutputFormat};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sqlplay")]
#[command(about = "Run disposable SQL playgrounds against an embedded engine", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Data directory (defaults to $SQLPLAY_PATH, then the platform data dir)
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    #[arg(long, default_value = "plain", global = true)]
    pub format: OutputFormat,

    #[arg(long, default_value = "warn", global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List presets available for a dialect
    Presets { dialect: String },

    /// Show the files of a dialect's core or one of its presets
    Files {
        dialect: String,

        #[arg(long)]
        preset: Option<String>,

        /// Write the files as `*.play` into this directory instead of printing them
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Provision a fresh engine and run a playground, streaming its output
    Run {
        /// Defaults to `default_dialect` from config.toml
        dialect: Option<String>,

        #[arg(long)]
        preset: Option<String>,

        /// Directory of `*.play` files that replace the preset's files
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Run a saved playground instead
        #[arg(long, conflicts_with_all = ["dialect", "preset"])]
        saved: Option<String>,

        /// Seed for the toolkit's random values
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Save a playground to the local store
    Save {
        name: String,

        dialect: String,

        #[arg(long)]
        preset: Option<String>,

        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// List saved playgrounds, most recently updated first
    List,

    /// Remove a saved playground
    Delete { id: String },

    /// Bring the local store up to the current image version
    Migrate,
}
