//! CLI argument definitions for pinlock.
//!
//! Uses `clap` derive macros. Each command corresponds to a handler in the
//! [`super::commands`] module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "pinlock",
    version,
    about = "Deterministic dependency resolver and lock file generator",
    long_about = "pinlock resolves a requirements.in style manifest against a package index \
                  into one consistent set of exact versions, and writes a reproducible lock \
                  file annotated with why each package is present."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve the input manifest and write the lock file
    Compile {
        #[command(flatten)]
        resolve: ResolveArgs,
        /// Output file, or `-` for stdout [default: <input>.txt]
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Resolve and print the lock file without writing anything
        #[arg(long)]
        dry_run: bool,
        /// Lock file whose pins constrain the result (repeatable)
        #[arg(short = 'c', long = "constraint", value_name = "LOCK")]
        constraints: Vec<PathBuf>,
    },

    /// Print the resolved dependency tree
    Tree {
        #[command(flatten)]
        resolve: ResolveArgs,
        /// Maximum depth
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Explain why a package is in the resolved set
    Why {
        /// Package to explain
        package: String,
        #[command(flatten)]
        resolve: ResolveArgs,
    },
}

/// Inputs and tunables shared by every resolving command.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Input manifest
    #[arg(default_value = "requirements.in")]
    pub input: PathBuf,
    /// Package index file (TOML or JSON)
    #[arg(long, env = "PINLOCK_INDEX", default_value = "index.toml")]
    pub index: PathBuf,
    /// Backtracking steps allowed before giving up
    #[arg(long)]
    pub max_backtracks: Option<usize>,
    /// Per-query index timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
    /// Concurrent index queries
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

pub fn parse() -> Cli {
    Cli::parse()
}
