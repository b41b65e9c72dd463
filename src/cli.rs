use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::EmitFormat;

#[derive(Parser)]
#[command(
    name = "git-stamp",
    version,
    about = "Build metadata from git, with placeholders when git can't answer"
)]
pub struct Cli {
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file (default: platform config dir, or $GIT_STAMP_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Repository to query (default: current directory)
    #[arg(long, global = true)]
    pub repo: Option<PathBuf>,

    /// Version-control executable to run
    #[arg(long = "git", value_name = "PROGRAM", global = true)]
    pub git: Option<String>,

    /// Kill a git query that runs longer than this
    #[arg(long, value_name = "MS", global = true)]
    pub timeout_ms: Option<u64>,

    /// More log output (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve and print every field
    Show,
    /// Print a single field's value
    Get {
        /// Field key (e.g. GIT_HASH) or alias (version, hash, date)
        key: String,
    },
    /// Write every field in a build-consumable format
    Emit {
        #[arg(long, value_enum, default_value = "env")]
        format: EmitFormat,
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the effective configuration
    Config {
        /// Print config path and exit
        #[arg(long)]
        show_path: bool,
    },
}
