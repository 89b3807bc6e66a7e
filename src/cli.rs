use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Mirrors a remote versioned source tree into a local working folder")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run one reconciliation pass against the remote source
    Pull(SyncArgs),

    /// Show pending changes without applying them
    Status(SyncArgs),

    /// Pull repeatedly on a fixed interval
    Watch(WatchArgs),
}

#[derive(Parser)]
pub struct SyncArgs {
    /// Path to the config file (defaults to the platform config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Base URL of the remote source server
    #[arg(long)]
    pub remote: Option<String>,

    /// Bearer token for the remote source
    #[arg(long)]
    pub token: Option<String>,

    /// Remote folder to mirror
    #[arg(long)]
    pub root: Option<String>,

    /// Local working folder (defaults to the current directory)
    #[arg(long)]
    pub dest: Option<PathBuf>,

    /// Number of concurrent downloads
    #[arg(long)]
    pub parallel: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Output as JSON instead of a table
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Show detailed progress and diagnostics
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,
}

#[derive(Parser)]
pub struct WatchArgs {
    #[command(flatten)]
    pub sync: SyncArgs,

    /// Time between pulls ("30s", "5m", "1h")
    #[arg(long, default_value = "60s")]
    pub interval: String,
}
