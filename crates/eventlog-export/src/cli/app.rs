use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use super::commands::{export::ExportArgs, serve::ServeArgs, sweep::SweepArgs};

#[derive(Debug, Parser)]
#[command(
    name = "eventlog-export",
    version,
    about = "Export conversational event logs as XES"
)]
pub struct Cli {
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct RuntimeArgs {
    #[arg(long, global = true, env = "EVENTLOG_DB_PATH", value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    #[arg(long, global = true, env = "EVENTLOG_DB_POOL_SIZE", default_value_t = 4)]
    pub pool_size: usize,

    #[arg(long, global = true, env = "EVENTLOG_OUTPUT_DIR", value_name = "PATH")]
    pub output_dir: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH")]
    pub cwd: Option<PathBuf>,

    #[arg(long, global = true, env = "CLEANUP_MAX_AGE", default_value_t = 3600)]
    pub cleanup_max_age_secs: u64,

    #[arg(long, global = true, env = "REGISTRY_TIMEOUT_SECS", default_value_t = 30)]
    pub registry_timeout_secs: u64,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the export routes and sweep stale artifacts.
    Serve(ServeArgs),
    /// Export one event log and print the artifact path.
    Export(ExportArgs),
    /// Delete stale artifacts once.
    Sweep(SweepArgs),
}
