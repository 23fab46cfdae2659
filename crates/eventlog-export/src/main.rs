#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use clap::error::ErrorKind;
use eventlog_export::ExportError;
use eventlog_export::cli::app::{Cli, Command, RuntimeArgs};
use eventlog_export::cli::commands;
use eventlog_export::config::{ServiceConfig, resolve_runtime_paths};
use tracing_subscriber::EnvFilter;

const EXIT_SUCCESS: i32 = 0;
const EXIT_RUNTIME_FAILURE: i32 = 1;
const EXIT_NO_EVENTS: i32 = 2;
const EXIT_USAGE_ERROR: i32 = 64;

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => return exit_code_for_parse_error(error),
    };
    init_tracing();
    let command_name = command_name(&cli.command);
    eprintln!("eventlog-export: starting `{command_name}`");

    match execute(cli) {
        Ok(()) => {
            eprintln!("eventlog-export: completed `{command_name}` (exit_code={EXIT_SUCCESS})");
            EXIT_SUCCESS
        }
        Err(error) => {
            let exit_code = classify_runtime_error(&error);
            eprintln!("eventlog-export: failed `{command_name}` (exit_code={exit_code})");
            eprintln!("{error:#}");
            exit_code
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn execute(cli: Cli) -> Result<()> {
    let config = resolve_service_config(&cli.runtime)?;
    match cli.command {
        Command::Serve(args) => commands::serve::run(&args, &config),
        Command::Export(args) => commands::export::run(&args, &config),
        Command::Sweep(args) => commands::sweep::run(&args, &config),
    }
}

fn classify_runtime_error(error: &anyhow::Error) -> i32 {
    if error
        .downcast_ref::<commands::export::NoEventsExported>()
        .is_some()
    {
        EXIT_NO_EVENTS
    } else if matches!(
        error.downcast_ref::<ExportError>(),
        Some(ExportError::InvalidFilter(_))
    ) {
        EXIT_USAGE_ERROR
    } else {
        EXIT_RUNTIME_FAILURE
    }
}

fn exit_code_for_parse_error(error: clap::Error) -> i32 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = error.print();
            EXIT_SUCCESS
        }
        _ => {
            let _ = error.print();
            EXIT_USAGE_ERROR
        }
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Serve(_) => "serve",
        Command::Export(_) => "export",
        Command::Sweep(_) => "sweep",
    }
}

fn resolve_service_config(args: &RuntimeArgs) -> Result<ServiceConfig> {
    let home_dir = std::env::var_os("HOME").map(PathBuf::from);
    let cwd = match &args.cwd {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };

    let paths = resolve_runtime_paths(
        home_dir.as_deref(),
        &cwd,
        args.db_path.as_deref(),
        args.output_dir.as_deref(),
    )?;
    let mut config = ServiceConfig::with_defaults(paths);
    config.pool_size = args.pool_size;
    config.cleanup_max_age = Duration::from_secs(args.cleanup_max_age_secs);
    config.registry_timeout = Duration::from_secs(args.registry_timeout_secs);
    Ok(config)
}
