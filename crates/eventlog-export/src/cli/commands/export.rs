use anyhow::{Context, Result, bail};
use clap::{ArgGroup, Args};

use crate::config::ServiceConfig;
use crate::export::{ExportOutcome, ExportRequest, run_export};
use crate::models::FilterSpecification;
use crate::resolve::{RegistryClient, resolve_from_store};
use crate::store::EventStore;

#[derive(Debug, Clone, Args)]
#[command(group(ArgGroup::new("target").required(true).args(["resource", "bot"])))]
pub struct ExportArgs {
    /// Resource id to export; repeat for several.
    #[arg(long, value_name = "ID", num_args = 1..)]
    pub resource: Vec<String>,

    /// Export every resource registered under this bot name.
    #[arg(long, value_name = "NAME")]
    pub bot: Option<String>,

    /// Resolve `--bot` through the registry instead of the event store.
    #[arg(long, value_name = "URL", requires = "bot")]
    pub bot_manager_url: Option<String>,

    #[arg(long, value_name = "DATE")]
    pub start_date: Option<String>,

    #[arg(long, value_name = "DATE")]
    pub end_date: Option<String>,

    #[arg(long, default_value_t = false)]
    pub include_bot_messages: bool,

    #[arg(long, default_value_t = false)]
    pub include_life_cycle_start: bool,

    #[arg(long, default_value_t = false)]
    pub use_cache: bool,
}

/// Raised when the filters match nothing; `main` maps it to its own exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoEventsExported {
    pub resource_ids: Vec<String>,
}

impl std::fmt::Display for NoEventsExported {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "no events found for resource ids [{}]",
            self.resource_ids.join(", ")
        )
    }
}

impl std::error::Error for NoEventsExported {}

pub fn run(args: &ExportArgs, config: &ServiceConfig) -> Result<()> {
    config.validate()?;
    let store = EventStore::open(config.paths.require_db_path()?, config.pool_size)?;
    let resource_ids = target_resource_ids(args, &store, config)?;

    let filters = FilterSpecification::new(&resource_ids)?
        .with_date_range(args.start_date.as_deref(), args.end_date.as_deref())?
        .with_bot_messages(args.include_bot_messages)
        .with_lifecycle_start(args.include_life_cycle_start);
    let request = ExportRequest {
        filters,
        use_cache: args.use_cache,
    };

    println!(
        "export: start resources={} output_dir={}",
        request.filters.resource_ids().join(","),
        config.paths.output_dir.display()
    );
    match run_export(&store, &config.paths.output_dir, &request)? {
        ExportOutcome::Cached(artifact) => {
            println!("export: cache hit");
            println!("{}", artifact.path.display());
        }
        ExportOutcome::Generated(artifact) => {
            println!("export: generated");
            println!("{}", artifact.path.display());
        }
        ExportOutcome::NoEvents => {
            return Err(NoEventsExported {
                resource_ids: request.filters.resource_ids().to_vec(),
            }
            .into());
        }
    }
    Ok(())
}

fn target_resource_ids(
    args: &ExportArgs,
    store: &EventStore,
    config: &ServiceConfig,
) -> Result<Vec<String>> {
    let Some(bot_name) = args.bot.as_deref() else {
        return Ok(args.resource.clone());
    };

    let resource_ids = match args.bot_manager_url.as_deref() {
        Some(endpoint) => {
            let registry = RegistryClient::new(config.registry_timeout)?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("failed to start async runtime")?;
            runtime.block_on(registry.resolve(Some(endpoint), bot_name))?
        }
        None => resolve_from_store(store, bot_name)?,
    };
    if resource_ids.is_empty() {
        bail!("no resource ids found for bot `{bot_name}`");
    }
    Ok(resource_ids)
}
