use anyhow::Result;
use clap::Args;

use crate::config::ServiceConfig;
use crate::sweep::sweep_directory;

#[derive(Debug, Clone, Args)]
pub struct SweepArgs {
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

pub fn run(args: &SweepArgs, config: &ServiceConfig) -> Result<()> {
    let output_dir = &config.paths.output_dir;
    let report = sweep_directory(output_dir, config.cleanup_max_age);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "sweep: output_dir={} max_age_secs={} scanned={} removed={} failures={}",
            output_dir.display(),
            config.cleanup_max_age.as_secs(),
            report.scanned,
            report.removed.len(),
            report.failures
        );
    }
    Ok(())
}
