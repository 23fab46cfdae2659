//! Periodic removal of stale artifacts from the output directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{ARTIFACT_EXTENSION, STAGING_PREFIX};

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub scanned: usize,
    pub removed: Vec<PathBuf>,
    pub failures: usize,
}

/// Deletes `*.xes` files and abandoned staging files in `dir` last modified
/// more than `max_age` ago. A missing directory is an empty sweep. Per-file failures are logged and
/// counted, never fatal.
pub fn sweep_directory(dir: &Path, max_age: Duration) -> SweepReport {
    sweep_directory_at(dir, max_age, SystemTime::now())
}

fn sweep_directory_at(dir: &Path, max_age: Duration, now: SystemTime) -> SweepReport {
    let mut report = SweepReport::default();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) if error.kind() == ErrorKind::NotFound => return report,
        Err(error) => {
            warn!(dir = %dir.display(), %error, "failed to list output directory");
            report.failures += 1;
            return report;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !is_sweepable(&path) {
            continue;
        }
        let modified = match entry.metadata().and_then(|meta| {
            if meta.is_file() {
                meta.modified().map(Some)
            } else {
                Ok(None)
            }
        }) {
            Ok(Some(modified)) => modified,
            Ok(None) => continue,
            Err(error) => {
                warn!(path = %path.display(), %error, "failed to stat artifact");
                report.failures += 1;
                continue;
            }
        };
        report.scanned += 1;

        let age = now.duration_since(modified).unwrap_or_default();
        if age <= max_age {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), age_secs = age.as_secs(), "removed stale artifact");
                report.removed.push(path);
            }
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => {
                warn!(path = %path.display(), %error, "failed to remove stale artifact");
                report.failures += 1;
            }
        }
    }

    report.removed.sort();
    report
}

fn is_sweepable(path: &Path) -> bool {
    let staged = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(STAGING_PREFIX));
    staged || path.extension().and_then(|ext| ext.to_str()) == Some(ARTIFACT_EXTENSION)
}

/// Runs [`sweep_directory`] every `interval` until the runtime shuts down.
pub fn spawn_sweeper(dir: PathBuf, interval: Duration, max_age: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let sweep_dir = dir.clone();
            let report =
                match tokio::task::spawn_blocking(move || sweep_directory(&sweep_dir, max_age)).await {
                    Ok(report) => report,
                    Err(error) => {
                        warn!(%error, "artifact sweep task failed");
                        continue;
                    }
                };
            if !report.removed.is_empty() || report.failures > 0 {
                info!(
                    removed = report.removed.len(),
                    scanned = report.scanned,
                    failures = report.failures,
                    "artifact sweep finished"
                );
            }
        }
    })
}
