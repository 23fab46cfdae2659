use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, bail};

use crate::resolve::DEFAULT_REGISTRY_TIMEOUT;
use crate::store::DEFAULT_POOL_SIZE;
use crate::sweep::{DEFAULT_MAX_AGE, DEFAULT_SWEEP_INTERVAL};

pub const DEFAULT_OUTPUT_DIR: &str = "event_logs";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8087;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    pub cwd: PathBuf,
    pub db_path: Option<PathBuf>,
    pub output_dir: PathBuf,
}

impl RuntimePaths {
    pub fn require_db_path(&self) -> Result<&Path> {
        match &self.db_path {
            Some(path) => Ok(path),
            None => bail!("event store path is not set; pass --db-path or set EVENTLOG_DB_PATH"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub paths: RuntimePaths,
    pub pool_size: usize,
    pub cleanup_interval: Duration,
    pub cleanup_max_age: Duration,
    pub registry_timeout: Duration,
}

impl ServiceConfig {
    #[must_use]
    pub fn with_defaults(paths: RuntimePaths) -> Self {
        Self {
            paths,
            pool_size: DEFAULT_POOL_SIZE,
            cleanup_interval: DEFAULT_SWEEP_INTERVAL,
            cleanup_max_age: DEFAULT_MAX_AGE,
            registry_timeout: DEFAULT_REGISTRY_TIMEOUT,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            bail!("pool size must be at least 1");
        }
        if self.cleanup_interval.is_zero() {
            bail!("cleanup interval must be greater than zero");
        }
        if self.registry_timeout.is_zero() {
            bail!("registry timeout must be greater than zero");
        }
        Ok(())
    }
}

/// Resolves user-supplied paths: `~` expands against `home_dir`, relative
/// paths join `cwd`, and the result is lexically normalized.
pub fn resolve_runtime_paths(
    home_dir: Option<&Path>,
    cwd: &Path,
    db_path: Option<&Path>,
    output_dir_override: Option<&Path>,
) -> Result<RuntimePaths> {
    if !cwd.is_absolute() {
        bail!("cwd must be absolute: {}", cwd.display());
    }
    if let Some(home_dir) = home_dir.filter(|home_dir| !home_dir.is_absolute()) {
        bail!("home_dir must be absolute: {}", home_dir.display());
    }

    let cwd = normalize_lexical(cwd);
    let db_path = db_path
        .map(|path| resolve_user_path(path, home_dir, &cwd))
        .transpose()?;
    let output_dir = resolve_user_path(
        output_dir_override.unwrap_or_else(|| Path::new(DEFAULT_OUTPUT_DIR)),
        home_dir,
        &cwd,
    )?;

    Ok(RuntimePaths {
        cwd,
        db_path,
        output_dir,
    })
}

fn resolve_user_path(path: &Path, home_dir: Option<&Path>, cwd: &Path) -> Result<PathBuf> {
    let expanded = expand_tilde(path, home_dir)?;
    let resolved = if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    };

    Ok(normalize_lexical(&resolved))
}

fn expand_tilde(path: &Path, home_dir: Option<&Path>) -> Result<PathBuf> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let Some(home_dir) = home_dir else {
                bail!("HOME is not set; cannot expand {}", path.display());
            };
            let mut expanded = home_dir.to_path_buf();
            for component in components {
                expanded.push(component.as_os_str());
            }
            Ok(expanded)
        }
        Some(Component::Normal(first))
            if first
                .to_str()
                .is_some_and(|segment| segment.starts_with('~')) =>
        {
            bail!(
                "unsupported home expansion syntax (only `~` and `~/...` are supported): {}",
                path.display()
            )
        }
        _ => Ok(path.to_path_buf()),
    }
}

fn normalize_lexical(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component.as_os_str());
                }
            }
            _ => normalized.push(component.as_os_str()),
        }
    }

    normalized
}
