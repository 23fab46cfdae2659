use std::path::Path;

use tracing::{debug, info, warn};

use crate::cache::{self, Artifact};
use crate::error::{ExportError, ExportResult};
use crate::expand::expand;
use crate::models::FilterSpecification;
use crate::normalize::normalize;
use crate::store::{self, EventStore};
use crate::xes::write_event_log;

#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub filters: FilterSpecification,
    pub use_cache: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Cached(Artifact),
    Generated(Artifact),
    NoEvents,
}

impl ExportOutcome {
    #[must_use]
    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            Self::Cached(artifact) | Self::Generated(artifact) => Some(artifact),
            Self::NoEvents => None,
        }
    }
}

/// Extract, normalize, expand and serialize one event log. A cache hit
/// returns before the store is touched.
pub fn run_export(
    store: &EventStore,
    output_dir: &Path,
    request: &ExportRequest,
) -> ExportResult<ExportOutcome> {
    let filters = &request.filters;
    if request.use_cache {
        if let Some(artifact) = cache::cached_artifact(output_dir, filters) {
            info!(artifact = %artifact.name, "serving cached event log");
            return Ok(ExportOutcome::Cached(artifact));
        }
        debug!(artifact = %cache::artifact_name(filters), "cache miss");
    }

    match generate(store, output_dir, filters) {
        Ok(artifact) => Ok(ExportOutcome::Generated(artifact)),
        Err(ExportError::NoEventsFound { resource_ids }) => {
            warn!(?resource_ids, "no events found for resource");
            Ok(ExportOutcome::NoEvents)
        }
        Err(error) => Err(error),
    }
}

fn generate(
    store: &EventStore,
    output_dir: &Path,
    filters: &FilterSpecification,
) -> ExportResult<Artifact> {
    let raw = store::extract_events(store, filters)?;
    if raw.is_empty() {
        return Err(ExportError::NoEventsFound {
            resource_ids: filters.resource_ids().to_vec(),
        });
    }

    let normalized = normalize(raw, filters)?;
    debug!(counts = ?normalized.counts, "normalized events");
    let log = expand(normalized.events)?;
    write_event_log(&log, output_dir, &cache::artifact_name(filters))
}
