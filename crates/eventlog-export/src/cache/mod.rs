use std::path::{Path, PathBuf};

use crate::models::FilterSpecification;

pub const ARTIFACT_EXTENSION: &str = "xes";
/// Name prefix of in-progress artifacts before they are renamed into place.
pub const STAGING_PREFIX: &str = ".staging-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub path: PathBuf,
}

impl Artifact {
    #[must_use]
    pub fn in_dir(output_dir: &Path, name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: output_dir.join(name),
        }
    }
}

/// Cache key for an export. Resource ids keep caller order, so permuting
/// them yields a different artifact.
#[must_use]
pub fn artifact_name(filters: &FilterSpecification) -> String {
    let mut name = filters.resource_ids().concat();
    if let Some(start_date) = filters.start_date() {
        name.push('-');
        name.push_str(start_date.as_str());
    }
    if let Some(end_date) = filters.end_date() {
        name.push('_');
        name.push_str(end_date.as_str());
    }
    if filters.include_bot_messages() {
        name.push_str("_bot_messages");
    }
    if filters.include_lifecycle_start() {
        name.push_str("_life_cycle_start");
    }
    format!("{name}.{ARTIFACT_EXTENSION}")
}

/// The existing artifact for `filters`, if any. No staleness check: the
/// periodic sweep is the only invalidation.
#[must_use]
pub fn cached_artifact(output_dir: &Path, filters: &FilterSpecification) -> Option<Artifact> {
    let artifact = Artifact::in_dir(output_dir, &artifact_name(filters));
    artifact.path.is_file().then_some(artifact)
}
