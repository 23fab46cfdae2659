//! Remarks payload expansion.
//!
//! Known remarks keys land in typed slots on [`EventMetadata`]; everything
//! else goes to the `extra` map. Keys that name a canonical attribute are
//! kept under a `remarks:` prefix so they cannot shadow the canonical value;
//! a payload that also carries the prefixed key literally is rejected.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ExportError, ExportResult};
use crate::models::{CanonicalEvent, EventLog, EventMetadata};

pub const SERVICE_ENDPOINT_KEY: &str = "serviceEndpoint";
pub const USER_KEY: &str = "user";
pub const IN_SERVICE_CONTEXT_KEY: &str = "in-service-context";
pub const NAMESPACE_PREFIX: &str = "remarks:";

/// Attribute names owned by the canonical projection.
pub const RESERVED_KEYS: &[&str] = &[
    "case:concept:name",
    "concept:name",
    "time:timestamp",
    "lifecycle:transition",
    "org:resource",
    "EVENT_TYPE",
    "RESOURCE_TYPE",
    "REMARKS",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ColumnPresence {
    service_endpoint: bool,
    user: bool,
    in_service_context: bool,
}

/// Merges every remarks payload into its event and fills defaults column-wise.
pub fn expand(events: Vec<CanonicalEvent>) -> ExportResult<EventLog> {
    let mut expanded = Vec::with_capacity(events.len());
    for mut event in events {
        event.metadata = parse_remarks(&event)?;
        expanded.push(event);
    }

    fill_defaults(&mut expanded);
    EventLog::from_events(expanded)
        .ok_or_else(|| ExportError::data_integrity("expansion produced an empty event log"))
}

fn parse_remarks(event: &CanonicalEvent) -> ExportResult<EventMetadata> {
    let Some(raw) = event
        .remarks
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
    else {
        return Ok(EventMetadata::default());
    };

    let fields = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(fields)) => fields,
        Ok(other) => {
            return Err(remarks_error(
                event,
                &format!("expected a JSON object, found {}", json_kind(&other)),
            ));
        }
        Err(error) => return Err(remarks_error(event, &error.to_string())),
    };

    metadata_from_fields(fields).map_err(|detail| remarks_error(event, &detail))
}

fn metadata_from_fields(fields: Map<String, Value>) -> Result<EventMetadata, String> {
    let mut metadata = EventMetadata::default();
    for (key, value) in fields {
        match key.as_str() {
            SERVICE_ENDPOINT_KEY => metadata.service_endpoint = optional_string(&key, value)?,
            USER_KEY => metadata.user = optional_string(&key, value)?,
            IN_SERVICE_CONTEXT_KEY => metadata.in_service_context = optional_bool(&key, value)?,
            reserved if RESERVED_KEYS.contains(&reserved) => {
                debug!(key = reserved, "namespacing remarks key that collides with canonical attribute");
                insert_extra(&mut metadata, format!("{NAMESPACE_PREFIX}{reserved}"), value)?;
            }
            _ => insert_extra(&mut metadata, key, value)?,
        }
    }
    Ok(metadata)
}

fn insert_extra(metadata: &mut EventMetadata, key: String, value: Value) -> Result<(), String> {
    if metadata.extra.contains_key(&key) {
        return Err(format!(
            "key `{key}` appears both literally and as a namespaced canonical attribute"
        ));
    }
    metadata.extra.insert(key, value);
    Ok(())
}

fn optional_string(key: &str, value: Value) -> Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text)),
        Value::Number(number) => Ok(Some(number.to_string())),
        Value::Bool(flag) => Ok(Some(flag.to_string())),
        other => Err(format!(
            "`{key}` must be a scalar, found {}",
            json_kind(&other)
        )),
    }
}

fn optional_bool(key: &str, value: Value) -> Result<Option<bool>, String> {
    match &value {
        Value::Null => Ok(None),
        Value::Bool(flag) => Ok(Some(*flag)),
        Value::Number(number) if number.as_i64() == Some(0) => Ok(Some(false)),
        Value::Number(number) if number.as_i64() == Some(1) => Ok(Some(true)),
        Value::String(text) if text.eq_ignore_ascii_case("true") => Ok(Some(true)),
        Value::String(text) if text.eq_ignore_ascii_case("false") => Ok(Some(false)),
        other => Err(format!("`{key}` must be a boolean, found {other}")),
    }
}

/// A known optional column carried by any event is filled on every event;
/// a column no event carries stays absent. `lifecycle_transition` is always
/// a column.
fn fill_defaults(events: &mut [CanonicalEvent]) {
    let presence = events
        .iter()
        .fold(ColumnPresence::default(), |presence, event| ColumnPresence {
            service_endpoint: presence.service_endpoint
                || event.metadata.service_endpoint.is_some(),
            user: presence.user || event.metadata.user.is_some(),
            in_service_context: presence.in_service_context
                || event.metadata.in_service_context.is_some(),
        });

    for event in events.iter_mut() {
        event.lifecycle_transition.get_or_insert_with(String::new);
        if presence.service_endpoint {
            event.metadata.service_endpoint.get_or_insert_with(String::new);
        }
        if presence.user {
            event.metadata.user.get_or_insert_with(String::new);
        }
        if presence.in_service_context {
            event.metadata.in_service_context.get_or_insert(false);
        }
    }
}

fn remarks_error(event: &CanonicalEvent, detail: &str) -> ExportError {
    ExportError::data_integrity(format!(
        "malformed remarks payload for case `{}` (resource `{}`): {detail}",
        event.case_id,
        event.resource.as_deref().unwrap_or("<none>")
    ))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
