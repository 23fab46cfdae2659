use serde::Serialize;
use tracing::debug;

use crate::error::{ExportError, ExportResult};
use crate::models::{
    CanonicalEvent, EventCategory, EventMetadata, FilterSpecification, LIFECYCLE_COMPLETE,
    RawEventRecord, RawEventTable, RawTimestamp,
};
use crate::utils::time::{epoch_to_datetime, parse_event_timestamp};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeCounts {
    pub input_records: usize,
    pub missing_identity: usize,
    pub bot_messages_removed: usize,
    pub lifecycle_start_removed: usize,
    pub outside_window: usize,
    pub records_emitted: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvents {
    pub events: Vec<CanonicalEvent>,
    pub counts: NormalizeCounts,
}

/// Projects raw rows onto the canonical schema, applies the closed date
/// window and re-applies the inclusion filters after recoding. Every
/// timestamp must parse; a single bad value fails the extraction.
pub fn normalize(
    table: RawEventTable,
    filters: &FilterSpecification,
) -> ExportResult<NormalizedEvents> {
    let mut counts = NormalizeCounts {
        input_records: table.len(),
        ..NormalizeCounts::default()
    };

    let mut events = Vec::with_capacity(table.len());
    for record in table {
        let Some(event) = canonicalize(record)? else {
            counts.missing_identity += 1;
            continue;
        };

        if !filters.contains_instant(event.timestamp) {
            counts.outside_window += 1;
            continue;
        }

        if !filters.include_bot_messages() && !event.event_type.is_conversation_event() {
            counts.bot_messages_removed += 1;
            continue;
        }
        if !filters.include_lifecycle_start()
            && event.lifecycle_transition.as_deref() != Some(LIFECYCLE_COMPLETE)
        {
            counts.lifecycle_start_removed += 1;
            continue;
        }
        events.push(event);
    }

    counts.records_emitted = events.len();
    debug!(?counts, "normalized raw events");

    if events.is_empty() {
        return Err(ExportError::NoEventsFound {
            resource_ids: filters.resource_ids().to_vec(),
        });
    }
    Ok(NormalizedEvents { events, counts })
}

/// `None` when the row lacks a case id or a timestamp.
fn canonicalize(record: RawEventRecord) -> ExportResult<Option<CanonicalEvent>> {
    let Some(case_id) = record
        .case_id
        .map(|case_id| case_id.trim().to_string())
        .filter(|case_id| !case_id.is_empty())
    else {
        return Ok(None);
    };

    let parsed = match &record.timestamp {
        RawTimestamp::Missing => return Ok(None),
        RawTimestamp::Text(raw) => parse_event_timestamp(raw),
        RawTimestamp::Epoch(epoch) => epoch_to_datetime(*epoch),
    };
    let timestamp = parsed.map_err(|error| {
        ExportError::data_integrity(format!(
            "invalid timestamp for case `{case_id}` (resource `{}`): {error:#}",
            record.resource.as_deref().unwrap_or("<none>")
        ))
    })?;

    let event_type = EventCategory::recode(record.event_type.as_deref().unwrap_or_default());

    Ok(Some(CanonicalEvent {
        case_id,
        activity_name: record.activity_name,
        timestamp,
        lifecycle_transition: record.lifecycle_phase,
        event_type,
        resource: record.resource,
        resource_type: record.resource_type,
        remarks: record.remarks,
        metadata: EventMetadata::default(),
    }))
}
