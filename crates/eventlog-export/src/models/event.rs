use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use time::OffsetDateTime;

pub const USER_MESSAGE_CODE: &str = "SERVICE_CUSTOM_MESSAGE_1";
pub const BOT_MESSAGE_CODE: &str = "SERVICE_CUSTOM_MESSAGE_2";
pub const SERVICE_REQUEST_CODE: &str = "SERVICE_CUSTOM_MESSAGE_3";

pub const LIFECYCLE_START: &str = "start";
pub const LIFECYCLE_COMPLETE: &str = "complete";

/// Semantic category of a stored event-type code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventCategory {
    UserMessage,
    BotMessage,
    ServiceRequest,
    Other(String),
}

impl EventCategory {
    /// Maps internal custom-message codes to their semantic category. Semantic
    /// names map to themselves, so recoding an already recoded value is a no-op.
    #[must_use]
    pub fn recode(code: &str) -> Self {
        match code {
            USER_MESSAGE_CODE | "USER_MESSAGE" => Self::UserMessage,
            BOT_MESSAGE_CODE | "BOT_MESSAGE" => Self::BotMessage,
            SERVICE_REQUEST_CODE | "SERVICE_REQUEST" => Self::ServiceRequest,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::UserMessage => "USER_MESSAGE",
            Self::BotMessage => "BOT_MESSAGE",
            Self::ServiceRequest => "SERVICE_REQUEST",
            Self::Other(code) => code,
        }
    }

    /// Categories kept when bot messages are excluded.
    #[must_use]
    pub fn is_conversation_event(&self) -> bool {
        matches!(self, Self::UserMessage | Self::ServiceRequest)
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawTimestamp {
    Missing,
    Text(String),
    Epoch(i64),
}

/// One `EVENTLOG` row as read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEventRecord {
    pub event_type: Option<String>,
    pub case_id: Option<String>,
    pub activity_name: Option<String>,
    pub timestamp: RawTimestamp,
    pub lifecycle_phase: Option<String>,
    pub resource: Option<String>,
    pub resource_type: Option<String>,
    pub remarks: Option<String>,
}

pub type RawEventTable = Vec<RawEventRecord>;

/// Values lifted out of the remarks payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventMetadata {
    pub service_endpoint: Option<String>,
    pub user: Option<String>,
    pub in_service_context: Option<bool>,
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalEvent {
    pub case_id: String,
    pub activity_name: Option<String>,
    pub timestamp: OffsetDateTime,
    pub lifecycle_transition: Option<String>,
    pub event_type: EventCategory,
    pub resource: Option<String>,
    pub resource_type: Option<String>,
    pub remarks: Option<String>,
    pub metadata: EventMetadata,
}

/// A non-empty set of canonical events making up one export.
#[derive(Debug, Clone, PartialEq)]
pub struct EventLog {
    events: Vec<CanonicalEvent>,
}

impl EventLog {
    /// Returns `None` for an empty event list; an export never produces an empty log.
    #[must_use]
    pub fn from_events(events: Vec<CanonicalEvent>) -> Option<Self> {
        if events.is_empty() {
            None
        } else {
            Some(Self { events })
        }
    }

    #[must_use]
    pub fn events(&self) -> &[CanonicalEvent] {
        &self.events
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events grouped by case id, each case sorted by timestamp (stable).
    #[must_use]
    pub fn traces(&self) -> BTreeMap<&str, Vec<&CanonicalEvent>> {
        let mut traces: BTreeMap<&str, Vec<&CanonicalEvent>> = BTreeMap::new();
        for event in &self.events {
            traces.entry(event.case_id.as_str()).or_default().push(event);
        }
        for events in traces.values_mut() {
            events.sort_by_key(|event| event.timestamp);
        }
        traces
    }
}
