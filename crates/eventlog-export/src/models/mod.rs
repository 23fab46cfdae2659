pub mod event;
pub mod filter;

pub use event::{
    BOT_MESSAGE_CODE, CanonicalEvent, EventCategory, EventLog, EventMetadata, LIFECYCLE_COMPLETE,
    LIFECYCLE_START, RawEventRecord, RawEventTable, RawTimestamp, SERVICE_REQUEST_CODE,
    USER_MESSAGE_CODE,
};
pub use filter::{FilterDate, FilterSpecification, dedupe_preserving_order};
