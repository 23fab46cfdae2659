use rusqlite::{Connection, Result};

pub const EVENTS_TABLE: &str = "EVENTLOG";
pub const MESSAGES_TABLE: &str = "MESSAGE";

/// Creates the event store tables if missing. The service itself only reads;
/// this exists for provisioning local stores and fixtures.
pub fn ensure_event_store_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS EVENTLOG (
            ID INTEGER PRIMARY KEY AUTOINCREMENT,
            EVENT_TYPE TEXT,
            CASE_ID TEXT,
            ACTIVITY_NAME TEXT,
            TIME_STAMP TEXT,
            LIFECYCLE_PHASE TEXT,
            RESOURCE TEXT,
            RESOURCE_TYPE TEXT,
            REMARKS TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_eventlog_resource_time ON EVENTLOG(RESOURCE, TIME_STAMP);
        CREATE INDEX IF NOT EXISTS idx_eventlog_case ON EVENTLOG(CASE_ID);

        CREATE TABLE IF NOT EXISTS MESSAGE (
            ID INTEGER PRIMARY KEY AUTOINCREMENT,
            EVENT TEXT,
            TIME_STAMP TEXT,
            REMARKS TEXT
        );
        ",
    )?;

    Ok(())
}
