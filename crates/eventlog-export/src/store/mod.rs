//! Read access to the relational event store.
//!
//! The store is a SQLite database holding the `EVENTLOG` and `MESSAGE`
//! tables. [`EventStore`] owns a fixed pool of read-only connections opened
//! once at startup and is passed explicitly to every pipeline call.

pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OpenFlags, params_from_iter};
use tracing::debug;

use crate::error::{ExportError, ExportResult};
use crate::models::{
    BOT_MESSAGE_CODE, FilterSpecification, LIFECYCLE_START, RawEventRecord, RawEventTable,
    RawTimestamp,
};

pub use schema::{EVENTS_TABLE, MESSAGES_TABLE, ensure_event_store_schema};

pub const DEFAULT_POOL_SIZE: usize = 4;

const EXTRACT_COLUMNS: &str =
    "EVENT_TYPE, CASE_ID, ACTIVITY_NAME, TIME_STAMP, LIFECYCLE_PHASE, RESOURCE, RESOURCE_TYPE, REMARKS";

pub struct EventStore {
    connections: Vec<Mutex<Connection>>,
    next: AtomicUsize,
    db_path: PathBuf,
}

impl EventStore {
    /// Opens `pool_size` read-only connections and checks that the store answers.
    pub fn open(db_path: &Path, pool_size: usize) -> ExportResult<Self> {
        if !db_path.is_file() {
            return Err(ExportError::configuration(format!(
                "event store database not found: {}",
                db_path.display()
            )));
        }

        let pool_size = pool_size.max(1);
        let mut connections = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let conn = Connection::open_with_flags(
                db_path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(|error| {
                ExportError::configuration(format!(
                    "failed to open event store {}: {error}",
                    db_path.display()
                ))
            })?;
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(|error| {
                    ExportError::configuration(format!(
                        "event store {} is not readable: {error}",
                        db_path.display()
                    ))
                })?;
            connections.push(Mutex::new(conn));
        }

        debug!(db_path = %db_path.display(), pool_size, "event store opened");
        Ok(Self {
            connections,
            next: AtomicUsize::new(0),
            db_path: db_path.to_path_buf(),
        })
    }

    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.connections.len()
    }

    /// Runs `f` on a pooled connection, preferring an idle one and otherwise
    /// waiting on the next connection in rotation.
    pub fn with_connection<T, F>(&self, f: F) -> ExportResult<T>
    where
        F: FnOnce(&Connection) -> ExportResult<T>,
    {
        for conn in &self.connections {
            if let Ok(guard) = conn.try_lock() {
                return f(&guard);
            }
        }

        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        let guard = self.connections[index].lock().map_err(|_| {
            ExportError::configuration("event store connection is unavailable (poisoned)")
        })?;
        f(&guard)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Builds the extraction statement. Every value is bound; only placeholders
/// are generated into the SQL text. Stored timestamps mix epochs and text
/// forms, so the date window is applied by `normalize` on parsed instants.
#[must_use]
pub fn build_extract_query(filters: &FilterSpecification) -> ExtractQuery {
    let mut params: Vec<SqlValue> = Vec::new();
    let mut bind = |value: SqlValue| {
        params.push(value);
        format!("?{}", params.len())
    };

    let placeholders = filters
        .resource_ids()
        .iter()
        .map(|resource_id| bind(SqlValue::Text(resource_id.clone())))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = format!(
        "SELECT {EXTRACT_COLUMNS} FROM {EVENTS_TABLE} WHERE CASE_ID IS NOT NULL AND RESOURCE IN ({placeholders})"
    );

    if !filters.include_bot_messages() {
        let slot = bind(SqlValue::Text(BOT_MESSAGE_CODE.to_string()));
        sql.push_str(&format!(" AND EVENT_TYPE != {slot}"));
    }
    if !filters.include_lifecycle_start() {
        let slot = bind(SqlValue::Text(LIFECYCLE_START.to_string()));
        sql.push_str(&format!(" AND LIFECYCLE_PHASE != {slot}"));
    }
    sql.push_str(" ORDER BY ID");

    ExtractQuery { sql, params }
}

/// Reads the raw rows matching `filters`. An empty table is not an error.
pub fn extract_events(store: &EventStore, filters: &FilterSpecification) -> ExportResult<RawEventTable> {
    let query = build_extract_query(filters);
    let rows = store.with_connection(|conn| {
        let mut stmt = conn.prepare(&query.sql)?;
        let rows = stmt
            .query_map(params_from_iter(query.params.iter()), |row| {
                Ok(RawEventRecord {
                    event_type: optional_text(row.get(0)?),
                    case_id: optional_text(row.get(1)?),
                    activity_name: optional_text(row.get(2)?),
                    timestamp: raw_timestamp(row.get(3)?),
                    lifecycle_phase: optional_text(row.get(4)?),
                    resource: optional_text(row.get(5)?),
                    resource_type: optional_text(row.get(6)?),
                    remarks: optional_text(row.get(7)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    })?;

    debug!(
        resource_ids = ?filters.resource_ids(),
        rows = rows.len(),
        "extracted raw events"
    );
    Ok(rows)
}

/// `agentId` values recorded in `MESSAGE.REMARKS` for the given `botName`.
pub fn agent_ids_for_bot(store: &EventStore, bot_name: &str) -> ExportResult<Vec<String>> {
    let sql = format!(
        "SELECT json_extract(REMARKS, '$.agentId') FROM {MESSAGES_TABLE} \
         WHERE CASE WHEN json_valid(REMARKS) THEN json_extract(REMARKS, '$.botName') END = ?1"
    );
    store.with_connection(|conn| {
        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map([bot_name], |row| row.get::<_, SqlValue>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids.into_iter().filter_map(optional_text).collect())
    })
}

fn optional_text(value: SqlValue) -> Option<String> {
    match value {
        SqlValue::Null => None,
        SqlValue::Integer(number) => Some(number.to_string()),
        SqlValue::Real(number) => Some(number.to_string()),
        SqlValue::Text(text) => Some(text),
        SqlValue::Blob(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
    }
}

fn raw_timestamp(value: SqlValue) -> RawTimestamp {
    match value {
        SqlValue::Integer(epoch) => RawTimestamp::Epoch(epoch),
        SqlValue::Null => RawTimestamp::Missing,
        other => match optional_text(other) {
            Some(text) if !text.trim().is_empty() => RawTimestamp::Text(text),
            _ => RawTimestamp::Missing,
        },
    }
}
