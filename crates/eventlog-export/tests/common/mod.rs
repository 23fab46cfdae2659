#![allow(dead_code)]

use std::path::{Path, PathBuf};

use eventlog_export::store::{EventStore, ensure_event_store_schema};
use rusqlite::{Connection, params};

pub struct EventRow<'a> {
    pub event_type: &'a str,
    pub case_id: Option<&'a str>,
    pub activity: &'a str,
    pub timestamp: &'a str,
    pub lifecycle: &'a str,
    pub resource: &'a str,
    pub remarks: Option<&'a str>,
}

impl<'a> EventRow<'a> {
    pub fn new(event_type: &'a str, case_id: &'a str, timestamp: &'a str) -> Self {
        Self {
            event_type,
            case_id: Some(case_id),
            activity: "handle",
            timestamp,
            lifecycle: "complete",
            resource: "r1",
            remarks: None,
        }
    }

    pub fn activity(mut self, activity: &'a str) -> Self {
        self.activity = activity;
        self
    }

    pub fn lifecycle(mut self, lifecycle: &'a str) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn resource(mut self, resource: &'a str) -> Self {
        self.resource = resource;
        self
    }

    pub fn remarks(mut self, remarks: &'a str) -> Self {
        self.remarks = Some(remarks);
        self
    }
}

pub struct SeededStore {
    pub dir: tempfile::TempDir,
    pub db_path: PathBuf,
    pub output_dir: PathBuf,
}

impl SeededStore {
    pub fn open(&self) -> EventStore {
        EventStore::open(&self.db_path, 2).expect("store should open")
    }
}

pub fn seed_store(rows: &[EventRow<'_>], messages: &[(&str, &str)]) -> SeededStore {
    let dir = tempfile::tempdir().expect("tempdir should be creatable");
    let db_path = dir.path().join("events.db");
    let output_dir = dir.path().join("event_logs");
    write_rows(&db_path, rows, messages);
    SeededStore {
        dir,
        db_path,
        output_dir,
    }
}

pub fn write_rows(db_path: &Path, rows: &[EventRow<'_>], messages: &[(&str, &str)]) {
    let conn = Connection::open(db_path).expect("db should open");
    ensure_event_store_schema(&conn).expect("schema should apply");
    for row in rows {
        conn.execute(
            "INSERT INTO EVENTLOG (EVENT_TYPE, CASE_ID, ACTIVITY_NAME, TIME_STAMP, LIFECYCLE_PHASE, RESOURCE, RESOURCE_TYPE, REMARKS)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'bot', ?7)",
            params![
                row.event_type,
                row.case_id,
                row.activity,
                row.timestamp,
                row.lifecycle,
                row.resource,
                row.remarks
            ],
        )
        .expect("event row should insert");
    }
    for (bot_name, agent_id) in messages {
        let remarks = serde_json::json!({ "botName": bot_name, "agentId": agent_id }).to_string();
        conn.execute(
            "INSERT INTO MESSAGE (EVENT, TIME_STAMP, REMARKS) VALUES ('BOT_CREATED', '2024-01-01 00:00:00', ?1)",
            params![remarks],
        )
        .expect("message row should insert");
    }
}

/// Scenario fixture: two service requests and one bot message for `r1`.
pub fn scenario_rows() -> Vec<EventRow<'static>> {
    vec![
        EventRow::new("SERVICE_CUSTOM_MESSAGE_3", "c1", "2024-01-01 10:00:00").activity("lookup"),
        EventRow::new("SERVICE_CUSTOM_MESSAGE_2", "c1", "2024-01-01 10:00:05").activity("reply"),
        EventRow::new("SERVICE_CUSTOM_MESSAGE_3", "c2", "2024-01-01 11:00:00").activity("lookup"),
    ]
}
