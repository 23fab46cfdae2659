//! XES (IEEE 1849-2016) writer.

use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde_json::Value;
use tracing::info;

use crate::cache::{Artifact, STAGING_PREFIX};
use crate::error::{ExportError, ExportResult};
use crate::models::{CanonicalEvent, EventLog};
use crate::utils::time::format_xes_timestamp;

const XES_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<log xes.version="1849-2016" xes.features="nested-attributes" xmlns="http://www.xes-standard.org/">
  <extension name="Concept" prefix="concept" uri="http://www.xes-standard.org/concept.xesext"/>
  <extension name="Time" prefix="time" uri="http://www.xes-standard.org/time.xesext"/>
  <extension name="Lifecycle" prefix="lifecycle" uri="http://www.xes-standard.org/lifecycle.xesext"/>
  <extension name="Organizational" prefix="org" uri="http://www.xes-standard.org/org.xesext"/>
  <classifier name="Activity classifier" keys="concept:name"/>
"#;

/// Writes `log` to `output_dir/name` through a temporary file that is
/// renamed into place, so readers never see a partial artifact.
pub fn write_event_log(log: &EventLog, output_dir: &Path, name: &str) -> ExportResult<Artifact> {
    let artifact = Artifact::in_dir(output_dir, name);
    std::fs::create_dir_all(output_dir).map_err(|error| {
        ExportError::io(format!(
            "failed to create output directory {}: {error}",
            output_dir.display()
        ))
    })?;

    let mut staged = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempfile_in(output_dir)
        .map_err(|error| {
            ExportError::io(format!(
                "failed to stage artifact in {}: {error}",
                output_dir.display()
            ))
        })?;
    {
        let mut writer = BufWriter::new(staged.as_file_mut());
        render_event_log(log, &mut writer)
            .and_then(|()| writer.flush())
            .map_err(|error| ExportError::io(format!("failed to write {name}: {error}")))?;
    }
    staged
        .as_file()
        .sync_all()
        .map_err(|error| ExportError::io(format!("failed to sync {name}: {error}")))?;
    staged.persist(&artifact.path).map_err(|error| {
        ExportError::io(format!(
            "failed to move artifact into {}: {}",
            artifact.path.display(),
            error.error
        ))
    })?;

    info!(
        artifact = %artifact.path.display(),
        events = log.len(),
        "event log written"
    );
    Ok(artifact)
}

/// One trace per case id, events ordered by timestamp within each trace.
pub fn render_event_log<W: Write>(log: &EventLog, writer: &mut W) -> io::Result<()> {
    writer.write_all(XES_HEADER.as_bytes())?;
    for (case_id, events) in log.traces() {
        writeln!(writer, "  <trace>")?;
        write_string(writer, 4, "concept:name", case_id)?;
        for event in events {
            write_event(writer, event)?;
        }
        writeln!(writer, "  </trace>")?;
    }
    writeln!(writer, "</log>")
}

fn write_event<W: Write>(writer: &mut W, event: &CanonicalEvent) -> io::Result<()> {
    const INDENT: usize = 6;

    writeln!(writer, "    <event>")?;
    if let Some(activity_name) = &event.activity_name {
        write_string(writer, INDENT, "concept:name", activity_name)?;
    }
    write_attribute(
        writer,
        INDENT,
        "date",
        "time:timestamp",
        &format_xes_timestamp(event.timestamp),
    )?;
    if let Some(lifecycle) = &event.lifecycle_transition {
        write_string(writer, INDENT, "lifecycle:transition", lifecycle)?;
    }
    if let Some(resource) = &event.resource {
        write_string(writer, INDENT, "org:resource", resource)?;
    }
    write_string(writer, INDENT, "EVENT_TYPE", event.event_type.as_str())?;
    if let Some(resource_type) = &event.resource_type {
        write_string(writer, INDENT, "RESOURCE_TYPE", resource_type)?;
    }
    if let Some(remarks) = &event.remarks {
        write_string(writer, INDENT, "REMARKS", remarks)?;
    }

    let metadata = &event.metadata;
    if let Some(service_endpoint) = &metadata.service_endpoint {
        write_string(writer, INDENT, "serviceEndpoint", service_endpoint)?;
    }
    if let Some(user) = &metadata.user {
        write_string(writer, INDENT, "user", user)?;
    }
    if let Some(in_service_context) = metadata.in_service_context {
        write_attribute(
            writer,
            INDENT,
            "boolean",
            "in-service-context",
            if in_service_context { "true" } else { "false" },
        )?;
    }
    for (key, value) in &metadata.extra {
        write_json_value(writer, INDENT, key, value)?;
    }
    writeln!(writer, "    </event>")
}

fn write_json_value<W: Write>(writer: &mut W, indent: usize, key: &str, value: &Value) -> io::Result<()> {
    match value {
        Value::Null => Ok(()),
        Value::Bool(flag) => write_attribute(writer, indent, "boolean", key, &flag.to_string()),
        Value::Number(number) if number.is_i64() || number.is_u64() => {
            write_attribute(writer, indent, "int", key, &number.to_string())
        }
        Value::Number(number) => write_attribute(writer, indent, "float", key, &number.to_string()),
        Value::String(text) => write_string(writer, indent, key, text),
        nested => write_string(writer, indent, key, &nested.to_string()),
    }
}

fn write_string<W: Write>(writer: &mut W, indent: usize, key: &str, value: &str) -> io::Result<()> {
    write_attribute(writer, indent, "string", key, value)
}

fn write_attribute<W: Write>(
    writer: &mut W,
    indent: usize,
    tag: &str,
    key: &str,
    value: &str,
) -> io::Result<()> {
    writeln!(
        writer,
        "{:indent$}<{tag} key=\"{}\" value=\"{}\"/>",
        "",
        escape_xml(key),
        escape_xml(value)
    )
}

#[must_use]
pub fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\n' => escaped.push_str("&#10;"),
            '\r' => escaped.push_str("&#13;"),
            '\t' => escaped.push_str("&#9;"),
            ch if ch.is_control() => {}
            ch => escaped.push(ch),
        }
    }
    escaped
}
