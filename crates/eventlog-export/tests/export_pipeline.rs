mod common;

use common::{EventRow, scenario_rows, seed_store};
use eventlog_export::ExportError;
use eventlog_export::export::{ExportOutcome, ExportRequest, run_export};
use eventlog_export::models::FilterSpecification;

fn request(filters: FilterSpecification, use_cache: bool) -> ExportRequest {
    ExportRequest { filters, use_cache }
}

fn filters(ids: &[&str]) -> FilterSpecification {
    FilterSpecification::new(ids.iter().copied()).expect("filters should build")
}

#[test]
fn default_filters_drop_bot_messages() {
    let seeded = seed_store(&scenario_rows(), &[]);
    let store = seeded.open();

    let outcome = run_export(&store, &seeded.output_dir, &request(filters(&["r1"]), false))
        .expect("export should succeed");
    let ExportOutcome::Generated(artifact) = outcome else {
        panic!("expected a generated artifact, got {outcome:?}");
    };
    assert_eq!(artifact.name, "r1.xes");

    let xes = std::fs::read_to_string(&artifact.path).expect("artifact should be readable");
    assert_eq!(xes.matches("<event>").count(), 2);
    assert_eq!(xes.matches("<trace>").count(), 2);
    assert!(xes.contains(r#"<string key="EVENT_TYPE" value="SERVICE_REQUEST"/>"#));
    assert!(!xes.contains("BOT_MESSAGE"));
}

#[test]
fn including_bot_messages_keeps_them_and_changes_the_name() {
    let seeded = seed_store(&scenario_rows(), &[]);
    let store = seeded.open();

    let outcome = run_export(
        &store,
        &seeded.output_dir,
        &request(filters(&["r1"]).with_bot_messages(true), false),
    )
    .expect("export should succeed");
    let artifact = outcome.artifact().expect("artifact should be produced");
    assert_eq!(artifact.name, "r1_bot_messages.xes");

    let xes = std::fs::read_to_string(&artifact.path).expect("artifact should be readable");
    assert_eq!(xes.matches("<event>").count(), 3);
    assert!(xes.contains(r#"value="BOT_MESSAGE""#));
}

#[test]
fn sibling_rows_get_default_user() {
    let rows = vec![
        EventRow::new("SERVICE_CUSTOM_MESSAGE_1", "c1", "2024-01-01 10:00:00")
            .remarks(r#"{"user":"alice"}"#),
        EventRow::new("SERVICE_CUSTOM_MESSAGE_3", "c1", "2024-01-01 10:00:01"),
    ];
    let seeded = seed_store(&rows, &[]);
    let store = seeded.open();

    let outcome = run_export(&store, &seeded.output_dir, &request(filters(&["r1"]), false))
        .expect("export should succeed");
    let artifact = outcome.artifact().expect("artifact should be produced");
    let xes = std::fs::read_to_string(&artifact.path).expect("artifact should be readable");

    assert!(xes.contains(r#"<string key="user" value="alice"/>"#));
    assert!(xes.contains(r#"<string key="user" value=""/>"#));
    assert_eq!(xes.matches(r#"key="user""#).count(), 2);
}

#[test]
fn zero_rows_is_a_no_events_outcome() {
    let seeded = seed_store(&scenario_rows(), &[]);
    let store = seeded.open();

    let outcome = run_export(&store, &seeded.output_dir, &request(filters(&["other"]), false))
        .expect("no events is not an error");
    assert_eq!(outcome, ExportOutcome::NoEvents);
}

#[test]
fn date_range_is_a_closed_interval() {
    let seeded = seed_store(&scenario_rows(), &[]);
    let store = seeded.open();
    let ranged = filters(&["r1"])
        .with_date_range(Some("2024-01-01 10:00:00"), Some("2024-01-01 10:30:00"))
        .expect("date range should parse");

    let outcome = run_export(&store, &seeded.output_dir, &request(ranged, false))
        .expect("export should succeed");
    let artifact = outcome.artifact().expect("artifact should be produced");
    let xes = std::fs::read_to_string(&artifact.path).expect("artifact should be readable");
    assert_eq!(xes.matches("<event>").count(), 1);
    assert!(xes.contains(r#"value="c1""#));
    assert!(!xes.contains(r#"value="c2""#));
}

#[test]
fn date_window_matches_epoch_and_t_separated_timestamps() {
    let rows = vec![
        EventRow::new("SERVICE_CUSTOM_MESSAGE_3", "epoch", "1704103200"),
        EventRow::new("SERVICE_CUSTOM_MESSAGE_3", "iso", "2024-01-01T10:30:00"),
        EventRow::new("SERVICE_CUSTOM_MESSAGE_3", "late", "2024-01-01T11:00:01"),
    ];
    let seeded = seed_store(&rows, &[]);
    let store = seeded.open();

    let windowed = filters(&["r1"])
        .with_date_range(Some("2024-01-01 09:00:00"), Some("2024-01-01 11:00:00"))
        .expect("date range should parse");
    let outcome = run_export(&store, &seeded.output_dir, &request(windowed, false))
        .expect("export should succeed");
    let artifact = outcome.artifact().expect("epoch and T-form rows are inside the window");

    let xes = std::fs::read_to_string(&artifact.path).expect("artifact should be readable");
    assert!(xes.contains(r#"value="epoch""#));
    assert!(xes.contains(r#"value="iso""#));
    assert_eq!(xes.matches("<event>").count(), 2);
    assert!(!xes.contains(r#"value="late""#));
}

#[test]
fn cached_artifact_is_returned_verbatim() {
    let seeded = seed_store(&scenario_rows(), &[]);
    let store = seeded.open();
    std::fs::create_dir_all(&seeded.output_dir).expect("output dir should be creatable");
    let cached_path = seeded.output_dir.join("r1.xes");
    std::fs::write(&cached_path, "<log>cached</log>").expect("cached artifact should be writable");

    let outcome = run_export(&store, &seeded.output_dir, &request(filters(&["r1"]), true))
        .expect("cached export should succeed");
    assert!(matches!(outcome, ExportOutcome::Cached(_)));
    assert_eq!(
        std::fs::read_to_string(&cached_path).expect("artifact should be readable"),
        "<log>cached</log>"
    );

    let regenerated = run_export(&store, &seeded.output_dir, &request(filters(&["r1"]), false))
        .expect("uncached export should succeed");
    assert!(matches!(regenerated, ExportOutcome::Generated(_)));
    assert_ne!(
        std::fs::read_to_string(&cached_path).expect("artifact should be readable"),
        "<log>cached</log>"
    );
}

#[test]
fn malformed_remarks_abort_without_writing() {
    let rows = vec![
        EventRow::new("SERVICE_CUSTOM_MESSAGE_3", "c1", "2024-01-01 10:00:00"),
        EventRow::new("SERVICE_CUSTOM_MESSAGE_3", "c7", "2024-01-01 10:00:01").remarks("{oops"),
    ];
    let seeded = seed_store(&rows, &[]);
    let store = seeded.open();

    let err = run_export(&store, &seeded.output_dir, &request(filters(&["r1"]), false))
        .expect_err("malformed remarks should fail");
    assert!(matches!(err, ExportError::DataIntegrity(_)));
    assert!(err.to_string().contains("case `c7`"), "unexpected error: {err}");
    assert!(!seeded.output_dir.join("r1.xes").exists());
}

#[test]
fn lifecycle_start_rows_need_opt_in() {
    let rows = vec![
        EventRow::new("SERVICE_CUSTOM_MESSAGE_3", "c1", "2024-01-01 10:00:00").lifecycle("start"),
        EventRow::new("SERVICE_CUSTOM_MESSAGE_3", "c1", "2024-01-01 10:00:03"),
    ];
    let seeded = seed_store(&rows, &[]);
    let store = seeded.open();

    let strict = run_export(&store, &seeded.output_dir, &request(filters(&["r1"]), false))
        .expect("export should succeed");
    let xes = std::fs::read_to_string(&strict.artifact().expect("artifact").path)
        .expect("artifact should be readable");
    assert_eq!(xes.matches("<event>").count(), 1);

    let inclusive = run_export(
        &store,
        &seeded.output_dir,
        &request(filters(&["r1"]).with_lifecycle_start(true), false),
    )
    .expect("export should succeed");
    let artifact = inclusive.artifact().expect("artifact");
    assert_eq!(artifact.name, "r1_life_cycle_start.xes");
    let xes = std::fs::read_to_string(&artifact.path).expect("artifact should be readable");
    assert_eq!(xes.matches("<event>").count(), 2);
    assert!(xes.contains(r#"<string key="lifecycle:transition" value="start"/>"#));
}
