use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{Router, extract::State, http::StatusCode, routing::get};
use eventlog_export::ExportError;
use eventlog_export::resolve::RegistryClient;

#[derive(Default)]
struct MockRegistry {
    hits: AtomicUsize,
}

async fn spawn_registry(status: StatusCode, body: &'static str) -> (String, Arc<MockRegistry>) {
    let state = Arc::new(MockRegistry::default());
    let app = Router::new()
        .route(
            "/bots",
            get(move |State(state): State<Arc<MockRegistry>>| async move {
                state.hits.fetch_add(1, Ordering::SeqCst);
                (status, body)
            }),
        )
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{addr}"), state)
}

fn client() -> RegistryClient {
    RegistryClient::new(Duration::from_secs(5)).expect("client should build")
}

#[tokio::test]
async fn resolves_ids_by_descriptor_name() {
    let (base_url, registry) = spawn_registry(
        StatusCode::OK,
        r#"{"b1": {"name": "Helper"}, "b2": {"name": "Other"}, "b3": {"name": "Helper"}}"#,
    )
    .await;

    let ids = client()
        .resolve(Some(&format!("{base_url}/")), "Helper")
        .await
        .expect("registry should resolve");
    assert_eq!(ids, vec!["b1", "b3"]);
    assert_eq!(registry.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unknown_bot_resolves_to_nothing() {
    let (base_url, _) = spawn_registry(StatusCode::OK, r#"{"b1": {"name": "Other"}}"#).await;
    let ids = client()
        .resolve(Some(&base_url), "Helper")
        .await
        .expect("registry should answer");
    assert!(ids.is_empty());
}

#[tokio::test]
async fn malformed_document_degrades_to_empty() {
    let (base_url, _) = spawn_registry(StatusCode::OK, "<html>maintenance</html>").await;
    let ids = client()
        .resolve(Some(&base_url), "Helper")
        .await
        .expect("malformed registry body is not fatal");
    assert!(ids.is_empty());
}

#[tokio::test]
async fn error_status_is_a_transport_failure() {
    let (base_url, _) = spawn_registry(StatusCode::BAD_GATEWAY, "upstream down").await;
    let err = client()
        .resolve(Some(&base_url), "Helper")
        .await
        .expect_err("non-2xx should fail");
    assert!(matches!(err, ExportError::Transport(_)), "unexpected error: {err}");
}

#[tokio::test]
async fn missing_endpoint_is_a_configuration_error() {
    let err = client()
        .resolve(Some("  "), "Helper")
        .await
        .expect_err("blank endpoint should fail");
    assert!(matches!(err, ExportError::Configuration(_)));
}

#[tokio::test]
async fn unreachable_registry_is_a_transport_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe listener");
    let addr = listener.local_addr().expect("listener addr");
    drop(listener);

    let err = client()
        .resolve(Some(&format!("http://{addr}")), "Helper")
        .await
        .expect_err("closed port should fail");
    assert!(matches!(err, ExportError::Transport(_)), "unexpected error: {err}");
}
