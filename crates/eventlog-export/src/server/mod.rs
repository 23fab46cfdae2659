//! HTTP surface: one route per way of naming the resources to export.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::cache::Artifact;
use crate::error::{ExportError, ExportResult};
use crate::export::{ExportOutcome, ExportRequest, run_export};
use crate::models::FilterSpecification;
use crate::resolve::RegistryClient;
use crate::store::EventStore;

pub const BOT_MANAGER_URL_PARAM: &str = "bot-manager-url";
const XES_CONTENT_TYPE: &str = "application/xml";

#[derive(Clone)]
pub struct AppState {
    store: Arc<EventStore>,
    output_dir: Arc<PathBuf>,
    registry: RegistryClient,
}

impl AppState {
    #[must_use]
    pub fn new(store: EventStore, output_dir: PathBuf, registry: RegistryClient) -> Self {
        Self {
            store: Arc::new(store),
            output_dir: Arc::new(output_dir),
            registry,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResourcesBody {
    resource_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/resource/:resource_id", get(export_resource))
        .route("/resources", post(export_resources))
        .route("/bot/:bot_name", get(export_bot))
        .with_state(state)
}

/// Serves until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "event log export service listening");
    }
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn health() -> Response {
    json_response(json!({"ok": true}), StatusCode::OK)
}

async fn export_resource(
    Path(resource_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Response {
    match export_request([resource_id], &params) {
        Ok(request) => respond_with_export(state, request).await,
        Err(error) => rejection("filter", &error, &params),
    }
}

async fn export_resources(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
    body: Bytes,
) -> Response {
    let body = match serde_json::from_slice::<ResourcesBody>(&body) {
        Ok(body) => body,
        Err(error) => {
            let error = ExportError::invalid_filter(format!(
                "request body must be {{\"resource_ids\": [...]}}: {error}"
            ));
            return rejection("body", &error, &params);
        }
    };
    match export_request(body.resource_ids, &params) {
        Ok(request) => respond_with_export(state, request).await,
        Err(error) => rejection("filter", &error, &params),
    }
}

async fn export_bot(
    Path(bot_name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Response {
    let Some(endpoint) = non_empty_param(&params, BOT_MANAGER_URL_PARAM) else {
        warn!(
            stage = "resolve",
            bot_name = %bot_name,
            params = ?sorted(&params),
            "bot manager url missing"
        );
        return json_response(
            ErrorBody {
                error: format!("{BOT_MANAGER_URL_PARAM} parameter is missing"),
            },
            StatusCode::BAD_REQUEST,
        );
    };

    let resource_ids = match state.registry.resolve(Some(endpoint), &bot_name).await {
        Ok(resource_ids) => resource_ids,
        Err(ExportError::Configuration(message)) => {
            warn!(stage = "resolve", bot_name = %bot_name, %message, "rejected bot manager url");
            return json_response(ErrorBody { error: message }, StatusCode::BAD_REQUEST);
        }
        Err(error) => return rejection("resolve", &error, &params),
    };
    if resource_ids.is_empty() {
        error!(stage = "resolve", bot_name = %bot_name, "bot resolved to no resource ids");
        return json_response(
            ErrorBody {
                error: format!("No resource ids found for bot `{bot_name}`"),
            },
            StatusCode::INTERNAL_SERVER_ERROR,
        );
    }

    match export_request(resource_ids, &params) {
        Ok(request) => respond_with_export(state, request).await,
        Err(error) => rejection("filter", &error, &params),
    }
}

fn export_request<I>(resource_ids: I, params: &HashMap<String, String>) -> ExportResult<ExportRequest>
where
    I: IntoIterator<Item = String>,
{
    let filters = FilterSpecification::new(resource_ids)?
        .with_date_range(
            non_empty_param(params, "start_date"),
            non_empty_param(params, "end_date"),
        )?
        .with_bot_messages(flag_param(params, "include_bot_messages")?)
        .with_lifecycle_start(flag_param(params, "include_life_cycle_start")?);
    Ok(ExportRequest {
        filters,
        use_cache: flag_param(params, "use_cache")?,
    })
}

async fn respond_with_export(state: AppState, request: ExportRequest) -> Response {
    let filters = request.filters.clone();
    let store = Arc::clone(&state.store);
    let output_dir = Arc::clone(&state.output_dir);
    let outcome =
        tokio::task::spawn_blocking(move || run_export(&store, &output_dir, &request)).await;

    match outcome {
        Ok(Ok(ExportOutcome::Cached(artifact) | ExportOutcome::Generated(artifact))) => {
            artifact_response(&artifact).await
        }
        Ok(Ok(ExportOutcome::NoEvents)) => StatusCode::NO_CONTENT.into_response(),
        Ok(Err(error)) => {
            error!(stage = "export", ?filters, kind = error.kind(), %error, "export failed");
            error_response(&error)
        }
        Err(join_error) => {
            error!(stage = "export", ?filters, %join_error, "export task panicked");
            json_response(
                ErrorBody {
                    error: "export task failed".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
    }
}

async fn artifact_response(artifact: &Artifact) -> Response {
    let bytes = match tokio::fs::read(&artifact.path).await {
        Ok(bytes) => bytes,
        Err(error) => {
            return error_response(&ExportError::io(format!(
                "failed to read {}: {error}",
                artifact.path.display()
            )));
        }
    };

    let mut response = Response::new(Body::from(bytes));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(XES_CONTENT_TYPE),
    );
    if let Ok(disposition) =
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", artifact.name))
    {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, disposition);
    }
    response
}

/// Logs a request that failed before export with its stage and raw query.
fn rejection(
    stage: &'static str,
    error: &ExportError,
    params: &HashMap<String, String>,
) -> Response {
    let params = sorted(params);
    if status_for(error).is_server_error() {
        error!(stage, kind = error.kind(), ?params, %error, "request failed");
    } else {
        warn!(stage, kind = error.kind(), ?params, %error, "request rejected");
    }
    error_response(error)
}

fn sorted(params: &HashMap<String, String>) -> BTreeMap<&str, &str> {
    params
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect()
}

fn error_response(error: &ExportError) -> Response {
    let status = status_for(error);
    if status == StatusCode::NO_CONTENT {
        return status.into_response();
    }
    json_response(
        ErrorBody {
            error: error.to_string(),
        },
        status,
    )
}

#[must_use]
pub fn status_for(error: &ExportError) -> StatusCode {
    match error {
        ExportError::InvalidFilter(_) => StatusCode::BAD_REQUEST,
        ExportError::NoEventsFound { .. } => StatusCode::NO_CONTENT,
        ExportError::Configuration(_)
        | ExportError::DataIntegrity(_)
        | ExportError::Transport(_)
        | ExportError::Store(_)
        | ExportError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn json_response<T: Serialize>(payload: T, status: StatusCode) -> Response {
    let mut response = Json(payload).into_response();
    *response.status_mut() = status;
    response
}

fn non_empty_param<'a>(params: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn flag_param(params: &HashMap<String, String>, name: &str) -> ExportResult<bool> {
    match non_empty_param(params, name) {
        None => Ok(false),
        Some(raw) => parse_flag(raw).ok_or_else(|| {
            ExportError::invalid_filter(format!(
                "`{name}` must be one of true/false/1/0/yes/no, got `{raw}`"
            ))
        }),
    }
}

#[must_use]
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
