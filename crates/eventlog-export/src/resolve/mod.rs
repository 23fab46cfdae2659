//! Bot name -> resource id resolution.
//!
//! Two sources disagree on where bot identity lives: the event store records
//! `{"botName", "agentId"}` pairs in `MESSAGE.REMARKS`, while the bot registry
//! exposes `GET {base}/bots` as `{id: {"name": ...}}`.

use std::time::Duration;

use reqwest::{Client, Url};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::error::{ExportError, ExportResult};
use crate::models::dedupe_preserving_order;
use crate::store::{self, EventStore};

pub const DEFAULT_REGISTRY_TIMEOUT: Duration = Duration::from_secs(30);

/// Resource ids for `bot_name` according to the event store.
pub fn resolve_from_store(store: &EventStore, bot_name: &str) -> ExportResult<Vec<String>> {
    let bot_name = bot_name.trim();
    if bot_name.is_empty() {
        return Err(ExportError::invalid_filter("bot name must be set"));
    }

    let ids = dedupe_preserving_order(store::agent_ids_for_bot(store, bot_name)?);
    if ids.is_empty() {
        error!(bot_name, "no resource ids recorded in event store for bot");
    } else {
        info!(bot_name, resource_ids = ?ids, "resolved bot from event store");
    }
    Ok(ids)
}

#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: Client,
}

impl RegistryClient {
    pub fn new(timeout: Duration) -> ExportResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| {
                ExportError::configuration(format!("failed to construct registry client: {error}"))
            })?;
        Ok(Self { http })
    }

    /// Resource ids registered under `bot_name`. Malformed registry documents
    /// degrade to an empty result; transport failures do not.
    pub async fn resolve(&self, endpoint: Option<&str>, bot_name: &str) -> ExportResult<Vec<String>> {
        let endpoint = endpoint
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
            .ok_or_else(|| ExportError::configuration("bot manager url must be set"))?;
        let url = bots_url(endpoint)?;

        info!(%url, bot_name, "fetching resource ids from bot registry");
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|error| ExportError::transport(format!("GET {url} failed: {error}")))?;
        let status = response.status();
        let body = response.text().await.map_err(|error| {
            ExportError::transport(format!("failed to read registry response from {url}: {error}"))
        })?;
        if !status.is_success() {
            return Err(ExportError::transport(format!(
                "registry {url} returned {status}"
            )));
        }

        let ids = match bot_ids_from_registry_document(&body, bot_name) {
            Some(ids) => ids,
            None => {
                warn!(%url, "registry response is not a JSON object; treating as no bots");
                return Ok(Vec::new());
            }
        };
        if ids.is_empty() {
            error!(bot_name, "no resource ids found for bot in registry");
        }
        Ok(ids)
    }
}

/// Keys of `{id: {"name": bot_name, ...}}` entries. `None` when the document
/// is not a JSON object.
#[must_use]
pub fn bot_ids_from_registry_document(body: &str, bot_name: &str) -> Option<Vec<String>> {
    let document: Value = serde_json::from_str(body).ok()?;
    let bots = document.as_object()?;
    let ids = bots
        .iter()
        .filter(|(_, descriptor)| {
            descriptor
                .get("name")
                .and_then(Value::as_str)
                .is_some_and(|name| name == bot_name)
        })
        .map(|(id, _)| id.clone());
    Some(dedupe_preserving_order(ids))
}

fn bots_url(endpoint: &str) -> ExportResult<Url> {
    let raw = format!("{}/bots", endpoint.trim_end_matches('/'));
    Url::parse(&raw).map_err(|error| {
        ExportError::configuration(format!("invalid bot manager url `{endpoint}`: {error}"))
    })
}
