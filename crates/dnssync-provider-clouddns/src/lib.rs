// # Google Cloud DNS Record Store
//
// This crate implements `DnsRecordStore` on top of the Cloud DNS v1 REST API.
//
// ## Scope
//
// - One HTTP request per trait call (listing follows `nextPageToken`)
// - Full error propagation: no retry, no backoff, no waiting
// - Dry-run mode: listings are real, change batches are logged and not sent
// - Bearer tokens come from a `TokenSource` and never appear in logs
//
// ## API Reference
//
// - List record sets: GET `/projects/:project/managedZones/:zone/rrsets?name=...&type=...`
// - Create change:    POST `/projects/:project/managedZones/:zone/changes`
// - Get change:       GET `/projects/:project/managedZones/:zone/changes/:changeId`

use async_trait::async_trait;
use dnssync_core::config::SyncConfig;
use dnssync_core::traits::{
    Change, ChangeHandle, ChangeStatus, DnsRecordStore, DnsRecordStoreFactory, RecordSet,
    RecordType, TokenSource,
};
use dnssync_core::{Error, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Cloud DNS API base URL
pub const DEFAULT_API_BASE: &str = "https://dns.googleapis.com/dns/v1";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Change id handed out for batches that were only logged
const DRY_RUN_CHANGE_ID: &str = "dry-run";

/// Record set as it appears on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct WireRecordSet {
    #[serde(default = "record_set_kind")]
    kind: String,
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    ttl: u32,
    #[serde(default)]
    rrdatas: Vec<String>,
}

fn record_set_kind() -> String {
    "dns#resourceRecordSet".to_string()
}

impl From<&RecordSet> for WireRecordSet {
    fn from(set: &RecordSet) -> Self {
        Self {
            kind: record_set_kind(),
            name: set.name.clone(),
            record_type: set.record_type.as_str().to_string(),
            ttl: set.ttl,
            rrdatas: set.rrdatas.clone(),
        }
    }
}

impl WireRecordSet {
    /// Convert to the core model; record types other than A are dropped
    fn into_record_set(self) -> Option<RecordSet> {
        let record_type = match self.record_type.as_str() {
            "A" => RecordType::A,
            _ => return None,
        };

        Some(RecordSet {
            name: self.name,
            record_type,
            ttl: self.ttl,
            rrdatas: self.rrdatas,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    rrsets: Vec<WireRecordSet>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChangeRequest {
    kind: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    additions: Vec<WireRecordSet>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    deletions: Vec<WireRecordSet>,
}

impl From<&Change> for ChangeRequest {
    fn from(change: &Change) -> Self {
        Self {
            kind: "dns#change",
            additions: change.additions.iter().map(WireRecordSet::from).collect(),
            deletions: change.deletions.iter().map(WireRecordSet::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChangeResource {
    id: String,
    status: ChangeStatus,
}

/// Describe a non-success response the way operators need to read it
fn describe_failure(status: StatusCode, body: &str) -> String {
    match status.as_u16() {
        401 | 403 => format!(
            "Authentication failed: invalid access token or insufficient permissions (DNS Administrator role required). Status: {}",
            status
        ),
        404 => format!("Project or managed zone not found. Status: {} - {}", status, body),
        409 => format!(
            "Conflict: a record set with this name and type already exists. Status: {} - {}",
            status, body
        ),
        412 => format!(
            "Precondition failed: the record set to delete does not match the zone. Status: {} - {}",
            status, body
        ),
        429 => format!("Rate limit exceeded. Please retry later. Status: {}", status),
        500..=599 => format!("Cloud DNS server error (transient): {} - {}", status, body),
        _ => format!("Request failed: {} - {}", status, body),
    }
}

/// Google Cloud DNS record store
///
/// Bound to one project; the zone is passed per call.
pub struct CloudDnsProvider {
    /// Project owning the managed zones
    project: String,

    /// API root without trailing slash
    api_base: String,

    /// Bearer token supplier
    tokens: Arc<dyn TokenSource>,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, list for real but never submit changes
    dry_run: bool,
}

impl std::fmt::Debug for CloudDnsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudDnsProvider")
            .field("project", &self.project)
            .field("api_base", &self.api_base)
            .field("tokens", &"<REDACTED>")
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudDnsProvider {
    /// Create a new Cloud DNS provider
    ///
    /// # Parameters
    ///
    /// - `project`: Project id owning the managed zone
    /// - `tokens`: Source of bearer tokens with `ndev.clouddns.readwrite` scope
    /// - `dry_run`: If true, log change batches instead of submitting them
    pub fn new(
        project: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
        dry_run: bool,
    ) -> Result<Self> {
        let project = project.into();
        if project.is_empty() {
            return Err(Error::config_unavailable("Cloud DNS project cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            project,
            api_base: DEFAULT_API_BASE.to_string(),
            tokens,
            client,
            dry_run,
        })
    }

    /// Point the provider at a different API root (emulators, tests)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn zone_url(&self, zone: &str) -> String {
        format!(
            "{}/projects/{}/managedZones/{}",
            self.api_base, self.project, zone
        )
    }

    /// Decode a JSON body from a success response, or describe the failure
    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> std::result::Result<T, String> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(describe_failure(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| format!("Failed to parse response: {}", e))
    }
}

#[async_trait]
impl DnsRecordStore for CloudDnsProvider {
    async fn list_records(
        &self,
        zone: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<RecordSet>> {
        let url = format!("{}/rrsets", self.zone_url(zone));
        let token = self.tokens.access_token().await?;
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&url)
                .bearer_auth(&token)
                .query(&[("name", name), ("type", record_type.as_str())]);
            if let Some(ref page) = page_token {
                request = request.query(&[("pageToken", page.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| Error::record_query(format!("HTTP request failed: {}", e)))?;
            let page: ListResponse = Self::read_json(response)
                .await
                .map_err(Error::record_query)?;

            records.extend(
                page.rrsets
                    .into_iter()
                    .filter_map(WireRecordSet::into_record_set),
            );

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        tracing::debug!(
            "Found {} {} record set(s) for {} in zone {}",
            records.len(),
            record_type,
            name,
            zone
        );
        Ok(records)
    }

    async fn submit_change(&self, zone: &str, change: &Change) -> Result<ChangeHandle> {
        let payload = ChangeRequest::from(change);

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would POST change to zone {}: {}",
                zone,
                serde_json::to_string(&payload)?
            );
            return Ok(ChangeHandle {
                id: DRY_RUN_CHANGE_ID.to_string(),
                status: ChangeStatus::Done,
            });
        }

        let token = self.tokens.access_token().await?;
        let response = self
            .client
            .post(format!("{}/changes", self.zone_url(zone)))
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::submission(format!("HTTP request failed: {}", e)))?;

        let created: ChangeResource = Self::read_json(response)
            .await
            .map_err(Error::submission)?;

        tracing::debug!("Change {} created ({})", created.id, created.status);
        Ok(ChangeHandle {
            id: created.id,
            status: created.status,
        })
    }

    async fn poll_status(&self, zone: &str, handle: &ChangeHandle) -> Result<ChangeStatus> {
        if self.dry_run && handle.id == DRY_RUN_CHANGE_ID {
            return Ok(ChangeStatus::Done);
        }

        let token = self.tokens.access_token().await?;
        let response = self
            .client
            .get(format!("{}/changes/{}", self.zone_url(zone), handle.id))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| Error::transient_poll(format!("HTTP request failed: {}", e)))?;

        let change: ChangeResource = Self::read_json(response)
            .await
            .map_err(Error::transient_poll)?;

        Ok(change.status)
    }

    fn provider_name(&self) -> &'static str {
        "clouddns"
    }
}

/// Factory for creating Cloud DNS providers once the project is known
pub struct CloudDnsFactory {
    tokens: Arc<dyn TokenSource>,
    api_base: String,
    dry_run: bool,
}

impl CloudDnsFactory {
    /// Create a factory
    pub fn new(tokens: Arc<dyn TokenSource>, dry_run: bool) -> Self {
        Self {
            tokens,
            api_base: DEFAULT_API_BASE.to_string(),
            dry_run,
        }
    }

    /// Use a different API root for every provider built
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

impl DnsRecordStoreFactory for CloudDnsFactory {
    fn create(&self, config: &SyncConfig) -> Result<Box<dyn DnsRecordStore>> {
        if self.dry_run {
            tracing::warn!("Cloud DNS provider running in DRY-RUN mode - no changes will be made");
        }

        let provider = CloudDnsProvider::new(
            config.project.clone(),
            Arc::clone(&self.tokens),
            self.dry_run,
        )?
        .with_api_base(self.api_base.clone());
        Ok(Box::new(provider))
    }
}
