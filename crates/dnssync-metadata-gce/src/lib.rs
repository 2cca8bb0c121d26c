// # GCE Metadata Source
//
// This crate reads run configuration, the instance's public IP and a
// service-account access token from the Compute Engine metadata server.
//
// ## Endpoints
//
// All paths are relative to `http://metadata.google.internal/computeMetadata/v1/`
// and every request carries `Metadata-Flavor: Google`.
//
// - `project/project-id`: project identifier
// - `instance/attributes/{zone|domain|hostname}`: custom instance metadata
// - `instance/network-interfaces/0/access-configs/0/external-ip`: public IPv4
// - `instance/service-accounts/default/token`: OAuth access token (JSON)
//
// ## Failure Policy
//
// A single failed read is final. Configuration and IP reads fail with
// `ConfigUnavailable`; token reads fail with `Authentication`.

use async_trait::async_trait;
use dnssync_core::traits::{MetadataKey, MetadataSource, TokenSource};
use dnssync_core::{Error, Result};
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Default metadata server root
pub const DEFAULT_METADATA_URL: &str = "http://metadata.google.internal/computeMetadata/v1/";

/// Header required by the metadata server
const METADATA_FLAVOR_HEADER: &str = "Metadata-Flavor";
const METADATA_FLAVOR_VALUE: &str = "Google";

/// Path of the first access config's external IP
const EXTERNAL_IP_PATH: &str = "instance/network-interfaces/0/access-configs/0/external-ip";

/// Path of the default service account's access token
const TOKEN_PATH: &str = "instance/service-accounts/default/token";

/// Default HTTP timeout for metadata requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Refresh a cached token this long before it expires
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Metadata path for a configuration key
pub fn key_path(key: MetadataKey) -> String {
    match key {
        MetadataKey::Project => "project/project-id".to_string(),
        other => format!("instance/attributes/{}", other.name()),
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// Compute Engine metadata server client
#[derive(Clone)]
pub struct GceMetadata {
    /// Metadata root, always ending in `/`
    base_url: String,

    /// HTTP client
    client: reqwest::Client,

    /// Cached service-account token
    token: Arc<Mutex<Option<CachedToken>>>,
}

impl std::fmt::Debug for GceMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GceMetadata")
            .field("base_url", &self.base_url)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

impl Default for GceMetadata {
    fn default() -> Self {
        Self::new()
    }
}

impl GceMetadata {
    /// Create a client for the standard metadata server
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_METADATA_URL)
    }

    /// Create a client for a metadata server at a custom root
    ///
    /// Used for emulators and tests.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Self {
            base_url,
            client: reqwest::Client::builder()
                .timeout(DEFAULT_HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
            token: Arc::new(Mutex::new(None)),
        }
    }

    /// GET a metadata path, returning the body on a success status
    async fn fetch(&self, path: &str, as_text: bool) -> std::result::Result<String, String> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .client
            .get(&url)
            .header(METADATA_FLAVOR_HEADER, METADATA_FLAVOR_VALUE);
        if as_text {
            request = request.query(&[("alt", "text")]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| format!("request for {} failed: {}", path, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("request for {} got status code {}", path, status));
        }

        response
            .text()
            .await
            .map_err(|e| format!("failed to read response for {}: {}", path, e))
    }

    async fn fetch_token(&self) -> Result<TokenResponse> {
        let body = self.fetch(TOKEN_PATH, false).await.map_err(Error::auth)?;
        serde_json::from_str(&body)
            .map_err(|e| Error::auth(format!("invalid token response: {}", e)))
    }
}

#[async_trait]
impl MetadataSource for GceMetadata {
    async fn get(&self, key: MetadataKey) -> Result<String> {
        let value = self
            .fetch(&key_path(key), true)
            .await
            .map_err(|e| Error::config_unavailable(format!("please set VM metadata '{}': {}", key, e)))?;

        Ok(value.trim().to_string())
    }

    async fn public_ip(&self) -> Result<Ipv4Addr> {
        let body = self
            .fetch(EXTERNAL_IP_PATH, true)
            .await
            .map_err(|e| Error::config_unavailable(format!("error getting public IP: {}", e)))?;

        let text = body.trim();
        if text.is_empty() {
            return Err(Error::config_unavailable(
                "instance has no external IP on its first access config",
            ));
        }

        text.parse()
            .map_err(|_| Error::config_unavailable(format!("invalid public IPv4 address: {}", text)))
    }
}

#[async_trait]
impl TokenSource for GceMetadata {
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(token.token.clone());
        }

        let fresh = self.fetch_token().await?;
        if fresh.access_token.is_empty() {
            return Err(Error::auth("metadata server returned an empty access token"));
        }

        let lifetime = Duration::from_secs(fresh.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        tracing::debug!("Fetched access token valid for {}s", fresh.expires_in);

        *cached = Some(CachedToken {
            token: fresh.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(fresh.access_token)
    }
}
