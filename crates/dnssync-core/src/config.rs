//! Configuration types for the DNS sync system
//!
//! [`SyncConfig`] is read from instance metadata once per run and validated
//! before any DNS call is made. [`ReconcileSettings`] carries the tunables
//! of the reconciler and its poll loop.

use crate::error::{Error, Result};
use crate::traits::{MetadataKey, MetadataSource};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which record to keep in sync, and where
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Cloud project identifier
    pub project: String,
    /// Managed zone name
    pub zone: String,
    /// Domain served by the zone (a trailing dot is tolerated)
    pub domain: String,
    /// Host label within the domain
    pub hostname: String,
}

impl SyncConfig {
    /// Create a configuration from its parts
    pub fn new(
        project: impl Into<String>,
        zone: impl Into<String>,
        domain: impl Into<String>,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            zone: zone.into(),
            domain: domain.into(),
            hostname: hostname.into(),
        }
    }

    /// Read every key from a metadata source and validate the result
    ///
    /// The first failed read aborts; nothing is retried.
    pub async fn from_metadata(source: &dyn MetadataSource) -> Result<Self> {
        let config = Self {
            project: source.get(MetadataKey::Project).await?,
            zone: source.get(MetadataKey::Zone).await?,
            domain: source.get(MetadataKey::Domain).await?,
            hostname: source.get(MetadataKey::Hostname).await?,
        };
        tracing::debug!(
            "Metadata: project={} zone={} domain={} hostname={}",
            config.project,
            config.zone,
            config.domain,
            config.hostname
        );

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            (MetadataKey::Project, &self.project),
            (MetadataKey::Zone, &self.zone),
            (MetadataKey::Domain, &self.domain),
            (MetadataKey::Hostname, &self.hostname),
        ] {
            if value.trim().is_empty() {
                return Err(Error::config_unavailable(format!(
                    "metadata value '{}' is empty",
                    key
                )));
            }
        }

        validate_domain_name(self.domain_without_dot())?;
        validate_domain_name(&self.hostname)?;

        if self.fqdn().len() > 254 {
            return Err(Error::config_unavailable(format!(
                "hostname too long: {} chars (max 253 without the final dot)",
                self.fqdn().len() - 1
            )));
        }

        Ok(())
    }

    /// The zone's DNS name, lowercased and terminated with a dot
    pub fn dns_name(&self) -> String {
        format!("{}.", self.domain_without_dot().to_ascii_lowercase())
    }

    /// Fully-qualified name of the managed record, lowercased and terminated with a dot
    ///
    /// Cloud DNS reports names in lowercase.
    pub fn fqdn(&self) -> String {
        format!("{}.{}", self.hostname.to_ascii_lowercase(), self.dns_name())
    }

    fn domain_without_dot(&self) -> &str {
        self.domain.strip_suffix('.').unwrap_or(&self.domain)
    }
}

/// Validate a dotted name per RFC 1035 label rules
fn validate_domain_name(name: &str) -> Result<()> {
    if name.len() > 253 {
        return Err(Error::config_unavailable(format!(
            "DNS name too long: {} chars (max 253). Got: {}",
            name.len(),
            name
        )));
    }

    for label in name.split('.') {
        validate_label(label).map_err(|e| {
            Error::config_unavailable(format!("'{}' has an invalid label: {}", name, e))
        })?;
    }

    Ok(())
}

/// Validate a single DNS label
fn validate_label(label: &str) -> std::result::Result<(), String> {
    if label.is_empty() {
        return Err("DNS label cannot be empty".to_string());
    }

    if label.len() > 63 {
        return Err(format!(
            "DNS label too long: {} chars (max 63). Label: '{}'",
            label.len(),
            label
        ));
    }

    if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(format!(
            "DNS label contains invalid characters: '{}'. Valid: alphanumeric and hyphen only.",
            label
        ));
    }

    if label.starts_with('-') || label.ends_with('-') {
        return Err(format!(
            "DNS label cannot start or end with hyphen: '{}'",
            label
        ));
    }

    Ok(())
}

/// Reconciler settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSettings {
    /// TTL written on newly created records (seconds)
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Fixed wait between change status polls (seconds)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Give up on a change still pending after this many polls
    ///
    /// `None` waits indefinitely.
    #[serde(default)]
    pub max_polls: Option<u32>,

    /// Transient poll failures tolerated per change before giving up
    ///
    /// Each tolerated failure costs one poll interval. 0 fails on the first error.
    #[serde(default)]
    pub max_poll_errors: u32,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            poll_interval_secs: default_poll_interval_secs(),
            max_polls: None,
            max_poll_errors: 0,
        }
    }
}

impl ReconcileSettings {
    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.ttl == 0 {
            return Err(Error::config_unavailable("record TTL must be > 0"));
        }
        if self.poll_interval_secs == 0 {
            return Err(Error::config_unavailable("poll interval must be > 0"));
        }
        if self.max_polls == Some(0) {
            return Err(Error::config_unavailable("max polls must be > 0 when set"));
        }
        Ok(())
    }

    /// The poll interval as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn default_ttl() -> u32 {
    60
}

fn default_poll_interval_secs() -> u64 {
    20
}
