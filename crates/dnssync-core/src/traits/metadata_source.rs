// # Metadata Source Trait
//
// Defines the interface for reading run configuration and the instance's
// current public IP from an instance metadata service.
//
// ## Implementations
//
// - GCE metadata server: `dnssync-metadata-gce` crate

use async_trait::async_trait;
use std::fmt;
use std::net::Ipv4Addr;

/// Configuration values read from instance metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKey {
    /// Cloud project identifier
    Project,
    /// Managed zone name
    Zone,
    /// Domain served by the zone (without trailing dot)
    Domain,
    /// Host label to keep in sync
    Hostname,
}

impl MetadataKey {
    /// All keys, in the order the driver reads them
    pub const ALL: [MetadataKey; 4] = [
        MetadataKey::Project,
        MetadataKey::Zone,
        MetadataKey::Domain,
        MetadataKey::Hostname,
    ];

    /// Short name of the key
    pub fn name(&self) -> &'static str {
        match self {
            MetadataKey::Project => "project",
            MetadataKey::Zone => "zone",
            MetadataKey::Domain => "domain",
            MetadataKey::Hostname => "hostname",
        }
    }
}

impl fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Trait for metadata source implementations
///
/// A single failed read is final: implementations do not retry, and every
/// failure is reported as [`crate::Error::ConfigUnavailable`].
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Read a configuration value
    async fn get(&self, key: MetadataKey) -> Result<String, crate::Error>;

    /// Read the instance's current public IPv4 address
    async fn public_ip(&self) -> Result<Ipv4Addr, crate::Error>;
}
