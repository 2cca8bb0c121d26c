// # DNS Record Store Trait
//
// Defines the interface to a DNS provider that applies record changes
// asynchronously, in batches.
//
// ## Implementations
//
// - Google Cloud DNS: `dnssync-provider-clouddns` crate
//
// ## Usage
//
// ```rust,ignore
// use dnssync_core::traits::{Change, DnsRecordStore, RecordType};
//
// let existing = store.list_records("my-zone", "host.example.com.", RecordType::A).await?;
// let handle = store.submit_change("my-zone", &Change::new().delete(existing[0].clone())).await?;
// let status = store.poll_status("my-zone", &handle).await?;
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// DNS record type
///
/// Only address records are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// A record (IPv4)
    A,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record set as the provider stores it
///
/// `rrdatas` is kept verbatim so a deletion can name the record exactly as
/// the provider returned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    /// Fully-qualified name, terminated with a dot
    pub name: String,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Time-to-live in seconds
    pub ttl: u32,
    /// Record values
    pub rrdatas: Vec<String>,
}

impl RecordSet {
    /// Build a single-value A record set
    pub fn address(name: impl Into<String>, ttl: u32, ip: Ipv4Addr) -> Self {
        Self {
            name: name.into(),
            record_type: RecordType::A,
            ttl,
            rrdatas: vec![ip.to_string()],
        }
    }
}

/// A record set narrowed to the single-address shape the reconciler works with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRecord {
    /// Parsed address value
    pub ip: Ipv4Addr,
    /// The record set exactly as read from the provider
    pub raw: RecordSet,
}

impl AddressRecord {
    /// Narrow a record set to a single IPv4 value
    ///
    /// Multi-value sets and non-IPv4 values are refused rather than collapsed.
    pub fn from_record_set(set: RecordSet) -> crate::Result<Self> {
        let value = match set.rrdatas.as_slice() {
            [value] => value,
            [] => {
                return Err(crate::Error::unsupported_record_state(format!(
                    "{} {} has no values",
                    set.name, set.record_type
                )));
            }
            values => {
                return Err(crate::Error::unsupported_record_state(format!(
                    "{} {} has {} values ({}); only single-value records are supported",
                    set.name,
                    set.record_type,
                    values.len(),
                    values.join(", ")
                )));
            }
        };

        let ip = value.trim().parse::<Ipv4Addr>().map_err(|_| {
            crate::Error::unsupported_record_state(format!(
                "{} {} value is not an IPv4 address: {}",
                set.name, set.record_type, value
            ))
        })?;

        Ok(Self { ip, raw: set })
    }
}

/// An atomic batch of record additions and deletions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Record sets to add
    pub additions: Vec<RecordSet>,
    /// Record sets to remove
    pub deletions: Vec<RecordSet>,
}

impl Change {
    /// Create an empty change batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record set to add
    pub fn add(mut self, record: RecordSet) -> Self {
        self.additions.push(record);
        self
    }

    /// Append a record set to remove
    pub fn delete(mut self, record: RecordSet) -> Self {
        self.deletions.push(record);
        self
    }

    /// True if the batch carries no operations
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.deletions.is_empty()
    }
}

/// Provider-assigned status of a change batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    /// Still being applied
    Pending,
    /// Fully applied
    Done,
}

impl ChangeStatus {
    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeStatus::Pending => "pending",
            ChangeStatus::Done => "done",
        }
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to a submitted change batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeHandle {
    /// Provider-assigned change id
    pub id: String,
    /// Status reported at submission time
    pub status: ChangeStatus,
}

/// Trait for DNS provider implementations
///
/// Implementations execute single API calls and report what happened.
/// They never decide whether a change is needed and never retry; waiting
/// for a change to apply is owned by the engine's poll loop.
#[async_trait]
pub trait DnsRecordStore: Send + Sync {
    /// List record sets in a zone matching a name and type
    ///
    /// # Returns
    ///
    /// - `Ok(vec![])`: No matching record exists
    /// - `Ok(records)`: Matching record sets
    /// - `Err(Error::RecordQuery)`: Transport or provider failure
    async fn list_records(
        &self,
        zone: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<RecordSet>, crate::Error>;

    /// Create a change batch and begin applying it
    ///
    /// # Returns
    ///
    /// - `Ok(ChangeHandle)`: The batch was accepted
    /// - `Err(Error::Submission)`: The provider rejected the batch
    async fn submit_change(&self, zone: &str, change: &Change)
    -> Result<ChangeHandle, crate::Error>;

    /// Fetch the current status of a submitted change
    ///
    /// # Returns
    ///
    /// - `Ok(ChangeStatus)`: Current status
    /// - `Err(Error::TransientPoll)`: The status could not be fetched
    async fn poll_status(
        &self,
        zone: &str,
        handle: &ChangeHandle,
    ) -> Result<ChangeStatus, crate::Error>;

    /// Get the provider name (for logging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing record stores once the run configuration is known
///
/// The project a store talks to is itself read from metadata, so stores are
/// built after [`crate::SyncConfig`] has been loaded.
pub trait DnsRecordStoreFactory: Send + Sync {
    /// Create a DnsRecordStore for the given configuration
    fn create(
        &self,
        config: &crate::config::SyncConfig,
    ) -> Result<Box<dyn DnsRecordStore>, crate::Error>;
}
