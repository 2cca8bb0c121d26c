//! Test doubles and common utilities for reconciliation contract tests
//!
//! The recording store keeps an in-memory zone, logs every call in order,
//! and applies a change to the zone only when a poll reports it done.

#![allow(dead_code)]

use dnssync_core::config::SyncConfig;
use dnssync_core::error::{Error, Result};
use dnssync_core::traits::{
    Change, ChangeHandle, ChangeStatus, DnsRecordStore, DnsRecordStoreFactory, MetadataKey,
    MetadataSource, RecordSet, RecordType,
};
use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const PROJECT: &str = "demo-project";
pub const ZONE: &str = "demo-zone";
pub const DOMAIN: &str = "example.com";
pub const HOSTNAME: &str = "host";
pub const FQDN: &str = "host.example.com.";

/// A metadata source with fixed answers
#[derive(Clone)]
pub struct ScriptedMetadata {
    values: HashMap<MetadataKey, String>,
    public_ip: Option<Ipv4Addr>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedMetadata {
    /// All four keys present, public IP as given
    pub fn new(public_ip: Ipv4Addr) -> Self {
        let values = HashMap::from([
            (MetadataKey::Project, PROJECT.to_string()),
            (MetadataKey::Zone, ZONE.to_string()),
            (MetadataKey::Domain, DOMAIN.to_string()),
            (MetadataKey::Hostname, HOSTNAME.to_string()),
        ]);

        Self {
            values,
            public_ip: Some(public_ip),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make reads of `key` fail
    pub fn without(mut self, key: MetadataKey) -> Self {
        self.values.remove(&key);
        self
    }

    /// Override the value of `key`
    pub fn with(mut self, key: MetadataKey, value: &str) -> Self {
        self.values.insert(key, value.to_string());
        self
    }

    /// Make the public IP read fail
    pub fn without_public_ip(mut self) -> Self {
        self.public_ip = None;
        self
    }

    /// Number of reads performed
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MetadataSource for ScriptedMetadata {
    async fn get(&self, key: MetadataKey) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.values
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::config_unavailable(format!("request for {} got status 404", key)))
    }

    async fn public_ip(&self) -> Result<Ipv4Addr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.public_ip
            .ok_or_else(|| Error::config_unavailable("external-ip request failed"))
    }
}

/// One recorded store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List { zone: String, name: String },
    Submit { zone: String, change: Change },
    Poll { change_id: String },
}

/// Scripted answer for the next poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollReply {
    Pending,
    Done,
    Fail,
}

#[derive(Default)]
struct Inner {
    zone: Vec<RecordSet>,
    calls: Vec<StoreCall>,
    poll_script: VecDeque<PollReply>,
    submitted: HashMap<String, Change>,
    applied: Vec<String>,
    reject_submission: Option<usize>,
    submissions: usize,
}

/// A DnsRecordStore double backed by an in-memory zone
#[derive(Clone, Default)]
pub struct RecordingStore {
    inner: Arc<Mutex<Inner>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the zone with record sets
    pub fn with_records(self, records: Vec<RecordSet>) -> Self {
        self.inner.lock().unwrap().zone = records;
        self
    }

    /// Answers for upcoming polls; once exhausted every poll reports done
    pub fn script_polls(self, replies: &[PollReply]) -> Self {
        self.inner
            .lock()
            .unwrap()
            .poll_script
            .extend(replies.iter().copied());
        self
    }

    /// Reject the `index`-th submission (0-based)
    pub fn reject_submission(self, index: usize) -> Self {
        self.inner.lock().unwrap().reject_submission = Some(index);
        self
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn submitted_changes(&self) -> Vec<Change> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::Submit { change, .. } => Some(change),
                _ => None,
            })
            .collect()
    }

    pub fn poll_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, StoreCall::Poll { .. }))
            .count()
    }

    /// Current contents of the simulated zone
    pub fn zone_records(&self) -> Vec<RecordSet> {
        self.inner.lock().unwrap().zone.clone()
    }
}

#[async_trait::async_trait]
impl DnsRecordStore for RecordingStore {
    async fn list_records(
        &self,
        zone: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<RecordSet>> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(StoreCall::List {
            zone: zone.to_string(),
            name: name.to_string(),
        });
        Ok(inner
            .zone
            .iter()
            .filter(|set| set.name == name && set.record_type == record_type)
            .cloned()
            .collect())
    }

    async fn submit_change(&self, zone: &str, change: &Change) -> Result<ChangeHandle> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(StoreCall::Submit {
            zone: zone.to_string(),
            change: change.clone(),
        });

        let index = inner.submissions;
        inner.submissions += 1;
        if inner.reject_submission == Some(index) {
            return Err(Error::submission("HTTP 409: resource record set already exists"));
        }

        let id = (index + 1).to_string();
        inner.submitted.insert(id.clone(), change.clone());
        Ok(ChangeHandle {
            id,
            status: ChangeStatus::Pending,
        })
    }

    async fn poll_status(&self, _zone: &str, handle: &ChangeHandle) -> Result<ChangeStatus> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(StoreCall::Poll {
            change_id: handle.id.clone(),
        });

        match inner.poll_script.pop_front().unwrap_or(PollReply::Done) {
            PollReply::Pending => Ok(ChangeStatus::Pending),
            PollReply::Fail => Err(Error::transient_poll("connection reset")),
            PollReply::Done => {
                if !inner.applied.contains(&handle.id) {
                    let change = inner.submitted.get(&handle.id).cloned().unwrap_or_default();
                    inner.zone.retain(|set| !change.deletions.contains(set));
                    inner.zone.extend(change.additions);
                    inner.applied.push(handle.id.clone());
                }
                Ok(ChangeStatus::Done)
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }
}

/// Factory handing out clones of one RecordingStore
pub struct RecordingFactory {
    store: RecordingStore,
    created: Arc<AtomicUsize>,
    last_project: Arc<Mutex<Option<String>>>,
}

impl RecordingFactory {
    pub fn new(store: RecordingStore) -> Self {
        Self {
            store,
            created: Arc::new(AtomicUsize::new(0)),
            last_project: Arc::new(Mutex::new(None)),
        }
    }

    /// A factory sharing counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            store: other.store.clone(),
            created: Arc::clone(&other.created),
            last_project: Arc::clone(&other.last_project),
        }
    }

    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn last_project(&self) -> Option<String> {
        self.last_project.lock().unwrap().clone()
    }
}

impl DnsRecordStoreFactory for RecordingFactory {
    fn create(&self, config: &SyncConfig) -> Result<Box<dyn DnsRecordStore>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        *self.last_project.lock().unwrap() = Some(config.project.clone());
        Ok(Box::new(self.store.clone()))
    }
}

/// An A record set for the managed name
pub fn a_record(ttl: u32, ip: [u8; 4]) -> RecordSet {
    RecordSet::address(FQDN, ttl, Ipv4Addr::from(ip))
}

