//! Reconciliation engine
//!
//! The engine decides whether the managed A record needs to change and, if
//! it does, drives the change through the provider:
//!
//! ```text
//!   current record ─┐
//!                   ├──▶ plan() ──▶ AlreadyCorrect ──▶ done, zero batches
//!   observed IP ────┘        │
//!                            ├──▶ Create  ──▶ submit(add) ──▶ poll until done
//!                            │
//!                            └──▶ Replace ──▶ submit(delete) ──▶ poll until done
//!                                                     │
//!                                                     ▼
//!                                            submit(add) ──▶ poll until done
//! ```
//!
//! ## Delete-then-create
//!
//! A records are keyed by name and type, and the provider rejects a create
//! that collides with an existing set. The old set is therefore deleted and
//! the deletion awaited before the new set is submitted. Between the two the
//! name resolves to nothing; if the creation fails the name is left without
//! an address record. The next run observes an empty zone and creates it.
//!
//! ## Idempotency
//!
//! When the current value equals the observed IP nothing is submitted, even
//! if the TTL differs from the configured one.

pub mod poll;

use crate::config::ReconcileSettings;
use crate::error::{Error, Result};
use crate::traits::{AddressRecord, Change, DnsRecordStore, RecordSet, RecordType};
use std::net::Ipv4Addr;
use tracing::{debug, info};

pub use poll::wait_until_done;

/// Status line label for the deletion batch
const DELETION_LABEL: &str = "Record Deletion";

/// Status line label for the creation batch
const CREATION_LABEL: &str = "Record Update";

/// What the engine intends to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// DNS already matches the observed IP
    AlreadyCorrect {
        /// The current (and observed) IP
        ip: Ipv4Addr,
    },
    /// No record exists; create one
    Create {
        /// Record set to add
        addition: RecordSet,
    },
    /// A record with a different value exists; delete it, then create
    Replace {
        /// Record set to remove, exactly as read
        deletion: RecordSet,
        /// Record set to add
        addition: RecordSet,
    },
}

/// Result of a reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Record already had the correct IP (no-op)
    AlreadyCorrect {
        /// The current IP address
        ip: Ipv4Addr,
    },
    /// Record was created (didn't exist before)
    Created {
        /// The created IP address
        new_ip: Ipv4Addr,
    },
    /// Record was replaced
    Replaced {
        /// The previous IP address
        previous_ip: Ipv4Addr,
        /// The new IP address
        new_ip: Ipv4Addr,
    },
}

impl ReconcileOutcome {
    /// Number of change batches the outcome implies
    pub fn batches(&self) -> usize {
        match self {
            ReconcileOutcome::AlreadyCorrect { .. } => 0,
            ReconcileOutcome::Created { .. } => 1,
            ReconcileOutcome::Replaced { .. } => 2,
        }
    }
}

/// Narrow a provider listing to at most one address record
///
/// Record sets for other names or types are ignored. More than one matching
/// set, or a set that is not a single IPv4 value, is refused.
pub fn current_record(fqdn: &str, listed: Vec<RecordSet>) -> Result<Option<AddressRecord>> {
    let mut matching: Vec<RecordSet> = listed
        .into_iter()
        .filter(|set| set.record_type == RecordType::A && set.name.eq_ignore_ascii_case(fqdn))
        .collect();

    match matching.len() {
        0 => Ok(None),
        1 => AddressRecord::from_record_set(matching.remove(0)).map(Some),
        n => Err(Error::unsupported_record_state(format!(
            "{} has {} A record sets; expected at most one",
            fqdn, n
        ))),
    }
}

/// Decide what to do for the observed IP
///
/// Pure: no I/O, no logging.
pub fn plan(
    fqdn: &str,
    current: Option<&AddressRecord>,
    observed_ip: Ipv4Addr,
    settings: &ReconcileSettings,
) -> Plan {
    let addition = RecordSet::address(fqdn, settings.ttl, observed_ip);

    match current {
        Some(record) if record.ip == observed_ip => Plan::AlreadyCorrect { ip: observed_ip },
        Some(record) => Plan::Replace {
            deletion: record.raw.clone(),
            addition,
        },
        None => Plan::Create { addition },
    }
}

/// Drives plans through a [`DnsRecordStore`]
pub struct Reconciler<'a> {
    store: &'a dyn DnsRecordStore,
    zone: &'a str,
    settings: &'a ReconcileSettings,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler for one zone
    pub fn new(
        store: &'a dyn DnsRecordStore,
        zone: &'a str,
        settings: &'a ReconcileSettings,
    ) -> Self {
        Self {
            store,
            zone,
            settings,
        }
    }

    /// Converge `fqdn` to `observed_ip`
    ///
    /// # Parameters
    ///
    /// - `fqdn`: Fully-qualified record name, terminated with a dot
    /// - `current`: The record read from the provider, if any
    /// - `observed_ip`: The instance's public IP
    pub async fn reconcile(
        &self,
        fqdn: &str,
        current: Option<&AddressRecord>,
        observed_ip: Ipv4Addr,
    ) -> Result<ReconcileOutcome> {
        let plan = plan(fqdn, current, observed_ip, self.settings);
        self.apply(plan).await
    }

    /// Execute a plan
    ///
    /// A failed deletion aborts before the creation is attempted.
    pub async fn apply(&self, plan: Plan) -> Result<ReconcileOutcome> {
        match plan {
            Plan::AlreadyCorrect { ip } => {
                info!("DNS already points to {}, nothing to do", ip);
                Ok(ReconcileOutcome::AlreadyCorrect { ip })
            }
            Plan::Create { addition } => {
                let new_ip = address_of(&addition)?;
                let fqdn = addition.name.clone();
                self.run_batch(Change::new().add(addition), CREATION_LABEL)
                    .await?;
                info!("{} now points to {}.", fqdn, new_ip);
                Ok(ReconcileOutcome::Created { new_ip })
            }
            Plan::Replace { deletion, addition } => {
                let previous_ip = address_of(&deletion)?;
                let new_ip = address_of(&addition)?;
                let fqdn = addition.name.clone();

                self.run_batch(Change::new().delete(deletion), DELETION_LABEL)
                    .await?;
                self.run_batch(Change::new().add(addition), CREATION_LABEL)
                    .await?;

                info!("{} now points to {}.", fqdn, new_ip);
                Ok(ReconcileOutcome::Replaced {
                    previous_ip,
                    new_ip,
                })
            }
        }
    }

    /// Submit one batch and wait for it to apply
    async fn run_batch(&self, change: Change, label: &str) -> Result<()> {
        if change.is_empty() {
            return Err(Error::Other(format!("refusing to submit an empty {} batch", label)));
        }

        debug!(
            "Submitting change to zone {} via {}: {} addition(s), {} deletion(s)",
            self.zone,
            self.store.provider_name(),
            change.additions.len(),
            change.deletions.len()
        );

        let handle = self.store.submit_change(self.zone, &change).await?;
        debug!("Change {} submitted ({})", handle.id, handle.status);

        let polls = wait_until_done(self.store, self.zone, &handle, label, self.settings).await?;
        debug!("Change {} done after {} poll(s)", handle.id, polls);
        Ok(())
    }
}

fn address_of(set: &RecordSet) -> Result<Ipv4Addr> {
    AddressRecord::from_record_set(set.clone()).map(|record| record.ip)
}
