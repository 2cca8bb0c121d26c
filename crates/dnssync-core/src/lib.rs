// # dnssync-core
//
// Core library for keeping one DNS A record in sync with the public IP of a
// cloud instance whose address changes across reboots.
//
// ## Architecture Overview
//
// - **MetadataSource**: Trait for reading run configuration and the public IP
// - **DnsRecordStore**: Trait for listing records and applying change batches
// - **TokenSource**: Trait for supplying API bearer tokens to providers
// - **Reconciler**: Decides whether an update is needed and drives it
// - **SyncDriver**: One-shot orchestration of a single run
//
// ## Flow
//
// SyncDriver → MetadataSource (config + public IP) → DnsRecordStore (current
// record) → Reconciler (plan, delete-then-create, poll until done) → outcome
//
// Providers and metadata sources live in their own crates and only execute
// single calls; every decision is made here.

pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod traits;

// Re-export core types for convenience
pub use config::{ReconcileSettings, SyncConfig};
pub use driver::SyncDriver;
pub use engine::{Plan, ReconcileOutcome, Reconciler};
pub use error::{Error, Result};
pub use traits::{DnsRecordStore, DnsRecordStoreFactory, MetadataSource, TokenSource};
