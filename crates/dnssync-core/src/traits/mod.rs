//! Core traits for the DNS sync system
//!
//! - [`MetadataSource`]: Read run configuration and the public IP
//! - [`DnsRecordStore`]: List records and apply change batches
//! - [`TokenSource`]: Supply bearer tokens to authenticated providers

pub mod dns_store;
pub mod metadata_source;
pub mod token_source;

pub use dns_store::{
    AddressRecord, Change, ChangeHandle, ChangeStatus, DnsRecordStore, DnsRecordStoreFactory,
    RecordSet, RecordType,
};
pub use metadata_source::{MetadataKey, MetadataSource};
pub use token_source::{StaticTokenSource, TokenSource};
