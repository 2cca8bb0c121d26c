//! One-shot sync driver
//!
//! Gathers configuration and the public IP from the metadata source, reads
//! the current record from the DNS provider, and hands both to the
//! [`Reconciler`]. Any metadata failure aborts before the first DNS call.

use crate::config::{ReconcileSettings, SyncConfig};
use crate::engine::{ReconcileOutcome, Reconciler, current_record};
use crate::error::Result;
use crate::traits::{DnsRecordStoreFactory, MetadataSource, RecordType};
use tracing::info;

/// One-shot orchestration of a single sync run
pub struct SyncDriver {
    /// Source of run configuration and the public IP
    metadata: Box<dyn MetadataSource>,

    /// Builds the DNS record store once the project is known
    store_factory: Box<dyn DnsRecordStoreFactory>,

    /// Reconciler settings
    settings: ReconcileSettings,
}

impl SyncDriver {
    /// Create a new driver
    ///
    /// Settings are validated here so a bad TTL or interval fails before
    /// any network call.
    pub fn new(
        metadata: Box<dyn MetadataSource>,
        store_factory: Box<dyn DnsRecordStoreFactory>,
        settings: ReconcileSettings,
    ) -> Result<Self> {
        settings.validate()?;

        Ok(Self {
            metadata,
            store_factory,
            settings,
        })
    }

    /// Run one reconciliation pass
    ///
    /// # Returns
    ///
    /// - `Ok(ReconcileOutcome)`: DNS matches the public IP
    /// - `Err(Error::ConfigUnavailable)`: Metadata could not be read; no DNS call was made
    /// - `Err(_)`: Any DNS provider failure, propagated unchanged
    pub async fn run_once(&self) -> Result<ReconcileOutcome> {
        let config = SyncConfig::from_metadata(self.metadata.as_ref()).await?;
        let new_ip = self.metadata.public_ip().await?;
        let fqdn = config.fqdn();

        let store = self.store_factory.create(&config)?;
        info!(
            "Syncing {} in zone {} (project {}) via {}",
            fqdn,
            config.zone,
            config.project,
            store.provider_name()
        );

        let listed = store
            .list_records(&config.zone, &fqdn, RecordType::A)
            .await?;
        let current = current_record(&fqdn, listed)?;

        match &current {
            Some(record) => info!("Old IP address: {}", record.ip),
            None => info!("Old IP address: None"),
        }
        info!("New IP address: {}", new_ip);

        Reconciler::new(store.as_ref(), &config.zone, &self.settings)
            .reconcile(&fqdn, current.as_ref(), new_ip)
            .await
    }
}
