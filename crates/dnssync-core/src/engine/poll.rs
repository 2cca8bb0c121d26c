//! Poll-until-done loop for submitted change batches
//!
//! ```text
//! submitted ──poll──▶ pending ──sleep(interval)──▶ poll ──▶ … ──▶ done
//! ```
//!
//! The status is polled once right after submission. Every `pending` result
//! is logged and followed by exactly one interval wait. The interval is
//! constant; there is no backoff.

use crate::config::ReconcileSettings;
use crate::error::{Error, Result};
use crate::traits::{ChangeHandle, ChangeStatus, DnsRecordStore};
use tracing::{info, warn};

/// Wait for a submitted change to reach [`ChangeStatus::Done`]
///
/// # Parameters
///
/// - `store`: Provider the change was submitted to
/// - `zone`: Managed zone name
/// - `handle`: Handle returned by `submit_change`
/// - `label`: Human label for status lines ("Record Deletion", "Record Update")
/// - `settings`: Poll interval and limits
///
/// # Returns
///
/// - `Ok(polls)`: Number of status polls performed
/// - `Err(Error::ConvergenceTimeout)`: `max_polls` reached while still pending
/// - `Err(Error::TransientPoll)`: A poll failed and the error budget is spent
pub async fn wait_until_done(
    store: &dyn DnsRecordStore,
    zone: &str,
    handle: &ChangeHandle,
    label: &str,
    settings: &ReconcileSettings,
) -> Result<u32> {
    let interval = settings.poll_interval();
    let mut polls: u32 = 0;
    let mut errors: u32 = 0;

    loop {
        polls += 1;
        match store.poll_status(zone, handle).await {
            Ok(ChangeStatus::Done) => {
                info!("{} Status: {}", label, ChangeStatus::Done);
                return Ok(polls);
            }
            Ok(status) => {
                info!("{} Status: {}", label, status);
            }
            Err(e) => {
                errors += 1;
                if errors > settings.max_poll_errors {
                    return Err(e);
                }
                warn!(
                    "Polling change {} failed ({}/{} tolerated): {}",
                    handle.id, errors, settings.max_poll_errors, e
                );
            }
        }

        if settings.max_polls.is_some_and(|max| polls >= max) {
            return Err(Error::convergence_timeout(&handle.id, polls));
        }

        tokio::time::sleep(interval).await;
    }
}
