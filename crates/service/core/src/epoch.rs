//! Staking ledger to epoch resolution.

use crate::EngineError;
use mpp_archive::ArchiveReader;
use mpp_consensus::EpochSchedule;
use std::sync::Arc;
use tracing::{debug, warn};

/// Determines the epoch a staking ledger hash belongs to from the blocks that reference it.
#[derive(Debug)]
pub struct EpochResolver<A: ?Sized> {
    schedule: EpochSchedule,
    archive: Arc<A>,
}

impl<A> Clone for EpochResolver<A>
where
    A: ?Sized,
{
    fn clone(&self) -> Self {
        Self { schedule: self.schedule, archive: Arc::clone(&self.archive) }
    }
}

impl<A> EpochResolver<A>
where
    A: ArchiveReader + ?Sized,
{
    /// Creates a new [`EpochResolver`].
    pub const fn new(schedule: EpochSchedule, archive: Arc<A>) -> Self {
        Self { schedule, archive }
    }

    /// Resolves the epoch of `ledger_hash`.
    ///
    /// Returns `Ok(None)` when no block references the ledger yet. The genesis ledger is the
    /// staking ledger of epochs 0 and 1; `user_specified_epoch` picks between them.
    pub async fn resolve_epoch(
        &self,
        ledger_hash: &str,
        user_specified_epoch: Option<u64>,
    ) -> Result<Option<u64>, EngineError> {
        let Some(span) = self.archive.ledger_slot_span(ledger_hash).await? else {
            debug!(target: "epoch_resolver", ledger_hash, "No block references ledger yet");
            return Ok(None);
        };

        let epoch = self
            .schedule
            .epoch_from_slot_span(span, user_specified_epoch)
            .inspect_err(|err| {
                warn!(target: "epoch_resolver", ledger_hash, %err, "Failed to resolve ledger epoch");
            })?;

        debug!(
            target: "epoch_resolver",
            ledger_hash,
            epoch,
            min_slot = span.min_slot,
            max_slot = span.max_slot,
            "Resolved ledger epoch"
        );
        Ok(Some(epoch))
    }
}
