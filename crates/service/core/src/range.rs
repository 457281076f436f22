//! Epoch to block height resolution across hard forks.

use crate::EngineError;
use mpp_archive::{ArchiveReader, EpochBlockRange, ForkRangeQuery};
use mpp_consensus::{ConsensusError, EpochSchedule, EpochSlotRange, Fork};
use std::sync::Arc;
use tracing::debug;

/// Maps an epoch of a fork to the canonical block heights the archive holds for it.
#[derive(Debug)]
pub struct ForkAwareRangeResolver<A: ?Sized> {
    schedule: EpochSchedule,
    archive: Arc<A>,
}

impl<A> Clone for ForkAwareRangeResolver<A>
where
    A: ?Sized,
{
    fn clone(&self) -> Self {
        Self { schedule: self.schedule, archive: Arc::clone(&self.archive) }
    }
}

impl<A> ForkAwareRangeResolver<A>
where
    A: ArchiveReader + ?Sized,
{
    /// Creates a new [`ForkAwareRangeResolver`].
    pub const fn new(schedule: EpochSchedule, archive: Arc<A>) -> Self {
        Self { schedule, archive }
    }

    /// Returns the since-genesis slot window of `epoch` within `fork`.
    ///
    /// Fails with [`ConsensusError::ForkNotActivated`] if the fork has no start slot yet.
    pub fn slot_window_for_epoch(
        &self,
        epoch: u64,
        fork: Fork,
    ) -> Result<EpochSlotRange, ConsensusError> {
        self.schedule.slot_window(epoch, fork)
    }

    /// Returns the lowest and highest canonical height whose slot falls in `window`.
    ///
    /// `window` is expressed in since-genesis slots. Both bounds are `None` when no block
    /// qualifies yet; this is not an error.
    pub async fn height_range_for_slot_window(
        &self,
        window: EpochSlotRange,
        fork: Fork,
    ) -> Result<EpochBlockRange, EngineError> {
        let forks = self.schedule.forks();
        forks.ensure_activated(fork)?;

        let Some(query) = ForkRangeQuery::new(fork, window, forks) else {
            debug!(target: "range_resolver", %fork, %window, "Slot window ends before fork start");
            return Ok(EpochBlockRange::default());
        };
        let range = self.archive.height_range(&query).await?;
        debug!(
            target: "range_resolver",
            %fork,
            %window,
            min_height = ?range.min_height,
            max_height = ?range.max_height,
            "Resolved slot window"
        );
        Ok(range)
    }

    /// Resolves `epoch` of `fork` to its canonical block heights.
    pub async fn height_range_for_epoch(
        &self,
        epoch: u64,
        fork: Fork,
    ) -> Result<EpochBlockRange, EngineError> {
        let window = self.slot_window_for_epoch(epoch, fork)?;
        self.height_range_for_slot_window(window, fork).await
    }
}
