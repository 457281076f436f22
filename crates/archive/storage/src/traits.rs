use crate::{ArchiveError, BlockSummary, EpochBlockRange, ForkRangeQuery, PayoutBlock};
use async_trait::async_trait;
use mpp_consensus::SlotSpan;
use std::collections::BTreeSet;

/// Read-only access to the archive.
///
/// Every call re-reads the current state of the archive. Two calls may observe different
/// snapshots while the ingester is writing.
#[async_trait]
pub trait ArchiveReader: Send + Sync {
    /// Returns the highest block in the archive.
    ///
    /// # Returns
    /// * `Ok(BlockSummary)` describing the block at the maximal height.
    /// * `Err(ArchiveError::Empty)` if the archive holds no block.
    async fn latest_block(&self) -> Result<BlockSummary, ArchiveError>;

    /// Returns every height in `[min_height, max_height]` without any block row.
    async fn missing_heights(
        &self,
        min_height: u64,
        max_height: u64,
    ) -> Result<BTreeSet<u64>, ArchiveError>;

    /// Returns every height above 1 in `[min_height, max_height]` holding a block without a
    /// parent link. Height 1 is genesis and never reported.
    async fn null_parent_heights(
        &self,
        min_height: u64,
        max_height: u64,
    ) -> Result<BTreeSet<u64>, ArchiveError>;

    /// Returns the lowest and highest canonical height matching a fork specific slot query.
    async fn height_range(&self, query: &ForkRangeQuery) -> Result<EpochBlockRange, ArchiveError>;

    /// Returns the span of since-hard-fork slots of the blocks whose staking epoch references
    /// `ledger_hash`, or `None` when no block does.
    async fn ledger_slot_span(&self, ledger_hash: &str) -> Result<Option<SlotSpan>, ArchiveError>;

    /// Returns the canonical blocks produced by `creator` in `[min_height, max_height]`, highest
    /// first.
    async fn canonical_blocks(
        &self,
        creator: &str,
        min_height: u64,
        max_height: u64,
    ) -> Result<Vec<PayoutBlock>, ArchiveError>;
}
