//! An in-memory archive for tests.

use crate::{
    ArchiveError, ArchiveReader, Block, BlockRewards, BlockSummary, CanonicalChain,
    EpochBlockRange, ForkRangeQuery, PayoutBlock,
};
use async_trait::async_trait;
use mpp_consensus::SlotSpan;
use std::{collections::BTreeSet, ops::RangeInclusive};
use tokio::sync::RwLock;

/// Public key used as the creator of blocks built by [`block`].
pub const TEST_CREATOR: &str = "B62qtestcreator";

/// Builds a block with row id `id` at `height`, linked to row `id - 1`.
///
/// Heights at or below genesis get no parent. Both slot counters equal the height.
pub fn block(id: i64, height: u64) -> Block {
    Block {
        id,
        parent_id: (height > 1).then(|| id - 1),
        height,
        state_hash: format!("3NK{id}"),
        parent_hash: format!("3NK{}", id - 1),
        ledger_hash: format!("jx{id}"),
        staking_ledger_hash: "jxstaking".to_string(),
        creator: TEST_CREATOR.to_string(),
        winner: TEST_CREATOR.to_string(),
        global_slot_since_genesis: height,
        global_slot_since_hard_fork: height,
        timestamp: 1_615_939_200_000 + height * 180_000,
        rewards: BlockRewards {
            coinbase_receiver: Some(TEST_CREATOR.to_string()),
            coinbase: 720_000_000_000,
            ..Default::default()
        },
    }
}

/// Builds a linear chain whose row ids equal the heights.
pub fn chain(heights: RangeInclusive<u64>) -> Vec<Block> {
    heights.map(|height| block(height as i64, height)).collect()
}

/// An [`ArchiveReader`] over rows held in memory.
///
/// Canonical membership is computed with [`CanonicalChain`] on every call, so orphaned rows
/// behave as they do in the database.
#[derive(Debug, Default)]
pub struct InMemoryArchive {
    blocks: RwLock<Vec<Block>>,
}

impl InMemoryArchive {
    /// Creates an empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an archive holding `blocks`.
    pub fn with_blocks(blocks: impl IntoIterator<Item = Block>) -> Self {
        Self { blocks: RwLock::new(blocks.into_iter().collect()) }
    }

    /// Appends a row.
    pub async fn insert(&self, block: Block) {
        self.blocks.write().await.push(block);
    }

    /// Removes every row at `height`.
    pub async fn remove_height(&self, height: u64) {
        self.blocks.write().await.retain(|block| block.height != height);
    }
}

#[async_trait]
impl ArchiveReader for InMemoryArchive {
    async fn latest_block(&self) -> Result<BlockSummary, ArchiveError> {
        let blocks = self.blocks.read().await;
        blocks
            .iter()
            .max_by_key(|block| (block.height, block.id))
            .map(Block::summary)
            .ok_or(ArchiveError::Empty)
    }

    async fn missing_heights(
        &self,
        min_height: u64,
        max_height: u64,
    ) -> Result<BTreeSet<u64>, ArchiveError> {
        let blocks = self.blocks.read().await;
        let present: BTreeSet<u64> = blocks.iter().map(|block| block.height).collect();
        Ok((min_height..=max_height).filter(|height| !present.contains(height)).collect())
    }

    async fn null_parent_heights(
        &self,
        min_height: u64,
        max_height: u64,
    ) -> Result<BTreeSet<u64>, ArchiveError> {
        let blocks = self.blocks.read().await;
        Ok(blocks
            .iter()
            .filter(|block| block.parent_id.is_none() && block.height > 1)
            .map(|block| block.height)
            .filter(|height| (min_height..=max_height).contains(height))
            .collect())
    }

    async fn height_range(&self, query: &ForkRangeQuery) -> Result<EpochBlockRange, ArchiveError> {
        let blocks = self.blocks.read().await;
        let canonical = CanonicalChain::from_blocks(blocks.iter());
        let heights = blocks
            .iter()
            .filter(|block| canonical.contains(block.id) && query.matches(block))
            .map(|block| block.height);

        Ok(heights.fold(EpochBlockRange::default(), |range, height| EpochBlockRange {
            min_height: Some(range.min_height.map_or(height, |min| min.min(height))),
            max_height: Some(range.max_height.map_or(height, |max| max.max(height))),
        }))
    }

    async fn ledger_slot_span(&self, ledger_hash: &str) -> Result<Option<SlotSpan>, ArchiveError> {
        let blocks = self.blocks.read().await;
        let slots = blocks
            .iter()
            .filter(|block| block.staking_ledger_hash == ledger_hash)
            .map(|block| block.global_slot_since_hard_fork);

        Ok(slots.fold(None, |span, slot| {
            Some(match span {
                None => SlotSpan { min_slot: slot, max_slot: slot },
                Some(SlotSpan { min_slot, max_slot }) => {
                    SlotSpan { min_slot: min_slot.min(slot), max_slot: max_slot.max(slot) }
                }
            })
        }))
    }

    async fn canonical_blocks(
        &self,
        creator: &str,
        min_height: u64,
        max_height: u64,
    ) -> Result<Vec<PayoutBlock>, ArchiveError> {
        let blocks = self.blocks.read().await;
        let canonical = CanonicalChain::from_blocks(blocks.iter());
        let mut selected: Vec<_> = blocks
            .iter()
            .filter(|block| {
                canonical.contains(block.id) &&
                    block.creator == creator &&
                    (min_height..=max_height).contains(&block.height)
            })
            .map(Block::payout)
            .collect();
        selected.sort_by(|a, b| b.height.cmp(&a.height));
        Ok(selected)
    }
}
