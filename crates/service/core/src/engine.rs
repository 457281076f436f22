//! The operations request handlers call.

use crate::{EngineError, EpochResolver, ForkAwareRangeResolver, TrustHandle};
use mpp_archive::{ArchiveReader, BlockSummary, ChainConsistencyValidator, PayoutBlock};
use mpp_consensus::{EpochPosition, EpochSchedule, Fork};
use std::sync::Arc;
use tracing::{debug, info};

/// An epoch whose last canonical block is closer than this to the archive head is reported as
/// still in progress.
pub const EPOCH_IN_PROGRESS_DISTANCE: u64 = 20;

/// The canonical height range of an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedEpochRange {
    /// The requested epoch.
    pub epoch: u64,
    /// The requested fork.
    pub fork: Fork,
    /// Lowest canonical height of the epoch.
    pub min_height: u64,
    /// Highest canonical height of the epoch.
    pub max_height: u64,
    /// `true` while the archive head is still close to the end of the epoch.
    pub in_progress: bool,
}

/// The archive head placed in the epoch structure of its fork.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusSnapshot {
    /// Fork, epoch and slot of the head.
    pub position: EpochPosition,
    /// The head block.
    pub block: BlockSummary,
    /// The head timestamp in ISO-8601 UTC, when representable.
    pub datetime: Option<String>,
}

/// Facade over the resolvers, the consistency validator and the trust state.
#[derive(Debug)]
pub struct ArchiveEngine<A: ?Sized> {
    archive: Arc<A>,
    schedule: EpochSchedule,
    ranges: ForkAwareRangeResolver<A>,
    epochs: EpochResolver<A>,
    trust: TrustHandle,
}

impl<A> ArchiveEngine<A>
where
    A: ArchiveReader + ?Sized,
{
    /// Creates a new [`ArchiveEngine`].
    pub fn new(schedule: EpochSchedule, archive: Arc<A>, trust: TrustHandle) -> Self {
        Self {
            ranges: ForkAwareRangeResolver::new(schedule, Arc::clone(&archive)),
            epochs: EpochResolver::new(schedule, Arc::clone(&archive)),
            archive,
            schedule,
            trust,
        }
    }

    /// Returns the epoch schedule.
    pub const fn schedule(&self) -> &EpochSchedule {
        &self.schedule
    }

    /// Returns the range resolver.
    pub const fn ranges(&self) -> &ForkAwareRangeResolver<A> {
        &self.ranges
    }

    /// Resolves the canonical heights of `epoch` in fork index `fork`.
    ///
    /// The fork index is validated before anything is read. The resolved range is checked for
    /// gaps and broken parent links before it is returned. The check starts one height below the
    /// range: a gap cuts the canonical walk short, so a truncated epoch starts right above it.
    pub async fn resolve_epoch_block_range(
        &self,
        epoch: u64,
        fork: u64,
    ) -> Result<ResolvedEpochRange, EngineError> {
        let fork = Fork::try_from(fork)?;
        let range = self.ranges.height_range_for_epoch(epoch, fork).await?;
        let Some((min_height, max_height)) = range.bounds() else {
            return Err(EngineError::EpochNotReached { epoch, fork });
        };

        ChainConsistencyValidator::new(&*self.archive)
            .validate_consistency(min_height.saturating_sub(1), max_height)
            .await?;

        let head = self.archive.latest_block().await?;
        let in_progress = head.height.saturating_sub(max_height) < EPOCH_IN_PROGRESS_DISTANCE;

        info!(
            target: "range_resolver",
            epoch,
            %fork,
            min_height,
            max_height,
            in_progress,
            "Resolved epoch block range"
        );
        Ok(ResolvedEpochRange { epoch, fork, min_height, max_height, in_progress })
    }

    /// Resolves the epoch of a staking ledger hash. `None` means no block references it yet.
    pub async fn resolve_epoch_from_ledger_hash(
        &self,
        ledger_hash: &str,
        user_specified_epoch: Option<u64>,
    ) -> Result<Option<u64>, EngineError> {
        self.epochs.resolve_epoch(ledger_hash, user_specified_epoch).await
    }

    /// Returns the canonical blocks produced by `creator` in `[min_height, max_height]`, highest
    /// first, after checking the range is gap-free.
    pub async fn validate_and_fetch_blocks(
        &self,
        creator: &str,
        min_height: u64,
        max_height: u64,
    ) -> Result<Vec<PayoutBlock>, EngineError> {
        if min_height > max_height {
            return Err(EngineError::InvalidHeightRange { min_height, max_height });
        }

        ChainConsistencyValidator::new(&*self.archive)
            .validate_consistency(min_height, max_height)
            .await?;

        let blocks = self.archive.canonical_blocks(creator, min_height, max_height).await?;
        debug!(
            target: "archive",
            creator,
            min_height,
            max_height,
            blocks = blocks.len(),
            "Fetched canonical blocks"
        );
        Ok(blocks)
    }

    /// Returns the current verdict of the trust monitor.
    pub fn is_archive_trusted(&self) -> bool {
        self.trust.is_trusted()
    }

    /// Returns the archive head with its fork, epoch and slot.
    pub async fn consensus_snapshot(&self) -> Result<ConsensusSnapshot, EngineError> {
        let block = self.archive.latest_block().await?;
        let position =
            self.schedule.position(block.global_slot_since_genesis, block.global_slot_since_hard_fork);
        let datetime = block.datetime();
        Ok(ConsensusSnapshot { position, block, datetime })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trust_state;
    use mpp_archive::{
        ArchiveError,
        test_utils::{InMemoryArchive, TEST_CREATOR, block, chain},
    };
    use mpp_consensus::{ForkSchedule, SLOTS_PER_EPOCH};

    const BERKELEY_START: u64 = 100 * SLOTS_PER_EPOCH;

    fn engine(archive: InMemoryArchive) -> ArchiveEngine<InMemoryArchive> {
        let forks = ForkSchedule::new(BERKELEY_START, 0).unwrap();
        let schedule = EpochSchedule::new(SLOTS_PER_EPOCH, forks).unwrap();
        let (_writer, handle) = trust_state(true);
        ArchiveEngine::new(schedule, Arc::new(archive), handle)
    }

    /// Heights 1..=n, ten slots apart.
    fn spaced_chain(tip: u64) -> InMemoryArchive {
        InMemoryArchive::with_blocks(chain(1..=tip).into_iter().map(|mut block| {
            block.global_slot_since_genesis = block.height * 10;
            block.global_slot_since_hard_fork = block.height * 10;
            block
        }))
    }

    #[tokio::test]
    async fn test_resolve_epoch_block_range() {
        let engine = engine(spaced_chain(2_000));
        let range = engine.resolve_epoch_block_range(1, 0).await.unwrap();
        // Epoch 1 covers slots 7140..=14279.
        assert_eq!((range.min_height, range.max_height), (714, 1427));
        assert!(!range.in_progress);
    }

    #[tokio::test]
    async fn test_epoch_in_progress() {
        let engine = engine(spaced_chain(1_440));
        let range = engine.resolve_epoch_block_range(1, 0).await.unwrap();
        assert_eq!(range.max_height, 1427);
        assert!(range.in_progress);
    }

    #[tokio::test]
    async fn test_epoch_not_reached() {
        let engine = engine(spaced_chain(100));
        let err = engine.resolve_epoch_block_range(3, 0).await.unwrap_err();
        assert!(matches!(err, EngineError::EpochNotReached { epoch: 3, fork: Fork::Genesis }));
    }

    #[tokio::test]
    async fn test_fork_index_validation() {
        let engine = engine(spaced_chain(100));
        let err = engine.resolve_epoch_block_range(0, 3).await.unwrap_err();
        assert_eq!(err.to_string(), "Fork 3 not supported");

        let err = engine.resolve_epoch_block_range(0, 2).await.unwrap_err();
        assert_eq!(err.to_string(), "Fork 2 not activated");
    }

    #[tokio::test]
    async fn test_epoch_range_with_gap_is_rejected() {
        let archive = spaced_chain(2_000);
        archive.remove_height(800).await;
        let engine = engine(archive);

        let err = engine.resolve_epoch_block_range(1, 0).await.unwrap_err();
        let EngineError::Archive(ArchiveError::Inconsistent(inconsistent)) = err else {
            panic!("expected an inconsistent archive, got {err:?}");
        };
        assert_eq!(inconsistent.missing.into_iter().collect::<Vec<_>>(), vec![800]);
    }

    #[tokio::test]
    async fn test_validate_and_fetch_blocks() {
        let archive = InMemoryArchive::with_blocks(chain(1..=50));
        let mut orphan = block(500, 30);
        orphan.parent_id = Some(29);
        archive.insert(orphan).await;
        let engine = engine(archive);

        let blocks = engine.validate_and_fetch_blocks(TEST_CREATOR, 0, 50).await.unwrap();
        let heights: Vec<_> = blocks.iter().map(|block| block.height).collect();
        assert_eq!(heights, (1..=50).rev().collect::<Vec<_>>());

        let none = engine.validate_and_fetch_blocks("B62qother", 10, 20).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_blocks_rejects_null_parent() {
        let archive = InMemoryArchive::with_blocks(chain(1..=50));
        archive.remove_height(25).await;
        let mut detached = block(25, 25);
        detached.parent_id = None;
        archive.insert(detached).await;
        let engine = engine(archive);

        let err = engine.validate_and_fetch_blocks(TEST_CREATOR, 10, 40).await.unwrap_err();
        let EngineError::Archive(ArchiveError::Inconsistent(inconsistent)) = err else {
            panic!("expected an inconsistent archive, got {err:?}");
        };
        assert!(inconsistent.missing.is_empty());
        assert_eq!(inconsistent.null_parents.into_iter().collect::<Vec<_>>(), vec![25]);
    }

    #[tokio::test]
    async fn test_fetch_blocks_rejects_inverted_range() {
        let engine = engine(InMemoryArchive::with_blocks(chain(1..=5)));
        assert!(matches!(
            engine.validate_and_fetch_blocks(TEST_CREATOR, 5, 1).await,
            Err(EngineError::InvalidHeightRange { min_height: 5, max_height: 1 })
        ));
    }

    #[tokio::test]
    async fn test_consensus_snapshot_after_fork() {
        let mut head = block(10, 10);
        head.global_slot_since_genesis = BERKELEY_START + 2 * SLOTS_PER_EPOCH + 17;
        head.global_slot_since_hard_fork = 2 * SLOTS_PER_EPOCH + 17;
        let mut blocks = chain(1..=9);
        blocks.push(head);
        let engine = engine(InMemoryArchive::with_blocks(blocks));

        let snapshot = engine.consensus_snapshot().await.unwrap();
        assert_eq!(snapshot.position.fork, Fork::Berkeley);
        assert_eq!(snapshot.position.epoch, 2);
        assert_eq!(snapshot.position.slot, 17);
        assert_eq!(snapshot.block.height, 10);
        assert!(snapshot.datetime.is_some_and(|datetime| datetime.ends_with('Z')));
    }

    #[tokio::test]
    async fn test_ledger_epoch_passthrough() {
        let engine = engine(InMemoryArchive::with_blocks(chain(1..=5)));
        assert_eq!(engine.resolve_epoch_from_ledger_hash("jxunknown", None).await.unwrap(), None);
        assert!(matches!(
            engine.resolve_epoch_from_ledger_hash("jxstaking", None).await,
            Ok(Some(0))
        ));
    }
}
