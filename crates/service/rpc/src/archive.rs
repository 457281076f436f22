use crate::{
    ApiError, ArchiveApiServer, ConsensusResponse, EpochRangeResponse, NO_EPOCH,
};
use async_trait::async_trait;
use jsonrpsee::core::RpcResult;
use mpp_archive::{ArchiveReader, PayoutBlock};
use mpp_core::{ArchiveEngine, TrustGate};
use std::sync::Arc;
use tracing::debug;

/// The archive rpc server.
#[derive(Debug)]
pub struct ArchiveRpc<A: ?Sized> {
    engine: Arc<ArchiveEngine<A>>,
    gate: TrustGate,
}

impl<A: ?Sized> ArchiveRpc<A> {
    /// Constructs a new [`ArchiveRpc`].
    pub const fn new(engine: Arc<ArchiveEngine<A>>, gate: TrustGate) -> Self {
        Self { engine, gate }
    }
}

impl<A> ArchiveRpc<A>
where
    A: ArchiveReader + ?Sized,
{
    async fn gated_consensus(&self) -> Result<ConsensusResponse, ApiError> {
        self.gate.check()?;
        Ok(self.engine.consensus_snapshot().await?.into())
    }

    async fn gated_epoch_block_range(
        &self,
        epoch: u64,
        fork: u64,
    ) -> Result<EpochRangeResponse, ApiError> {
        self.gate.check()?;
        Ok(self.engine.resolve_epoch_block_range(epoch, fork).await?.into())
    }

    async fn gated_blocks(
        &self,
        creator: &str,
        min_height: u64,
        max_height: u64,
    ) -> Result<Vec<PayoutBlock>, ApiError> {
        self.gate.check()?;
        Ok(self.engine.validate_and_fetch_blocks(creator, min_height, max_height).await?)
    }
}

#[async_trait]
impl<A> ArchiveApiServer for ArchiveRpc<A>
where
    A: ArchiveReader + ?Sized + 'static,
{
    async fn consensus(&self) -> RpcResult<ConsensusResponse> {
        debug!(target: "archive_rpc", "Received consensus request");
        Ok(self.gated_consensus().await?)
    }

    async fn epoch_block_range(
        &self,
        epoch: u64,
        fork: Option<u64>,
    ) -> RpcResult<EpochRangeResponse> {
        let fork = fork.unwrap_or_default();
        debug!(target: "archive_rpc", epoch, fork, "Received epoch block range request");
        Ok(self.gated_epoch_block_range(epoch, fork).await?)
    }

    async fn blocks(
        &self,
        creator: String,
        min_height: u64,
        max_height: u64,
    ) -> RpcResult<Vec<PayoutBlock>> {
        debug!(target: "archive_rpc", %creator, min_height, max_height, "Received blocks request");
        Ok(self.gated_blocks(&creator, min_height, max_height).await?)
    }

    async fn ledger_epoch(&self, ledger_hash: String, epoch: Option<u64>) -> RpcResult<i64> {
        debug!(target: "archive_rpc", %ledger_hash, ?epoch, "Received ledger epoch request");
        let resolved = self
            .engine
            .resolve_epoch_from_ledger_hash(&ledger_hash, epoch)
            .await
            .map_err(ApiError::from)?;
        Ok(resolved.and_then(|epoch| i64::try_from(epoch).ok()).unwrap_or(NO_EPOCH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{INCONSISTENT_ARCHIVE_CODE, NOT_FOUND_CODE, SERVICE_UNAVAILABLE_CODE};
    use jsonrpsee::types::error::INVALID_PARAMS_CODE;
    use mockall::mock;
    use mpp_archive::{
        ArchiveError, BlockSummary, EpochBlockRange, ForkRangeQuery,
        test_utils::{InMemoryArchive, TEST_CREATOR, chain},
    };
    use mpp_consensus::{EpochSchedule, ForkSchedule, SLOTS_PER_EPOCH, SlotSpan};
    use mpp_core::{TrustEvaluation, TrustReason, TrustWriter, trust_state};
    use std::collections::BTreeSet;

    mock! {
        pub Archive {}

        #[async_trait]
        impl ArchiveReader for Archive {
            async fn latest_block(&self) -> Result<BlockSummary, ArchiveError>;
            async fn missing_heights(&self, min_height: u64, max_height: u64) -> Result<BTreeSet<u64>, ArchiveError>;
            async fn null_parent_heights(&self, min_height: u64, max_height: u64) -> Result<BTreeSet<u64>, ArchiveError>;
            async fn height_range(&self, query: &ForkRangeQuery) -> Result<EpochBlockRange, ArchiveError>;
            async fn ledger_slot_span(&self, ledger_hash: &str) -> Result<Option<SlotSpan>, ArchiveError>;
            async fn canonical_blocks(&self, creator: &str, min_height: u64, max_height: u64) -> Result<Vec<PayoutBlock>, ArchiveError>;
        }
    }

    const THRESHOLD: u64 = 30;

    fn archive_rpc<A: ArchiveReader>(archive: A, trusted: bool) -> (ArchiveRpc<A>, TrustWriter) {
        let forks = ForkSchedule::new(100 * SLOTS_PER_EPOCH, 0).unwrap();
        let schedule = EpochSchedule::new(SLOTS_PER_EPOCH, forks).unwrap();
        let (writer, handle) = trust_state(trusted);
        let engine = ArchiveEngine::new(schedule, Arc::new(archive), handle.clone());
        (ArchiveRpc::new(Arc::new(engine), TrustGate::new(handle, THRESHOLD)), writer)
    }

    #[tokio::test]
    async fn test_untrusted_archive_is_never_read() {
        // Any call on the mock panics.
        let (rpc, _writer) = archive_rpc(MockArchive::new(), false);

        let err = rpc.consensus().await.unwrap_err();
        assert_eq!(err.code(), SERVICE_UNAVAILABLE_CODE);
        assert!(err.message().contains("more than 30 blocks"));

        let err = rpc.epoch_block_range(1, Some(0)).await.unwrap_err();
        assert_eq!(err.code(), SERVICE_UNAVAILABLE_CODE);

        let err = rpc.blocks(TEST_CREATOR.to_string(), 1, 10).await.unwrap_err();
        assert_eq!(err.code(), SERVICE_UNAVAILABLE_CODE);
    }

    #[tokio::test]
    async fn test_ledger_epoch_is_not_gated() {
        let mut archive = MockArchive::new();
        archive.expect_ledger_slot_span().times(1).returning(|_| Ok(None));
        let (rpc, _writer) = archive_rpc(archive, false);

        assert_eq!(rpc.ledger_epoch("jxunknown".to_string(), None).await.unwrap(), NO_EPOCH);
    }

    #[tokio::test]
    async fn test_ledger_epoch() {
        let (rpc, _writer) = archive_rpc(InMemoryArchive::with_blocks(chain(1..=10)), true);
        assert_eq!(rpc.ledger_epoch("jxstaking".to_string(), None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_gate_follows_monitor_verdict() {
        let (rpc, writer) = archive_rpc(InMemoryArchive::with_blocks(chain(1..=10)), true);
        assert_eq!(rpc.consensus().await.unwrap().block_height, 10);

        writer.record(TrustEvaluation::now(false, TrustReason::NodesUnreachable));
        assert_eq!(rpc.consensus().await.unwrap_err().code(), SERVICE_UNAVAILABLE_CODE);

        writer.record(TrustEvaluation::now(true, TrustReason::Verified));
        assert!(rpc.consensus().await.is_ok());
    }

    #[tokio::test]
    async fn test_epoch_block_range_defaults_to_first_fork() {
        let (rpc, _writer) = archive_rpc(InMemoryArchive::with_blocks(chain(1..=100)), true);

        let range = rpc.epoch_block_range(0, None).await.unwrap();
        assert_eq!((range.min_block_height, range.max_block_height), (1, 100));
        assert_eq!(range.messages.len(), 1);

        let err = rpc.epoch_block_range(5, None).await.unwrap_err();
        assert_eq!(err.code(), NOT_FOUND_CODE);

        let err = rpc.epoch_block_range(0, Some(2)).await.unwrap_err();
        assert_eq!(err.code(), INVALID_PARAMS_CODE);
        assert_eq!(err.message(), "Fork 2 not activated");
    }

    #[tokio::test]
    async fn test_blocks() {
        let (rpc, _writer) = archive_rpc(InMemoryArchive::with_blocks(chain(1..=20)), true);

        let blocks = rpc.blocks(TEST_CREATOR.to_string(), 1, 10).await.unwrap();
        assert_eq!(blocks.len(), 10);
        assert_eq!(blocks[0].height, 10);

        let err = rpc.blocks(TEST_CREATOR.to_string(), 20, 10).await.unwrap_err();
        assert_eq!(err.code(), INVALID_PARAMS_CODE);
    }

    #[tokio::test]
    async fn test_blocks_over_gap() {
        let archive = InMemoryArchive::with_blocks(chain(1..=20));
        archive.remove_height(15).await;
        let (rpc, _writer) = archive_rpc(archive, true);

        let err = rpc.blocks(TEST_CREATOR.to_string(), 10, 20).await.unwrap_err();
        assert_eq!(err.code(), INCONSISTENT_ARCHIVE_CODE);
        assert!(err.message().contains("missing blocks [15]"));
    }

    #[test]
    fn test_registered_methods() {
        let (rpc, _writer) = archive_rpc(MockArchive::new(), true);
        let module = rpc.into_rpc();
        let mut names: Vec<_> = module.method_names().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                "archive_blocks",
                "archive_consensus",
                "archive_epochBlockRange",
                "archive_ledgerEpoch",
            ]
        );
    }
}
