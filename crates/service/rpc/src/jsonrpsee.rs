//! The jsonrpsee API definitions.

use crate::{ConsensusResponse, EpochRangeResponse, HealthResponse};
use jsonrpsee::{core::RpcResult, proc_macros::rpc};
use mpp_archive::PayoutBlock;

/// Archive queries of the payout data provider.
#[rpc(server, namespace = "archive")]
pub trait ArchiveApi {
    /// Returns the archive head placed in the epoch structure of its fork.
    ///
    /// Rejected while the archive is not trusted.
    #[method(name = "consensus")]
    async fn consensus(&self) -> RpcResult<ConsensusResponse>;

    /// Returns the canonical block heights of `epoch` in `fork`. The fork defaults to `0`.
    ///
    /// Rejected while the archive is not trusted.
    #[method(name = "epochBlockRange")]
    async fn epoch_block_range(
        &self,
        epoch: u64,
        fork: Option<u64>,
    ) -> RpcResult<EpochRangeResponse>;

    /// Returns the canonical blocks produced by `creator` between two heights, highest first.
    ///
    /// Rejected while the archive is not trusted.
    #[method(name = "blocks")]
    async fn blocks(
        &self,
        creator: String,
        min_height: u64,
        max_height: u64,
    ) -> RpcResult<Vec<PayoutBlock>>;

    /// Returns the epoch a staking ledger hash belongs to, or `-1` if no block references it.
    #[method(name = "ledgerEpoch")]
    async fn ledger_epoch(&self, ledger_hash: String, epoch: Option<u64>) -> RpcResult<i64>;
}

/// Liveness of the RPC server.
#[rpc(server)]
pub trait HealthApi {
    /// Returns `ok` together with the application version.
    #[method(name = "health")]
    async fn health(&self) -> RpcResult<HealthResponse>;
}
