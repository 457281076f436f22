//! JSON-RPC API of the payout data provider.
//!
//! Recency sensitive methods go through the [`TrustGate`](mpp_core::TrustGate) before they touch
//! the archive. Lookups of fixed historical data and the health method are always served.
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod jsonrpsee;
pub use jsonrpsee::{ArchiveApiServer, HealthApiServer};

mod error;
pub use error::{
    AMBIGUOUS_EPOCH_CODE, ApiError, INCONSISTENT_ARCHIVE_CODE, NOT_FOUND_CODE,
    SERVICE_UNAVAILABLE_CODE,
};

mod response;
pub use response::{
    ConsensusResponse, EpochRangeResponse, HealthResponse, NO_EPOCH, ResponseMessage,
};

mod archive;
pub use archive::ArchiveRpc;

mod health;
pub use health::HealthRpc;
