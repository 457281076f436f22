//! Core logic of the payout data provider.
//!
//! Requests resolve epochs to canonical block heights through the [`ForkAwareRangeResolver`] and
//! staking ledgers to epochs through the [`EpochResolver`]. Both only answer over ranges the
//! archive holds without gaps. Independently, the [`TrustStateMonitor`] compares the archive
//! against live nodes on a timer and publishes a verdict that the [`TrustGate`] enforces on
//! recency sensitive requests.
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod error;
pub use error::EngineError;

mod range;
pub use range::ForkAwareRangeResolver;

mod epoch;
pub use epoch::EpochResolver;

mod engine;
pub use engine::{ArchiveEngine, ConsensusSnapshot, EPOCH_IN_PROGRESS_DISTANCE, ResolvedEpochRange};

mod trust;
pub use trust::{
    CheckFailures, GraphQlNodeClient, MonitorConfig, NodeHeightError, NodeHeightSource,
    TrustError, TrustEvaluation, TrustGate, TrustHandle, TrustReason, TrustStateMonitor,
    TrustWriter, trust_state,
};
