use mpp_archive::ArchiveError;
use mpp_consensus::{ConsensusError, Fork};
use thiserror::Error;

/// Errors returned to request handlers.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The fork or epoch can not be resolved.
    #[error(transparent)]
    Consensus(#[from] ConsensusError),

    /// Reading the archive failed or the archive is inconsistent.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// The archive holds no canonical block in the epoch yet.
    #[error("epoch {epoch} of fork {fork} has no blocks in the archive yet")]
    EpochNotReached {
        /// The requested epoch.
        epoch: u64,
        /// The requested fork.
        fork: Fork,
    },

    /// The lower bound of a height range is above its upper bound.
    #[error("invalid height range: min height {min_height} is above max height {max_height}")]
    InvalidHeightRange {
        /// Lower bound.
        min_height: u64,
        /// Upper bound.
        max_height: u64,
    },
}
