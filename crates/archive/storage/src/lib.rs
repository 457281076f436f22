//! Read access to a Mina archive database.
//!
//! The archive is written by an independent process and can lag behind the network, skip heights
//! or keep orphaned rows after a reorganization. This crate exposes the [`ArchiveReader`] seam the
//! service reads through, the [`ChainConsistencyValidator`] guarding every height range before it
//! is trusted, and the canonical chain filter applied to every epoch and block query.
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod error;
pub use error::{ArchiveError, InconsistentArchive};

mod models;
pub use models::{
    Block, BlockRewards, BlockSummary, ChainGapReport, EpochBlockRange, PayoutBlock,
};

#[macro_use]
mod canonical;
pub use canonical::CanonicalChain;

mod traits;
pub use traits::ArchiveReader;

mod query;
pub use query::ForkRangeQuery;

mod consistency;
pub use consistency::ChainConsistencyValidator;

mod postgres;
pub use postgres::PgArchive;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
