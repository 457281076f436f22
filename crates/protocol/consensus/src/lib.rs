//! Mina consensus types used to interpret archive rows.
//!
//! The archive stores two slot counters per block: one counted since genesis and one counted
//! since the most recent hard fork. This crate owns the [`ForkSchedule`] that relates the two and
//! the [`EpochSchedule`] arithmetic that turns epochs into slot windows and back.
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod error;
pub use error::ConsensusError;

mod fork;
pub use fork::{Fork, ForkSchedule};

mod epoch;
pub use epoch::{EpochPosition, EpochSchedule, EpochSlotRange, SlotSpan};

/// The number of slots in a Mina epoch. The protocol constant is fixed; configuration that
/// disagrees with it is rejected.
pub const SLOTS_PER_EPOCH: u64 = 7140;

/// The global slot (since genesis) at which the Berkeley hard fork activated on mainnet.
pub const MAINNET_BERKELEY_START_SLOT: u64 = 564_480;
