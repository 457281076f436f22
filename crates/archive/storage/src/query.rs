//! Fork specific height range queries.
//!
//! The meaning of the `global_slot_since_hard_fork` column changes with every hard fork, so each
//! fork generation gets its own query shape. Every shape only counts canonical rows.

use crate::Block;
use mpp_consensus::{EpochSlotRange, Fork, ForkSchedule};

/// Height range of the canonical blocks of the first fork generation.
pub(crate) const GENESIS_HEIGHT_RANGE: &str = concat!(
    "SELECT min(b.height) AS min_height, max(b.height) AS max_height
FROM blocks b
WHERE ",
    canonical_chain_filter!(),
    "
AND b.global_slot_since_genesis BETWEEN $1 AND $2
AND ($3::bigint IS NULL OR b.global_slot_since_genesis < $3)"
);

/// Height range of the canonical blocks of a hard fork followed by another fork.
pub(crate) const BERKELEY_HEIGHT_RANGE: &str = concat!(
    "SELECT min(b.height) AS min_height, max(b.height) AS max_height
FROM blocks b
WHERE ",
    canonical_chain_filter!(),
    "
AND b.global_slot_since_hard_fork BETWEEN $1 AND $2
AND b.global_slot_since_genesis >= $3
AND ($4::bigint IS NULL OR b.global_slot_since_genesis < $4)"
);

/// Height range of the canonical blocks of the latest hard fork.
pub(crate) const MESA_HEIGHT_RANGE: &str = concat!(
    "SELECT min(b.height) AS min_height, max(b.height) AS max_height
FROM blocks b
WHERE ",
    canonical_chain_filter!(),
    "
AND b.global_slot_since_hard_fork BETWEEN $1 AND $2
AND b.global_slot_since_genesis >= $3"
);

/// A height range lookup for one fork generation.
///
/// Each variant carries the slot window in the coordinates of its own slot column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkRangeQuery {
    /// Slots counted since genesis, capped below the start of the next fork if it is activated.
    Genesis {
        /// Window over `global_slot_since_genesis`.
        slots: EpochSlotRange,
        /// Start slot of the Berkeley fork, if activated.
        next_fork_start: Option<u64>,
    },
    /// Slots counted since the Berkeley fork.
    Berkeley {
        /// Window over `global_slot_since_hard_fork`.
        slots: EpochSlotRange,
        /// Since-genesis start slot of the fork.
        fork_start: u64,
        /// Start slot of the Mesa fork, if activated.
        next_fork_start: Option<u64>,
    },
    /// Slots counted since the Mesa fork.
    Mesa {
        /// Window over `global_slot_since_hard_fork`.
        slots: EpochSlotRange,
        /// Since-genesis start slot of the fork.
        fork_start: u64,
    },
}

impl ForkRangeQuery {
    /// Builds the lookup for a since-genesis slot window of `fork`.
    ///
    /// Returns `None` if the window ends before `fork` starts: no block of the fork can fall in it.
    pub fn new(fork: Fork, window: EpochSlotRange, forks: &ForkSchedule) -> Option<Self> {
        let fork_start = forks.start_slot(fork);
        let query = match fork {
            Fork::Genesis => {
                Self::Genesis { slots: window, next_fork_start: forks.next_start_slot(fork) }
            }
            Fork::Berkeley => Self::Berkeley {
                slots: window.since_hard_fork(fork_start)?,
                fork_start,
                next_fork_start: forks.next_start_slot(fork),
            },
            Fork::Mesa => Self::Mesa { slots: window.since_hard_fork(fork_start)?, fork_start },
        };
        Some(query)
    }

    /// Returns the fork generation queried.
    pub const fn fork(&self) -> Fork {
        match self {
            Self::Genesis { .. } => Fork::Genesis,
            Self::Berkeley { .. } => Fork::Berkeley,
            Self::Mesa { .. } => Fork::Mesa,
        }
    }

    /// Returns the slot window in the coordinates of the queried column.
    pub const fn slots(&self) -> EpochSlotRange {
        match self {
            Self::Genesis { slots, .. } | Self::Berkeley { slots, .. } | Self::Mesa { slots, .. } => {
                *slots
            }
        }
    }

    /// Returns the SQL text of the lookup.
    pub(crate) const fn sql(&self) -> &'static str {
        match self {
            Self::Genesis { .. } => GENESIS_HEIGHT_RANGE,
            Self::Berkeley { .. } => BERKELEY_HEIGHT_RANGE,
            Self::Mesa { .. } => MESA_HEIGHT_RANGE,
        }
    }

    /// Returns `true` if the block falls in the slot space of the lookup.
    ///
    /// Canonical membership is checked separately.
    pub fn matches(&self, block: &Block) -> bool {
        let since_genesis = block.global_slot_since_genesis;
        let since_hard_fork = block.global_slot_since_hard_fork;
        let below = |next: &Option<u64>| next.is_none_or(|start| since_genesis < start);
        let within = |slots: &EpochSlotRange| {
            (slots.min_slot..=slots.max_slot).contains(&since_hard_fork)
        };

        match self {
            Self::Genesis { slots, next_fork_start } => {
                (slots.min_slot..=slots.max_slot).contains(&since_genesis) &&
                    below(next_fork_start)
            }
            Self::Berkeley { slots, fork_start, next_fork_start } => {
                within(slots) && since_genesis >= *fork_start && below(next_fork_start)
            }
            Self::Mesa { slots, fork_start } => within(slots) && since_genesis >= *fork_start,
        }
    }
}
