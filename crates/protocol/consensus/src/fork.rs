//! Hard fork schedule.

use crate::ConsensusError;
use core::fmt;

/// A Mina protocol generation delimited by hard forks.
///
/// The set is closed: every consumer that dispatches on the fork matches exhaustively, so adding
/// a fork is a compile-time checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Fork {
    /// The original chain, before the first hard fork. Slots are counted since genesis.
    Genesis = 0,
    /// The Berkeley hard fork.
    Berkeley = 1,
    /// The Mesa hard fork. Shares the Berkeley block schema.
    Mesa = 2,
}

impl Fork {
    /// Number of known forks.
    pub const COUNT: usize = 3;

    /// All forks in activation order.
    pub const ALL: [Self; Self::COUNT] = [Self::Genesis, Self::Berkeley, Self::Mesa];

    /// Returns the position of the fork in the schedule.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the fork that follows this one, if any.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Genesis => Some(Self::Berkeley),
            Self::Berkeley => Some(Self::Mesa),
            Self::Mesa => None,
        }
    }
}

impl TryFrom<u64> for Fork {
    type Error = ConsensusError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Genesis),
            1 => Ok(Self::Berkeley),
            2 => Ok(Self::Mesa),
            other => Err(ConsensusError::UnknownFork(other)),
        }
    }
}

impl fmt::Display for Fork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// The start slot (since genesis) of every fork.
///
/// Index 0 is always `0`. Every later entry is either `0`, meaning the fork is not activated yet,
/// or a slot strictly greater than the start of the previous fork. An activated fork can not
/// follow an inactive one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ForkSchedule {
    starts: [u64; Fork::COUNT],
}

impl ForkSchedule {
    /// Builds a schedule from the start slots of the forks that follow genesis.
    pub fn new(berkeley_start: u64, mesa_start: u64) -> Result<Self, ConsensusError> {
        Self::from_starts([0, berkeley_start, mesa_start])
    }

    /// Builds a schedule from the full start slot list and validates it.
    pub fn from_starts(starts: [u64; Fork::COUNT]) -> Result<Self, ConsensusError> {
        if starts[0] != 0 {
            return Err(ConsensusError::InvalidSchedule(format!(
                "genesis must start at slot 0, got {}",
                starts[0]
            )));
        }

        let mut previous = 0;
        let mut inactive_seen = false;
        for (index, start) in starts.iter().copied().enumerate().skip(1) {
            if start == 0 {
                inactive_seen = true;
                continue;
            }
            if inactive_seen {
                return Err(ConsensusError::InvalidSchedule(format!(
                    "fork {index} starts at slot {start} but an earlier fork is not activated"
                )));
            }
            if start <= previous {
                return Err(ConsensusError::InvalidSchedule(format!(
                    "fork {index} start slot {start} must be greater than fork {} start slot {previous}",
                    index - 1
                )));
            }
            previous = start;
        }

        Ok(Self { starts })
    }

    /// Returns the configured start slot of the fork, `0` when it is not activated.
    pub const fn start_slot(&self, fork: Fork) -> u64 {
        self.starts[fork.index()]
    }

    /// Returns `true` if the fork is activated. Genesis is always active.
    pub const fn is_activated(&self, fork: Fork) -> bool {
        matches!(fork, Fork::Genesis) || self.starts[fork.index()] != 0
    }

    /// Returns the start slot of the fork following `fork`, or `None` when there is no activated
    /// successor.
    pub fn next_start_slot(&self, fork: Fork) -> Option<u64> {
        fork.next().map(|next| self.start_slot(next)).filter(|start| *start != 0)
    }

    /// Ensures that `fork` may be queried.
    pub fn ensure_activated(&self, fork: Fork) -> Result<(), ConsensusError> {
        if self.is_activated(fork) { Ok(()) } else { Err(ConsensusError::ForkNotActivated(fork)) }
    }

    /// Returns the fork whose slot space contains the given since-genesis slot.
    pub fn fork_at_slot(&self, slot_since_genesis: u64) -> Fork {
        Fork::ALL
            .into_iter()
            .rev()
            .find(|fork| {
                self.is_activated(*fork) && self.start_slot(*fork) <= slot_since_genesis
            })
            .unwrap_or(Fork::Genesis)
    }
}
