//! Error types for consensus arithmetic.

use crate::Fork;
use thiserror::Error;

/// Errors raised while validating a fork schedule or resolving epochs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusError {
    /// The requested fork index is not one of the known forks.
    #[error("Fork {0} not supported")]
    UnknownFork(u64),

    /// The fork is known but its start slot is still unset.
    #[error("Fork {0} not activated")]
    ForkNotActivated(Fork),

    /// The fork schedule violates the ordering invariant.
    #[error("invalid fork schedule: {0}")]
    InvalidSchedule(String),

    /// The configured slots per epoch does not match the protocol constant.
    #[error("slots per epoch is expected to be {expected}, got {actual}")]
    UnexpectedSlotsPerEpoch {
        /// The protocol constant.
        expected: u64,
        /// The configured value.
        actual: u64,
    },

    /// The epoch is too large to be represented as a slot window.
    #[error("epoch {0} is out of range")]
    EpochOutOfRange(u64),

    /// The slots referencing a ledger span more than one epoch and no valid hint was given.
    #[error(
        "ambiguous epoch: slots {min_slot}..={max_slot} span epoch {epoch} to {next_epoch} (user specified epoch: {user_specified_epoch:?})"
    )]
    AmbiguousEpoch {
        /// The epoch containing the lowest slot.
        epoch: u64,
        /// The epoch boundary above the highest slot.
        next_epoch: u64,
        /// The epoch hint supplied by the caller, if any.
        user_specified_epoch: Option<u64>,
        /// The lowest referencing slot.
        min_slot: u64,
        /// The highest referencing slot.
        max_slot: u64,
    },
}
