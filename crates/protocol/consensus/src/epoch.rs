//! Epoch and slot arithmetic across hard forks.

use crate::{ConsensusError, Fork, ForkSchedule, SLOTS_PER_EPOCH};
use derive_more::Display;

/// The inclusive window of since-genesis slots covered by one epoch of one fork.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[display("{min_slot}..={max_slot}")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EpochSlotRange {
    /// First slot of the epoch.
    pub min_slot: u64,
    /// Last slot of the epoch.
    pub max_slot: u64,
}

impl EpochSlotRange {
    /// Re-expresses the window relative to a fork start slot.
    ///
    /// Blocks produced after a hard fork count their slot from the fork start, so a window in
    /// since-genesis coordinates has to be shifted before it can be compared to that column.
    /// Returns `None` if the window ends before the fork starts. A window straddling the start is
    /// clipped to it.
    pub const fn since_hard_fork(&self, fork_start_slot: u64) -> Option<Self> {
        if self.max_slot < fork_start_slot {
            return None;
        }
        Some(Self {
            min_slot: self.min_slot.saturating_sub(fork_start_slot),
            max_slot: self.max_slot - fork_start_slot,
        })
    }
}

/// The lowest and highest slot observed for a set of blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSpan {
    /// The lowest slot.
    pub min_slot: u64,
    /// The highest slot.
    pub max_slot: u64,
}

/// Where a slot falls inside the epoch structure of its fork.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EpochPosition {
    /// The fork whose slot space contains the slot.
    pub fork: Fork,
    /// The epoch, counted from the start of the fork.
    pub epoch: u64,
    /// The slot inside the epoch. Always less than the slots per epoch.
    pub slot: u64,
}

/// Epoch length together with the fork schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochSchedule {
    slots_per_epoch: u64,
    forks: ForkSchedule,
}

impl EpochSchedule {
    /// Creates a new [`EpochSchedule`], rejecting any epoch length other than the protocol's.
    pub const fn new(slots_per_epoch: u64, forks: ForkSchedule) -> Result<Self, ConsensusError> {
        if slots_per_epoch != SLOTS_PER_EPOCH {
            return Err(ConsensusError::UnexpectedSlotsPerEpoch {
                expected: SLOTS_PER_EPOCH,
                actual: slots_per_epoch,
            });
        }
        Ok(Self { slots_per_epoch, forks })
    }

    /// Returns the number of slots in an epoch.
    pub const fn slots_per_epoch(&self) -> u64 {
        self.slots_per_epoch
    }

    /// Returns the fork schedule.
    pub const fn forks(&self) -> &ForkSchedule {
        &self.forks
    }

    /// Computes the since-genesis slot window of `epoch` within `fork`.
    ///
    /// The window is offset by the start slot of the fork; for [`Fork::Genesis`] the offset is
    /// zero. Fails if the fork is not activated.
    pub fn slot_window(&self, epoch: u64, fork: Fork) -> Result<EpochSlotRange, ConsensusError> {
        self.forks.ensure_activated(fork)?;
        let offset = self.forks.start_slot(fork);

        let window = || {
            let min_slot = offset.checked_add(self.slots_per_epoch.checked_mul(epoch)?)?;
            let max_slot = offset
                .checked_add(self.slots_per_epoch.checked_mul(epoch.checked_add(1)?)?)?
                .checked_sub(1)?;
            Some(EpochSlotRange { min_slot, max_slot })
        };
        window().ok_or(ConsensusError::EpochOutOfRange(epoch))
    }

    /// Determines the epoch a staking ledger belongs to from the span of slots of the blocks
    /// that reference it.
    ///
    /// The genesis ledger is the staking ledger of both epoch 0 and epoch 1, so when the span
    /// starts in epoch 0 and covers more than one epoch the caller's hint decides, as long as it
    /// is 0 or 1. Any other multi-epoch span is rejected.
    pub fn epoch_from_slot_span(
        &self,
        span: SlotSpan,
        user_specified_epoch: Option<u64>,
    ) -> Result<u64, ConsensusError> {
        let SlotSpan { min_slot, max_slot } = span;
        let epoch = min_slot / self.slots_per_epoch;
        let next_epoch = max_slot.div_ceil(self.slots_per_epoch);

        if epoch + 1 == next_epoch {
            return Ok(epoch);
        }

        match user_specified_epoch {
            Some(hint @ (0 | 1)) if epoch == 0 => Ok(hint),
            _ => Err(ConsensusError::AmbiguousEpoch {
                epoch,
                next_epoch,
                user_specified_epoch,
                min_slot,
                max_slot,
            }),
        }
    }

    /// Locates a block inside the epoch structure of its fork.
    pub fn position(&self, slot_since_genesis: u64, slot_since_hard_fork: u64) -> EpochPosition {
        let fork = self.forks.fork_at_slot(slot_since_genesis);
        // Before the first fork both counters are the same.
        let slot = match fork {
            Fork::Genesis => slot_since_genesis,
            Fork::Berkeley | Fork::Mesa => slot_since_hard_fork,
        };
        EpochPosition {
            fork,
            epoch: slot / self.slots_per_epoch,
            slot: slot % self.slots_per_epoch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAINNET_BERKELEY_START_SLOT;
    use rstest::rstest;

    fn schedule(mesa: u64) -> EpochSchedule {
        let forks = ForkSchedule::new(MAINNET_BERKELEY_START_SLOT, mesa).unwrap();
        EpochSchedule::new(SLOTS_PER_EPOCH, forks).unwrap()
    }

    #[test]
    fn test_rejects_unknown_epoch_length() {
        let forks = ForkSchedule::new(MAINNET_BERKELEY_START_SLOT, 0).unwrap();
        assert_eq!(
            EpochSchedule::new(7000, forks),
            Err(ConsensusError::UnexpectedSlotsPerEpoch { expected: 7140, actual: 7000 })
        );
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(10)]
    #[case(78)]
    fn test_genesis_window_has_no_offset(#[case] epoch: u64) {
        let window = schedule(0).slot_window(epoch, Fork::Genesis).unwrap();
        assert_eq!(window.min_slot, SLOTS_PER_EPOCH * epoch);
        assert_eq!(window.max_slot, SLOTS_PER_EPOCH * (epoch + 1) - 1);
    }

    #[test]
    fn test_berkeley_window_is_offset() {
        let window = schedule(0).slot_window(2, Fork::Berkeley).unwrap();
        assert_eq!(window.min_slot, MAINNET_BERKELEY_START_SLOT + 2 * SLOTS_PER_EPOCH);
        assert_eq!(window.max_slot, MAINNET_BERKELEY_START_SLOT + 3 * SLOTS_PER_EPOCH - 1);

        let relative = window.since_hard_fork(MAINNET_BERKELEY_START_SLOT);
        assert_eq!(relative, Some(EpochSlotRange { min_slot: 14_280, max_slot: 21_419 }));
    }

    #[rstest]
    #[case::before_fork(EpochSlotRange { min_slot: 0, max_slot: 50 }, None)]
    #[case::ends_one_before(EpochSlotRange { min_slot: 90, max_slot: 99 }, None)]
    #[case::ends_at_start(
        EpochSlotRange { min_slot: 90, max_slot: 100 },
        Some(EpochSlotRange { min_slot: 0, max_slot: 0 })
    )]
    #[case::straddles_start(
        EpochSlotRange { min_slot: 50, max_slot: 150 },
        Some(EpochSlotRange { min_slot: 0, max_slot: 50 })
    )]
    fn test_since_hard_fork(#[case] window: EpochSlotRange, #[case] expected: Option<EpochSlotRange>) {
        assert_eq!(window.since_hard_fork(100), expected);
    }

    #[test]
    fn test_inactive_fork_window() {
        assert_eq!(
            schedule(0).slot_window(0, Fork::Mesa),
            Err(ConsensusError::ForkNotActivated(Fork::Mesa))
        );
        assert!(schedule(1_000_000).slot_window(0, Fork::Mesa).is_ok());
    }

    #[test]
    fn test_window_overflow() {
        assert_eq!(
            schedule(0).slot_window(u64::MAX, Fork::Genesis),
            Err(ConsensusError::EpochOutOfRange(u64::MAX))
        );
    }

    #[rstest]
    #[case::single_epoch(72_000, 75_000, None, 10)]
    #[case::epoch_start(71_400, 72_000, None, 10)]
    #[case::epoch_end(72_000, 78_539, None, 10)]
    #[case::genesis_single_epoch(0, 5_000, Some(0), 0)]
    #[case::genesis_hint_zero(0, 14_279, Some(0), 0)]
    #[case::genesis_hint_one(0, 14_279, Some(1), 1)]
    #[case::genesis_hint_one_wide(0, 14_280, Some(1), 1)]
    fn test_epoch_from_slot_span(
        #[case] min_slot: u64,
        #[case] max_slot: u64,
        #[case] hint: Option<u64>,
        #[case] expected: u64,
    ) {
        let epoch =
            schedule(0).epoch_from_slot_span(SlotSpan { min_slot, max_slot }, hint).unwrap();
        assert_eq!(epoch, expected);
    }

    #[test]
    fn test_epoch_from_slot_span_is_idempotent() {
        let span = SlotSpan { min_slot: 72_000, max_slot: 75_000 };
        let schedule = schedule(0);
        assert_eq!(
            schedule.epoch_from_slot_span(span, None),
            schedule.epoch_from_slot_span(span, None)
        );
    }

    #[test]
    fn test_ambiguous_span_outside_genesis() {
        let err = schedule(0)
            .epoch_from_slot_span(SlotSpan { min_slot: 71_399, max_slot: 85_680 }, Some(1))
            .unwrap_err();
        assert_eq!(
            err,
            ConsensusError::AmbiguousEpoch {
                epoch: 9,
                next_epoch: 12,
                user_specified_epoch: Some(1),
                min_slot: 71_399,
                max_slot: 85_680,
            }
        );
    }

    #[rstest]
    #[case::no_hint(None)]
    #[case::hint_two(Some(2))]
    fn test_genesis_span_needs_valid_hint(#[case] hint: Option<u64>) {
        let span = SlotSpan { min_slot: 0, max_slot: 2 * SLOTS_PER_EPOCH - 1 };
        assert!(matches!(
            schedule(0).epoch_from_slot_span(span, hint),
            Err(ConsensusError::AmbiguousEpoch { epoch: 0, next_epoch: 2, .. })
        ));
    }

    #[rstest]
    #[case::genesis(100_000, 100_000, Fork::Genesis, 14, 100_000 - 14 * 7140)]
    #[case::berkeley(564_480 + 7_145, 7_145, Fork::Berkeley, 1, 5)]
    fn test_position(
        #[case] since_genesis: u64,
        #[case] since_hard_fork: u64,
        #[case] fork: Fork,
        #[case] epoch: u64,
        #[case] slot: u64,
    ) {
        let position = schedule(0).position(since_genesis, since_hard_fork);
        assert_eq!(position, EpochPosition { fork, epoch, slot });
        assert!(position.slot < SLOTS_PER_EPOCH);
    }
}
