//! Rows and reports read from the archive.

use crate::InconsistentArchive;
use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The only height that may be missing from a range starting at genesis.
const GENESIS_MISSING_HEIGHT: u64 = 0;

/// The only height that may lack a parent in a range starting at genesis.
const GENESIS_NULL_PARENT_HEIGHT: u64 = 1;

/// Rewards and fees attributed to a block, in nanomina.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRewards {
    /// The public key that received the coinbase, if the block paid one.
    pub coinbase_receiver: Option<String>,
    /// The coinbase amount.
    pub coinbase: u64,
    /// Fee transfers paid to the coinbase receiver.
    pub fee_transfer_to_receiver: u64,
    /// Fee transfers paid out of the coinbase.
    pub fee_transfer_via_coinbase: u64,
    /// Sum of the user command fees included in the block.
    pub user_command_fees: u64,
}

/// A block row as written by the archive ingester.
///
/// Several rows may share a height while competing forks settle. Only the rows reachable from
/// the highest block through `parent_id` belong to the canonical chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Row identifier.
    pub id: i64,
    /// Row identifier of the parent block. `None` is only valid at the genesis height.
    pub parent_id: Option<i64>,
    /// Block height.
    pub height: u64,
    /// State hash of the block.
    pub state_hash: String,
    /// State hash of the parent block.
    pub parent_hash: String,
    /// Staged ledger hash after the block.
    pub ledger_hash: String,
    /// Snarked ledger hash of the staking epoch the block was produced in.
    pub staking_ledger_hash: String,
    /// Public key of the block producer.
    pub creator: String,
    /// Public key of the slot winner.
    pub winner: String,
    /// Slot counted since genesis.
    pub global_slot_since_genesis: u64,
    /// Slot counted since the most recent hard fork.
    pub global_slot_since_hard_fork: u64,
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
    /// Rewards paid by the block.
    pub rewards: BlockRewards,
}

impl Block {
    /// Returns the [`BlockSummary`] of this block.
    pub fn summary(&self) -> BlockSummary {
        BlockSummary {
            height: self.height,
            global_slot_since_genesis: self.global_slot_since_genesis,
            global_slot_since_hard_fork: self.global_slot_since_hard_fork,
            state_hash: self.state_hash.clone(),
            parent_hash: self.parent_hash.clone(),
            ledger_hash: self.ledger_hash.clone(),
            timestamp: self.timestamp,
        }
    }

    /// Returns the [`PayoutBlock`] view of this block.
    pub fn payout(&self) -> PayoutBlock {
        PayoutBlock {
            height: self.height,
            state_hash: self.state_hash.clone(),
            staking_ledger_hash: self.staking_ledger_hash.clone(),
            timestamp: self.timestamp,
            global_slot_since_hard_fork: self.global_slot_since_hard_fork,
            global_slot_since_genesis: self.global_slot_since_genesis,
            creator: self.creator.clone(),
            winner: self.winner.clone(),
            rewards: self.rewards.clone(),
        }
    }
}

/// The head of the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSummary {
    /// Block height.
    pub height: u64,
    /// Slot counted since genesis.
    pub global_slot_since_genesis: u64,
    /// Slot counted since the most recent hard fork.
    pub global_slot_since_hard_fork: u64,
    /// State hash of the block.
    pub state_hash: String,
    /// State hash of the parent block.
    pub parent_hash: String,
    /// Staged ledger hash after the block.
    pub ledger_hash: String,
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
}

impl BlockSummary {
    /// Formats the block timestamp as an ISO-8601 UTC string with millisecond precision.
    pub fn datetime(&self) -> Option<String> {
        let millis = i64::try_from(self.timestamp).ok()?;
        DateTime::from_timestamp_millis(millis)
            .map(|datetime| datetime.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

/// A canonical block with everything a payout calculation needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutBlock {
    /// Block height.
    pub height: u64,
    /// State hash of the block.
    pub state_hash: String,
    /// Snarked ledger hash of the staking epoch.
    pub staking_ledger_hash: String,
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
    /// Slot counted since the most recent hard fork.
    pub global_slot_since_hard_fork: u64,
    /// Slot counted since genesis.
    pub global_slot_since_genesis: u64,
    /// Public key of the block producer.
    pub creator: String,
    /// Public key of the slot winner.
    pub winner: String,
    /// Rewards paid by the block.
    #[serde(flatten)]
    pub rewards: BlockRewards,
}

/// The canonical block heights covering a slot window.
///
/// Both bounds are `None` when no canonical block falls in the window yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochBlockRange {
    /// Lowest canonical height in the window.
    pub min_height: Option<u64>,
    /// Highest canonical height in the window.
    pub max_height: Option<u64>,
}

impl EpochBlockRange {
    /// Creates a range from both bounds.
    pub const fn new(min_height: u64, max_height: u64) -> Self {
        Self { min_height: Some(min_height), max_height: Some(max_height) }
    }

    /// Returns both bounds if the window holds any block.
    pub const fn bounds(&self) -> Option<(u64, u64)> {
        match (self.min_height, self.max_height) {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        }
    }

    /// Returns `true` if the window holds no block.
    pub const fn is_empty(&self) -> bool {
        self.bounds().is_none()
    }
}

/// Missing heights and null parent heights found in `[min_height, max_height]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainGapReport {
    /// Lower bound of the checked range.
    pub min_height: u64,
    /// Upper bound of the checked range.
    pub max_height: u64,
    /// Heights without any block row.
    pub missing: BTreeSet<u64>,
    /// Heights whose block has no parent link.
    pub null_parents: BTreeSet<u64>,
}

impl ChainGapReport {
    /// Returns `true` if no missing height is found outside the genesis allowance.
    pub fn missing_tolerated(&self) -> bool {
        within_genesis_allowance(self.min_height, &self.missing, GENESIS_MISSING_HEIGHT)
    }

    /// Returns `true` if no null parent is found outside the genesis allowance.
    pub fn null_parents_tolerated(&self) -> bool {
        within_genesis_allowance(self.min_height, &self.null_parents, GENESIS_NULL_PARENT_HEIGHT)
    }

    /// Returns `true` if the range can be trusted.
    pub fn is_consistent(&self) -> bool {
        self.missing_tolerated() && self.null_parents_tolerated()
    }

    /// Converts the report into an error if the range can not be trusted.
    pub fn into_result(self) -> Result<(), InconsistentArchive> {
        if self.is_consistent() {
            return Ok(());
        }
        Err(InconsistentArchive {
            min_height: self.min_height,
            max_height: self.max_height,
            missing: self.missing,
            null_parents: self.null_parents,
        })
    }
}

/// A range starting above genesis tolerates nothing. A range starting at genesis tolerates at
/// most one entry, and only the given genesis height.
fn within_genesis_allowance(min_height: u64, heights: &BTreeSet<u64>, allowed: u64) -> bool {
    if min_height > 0 {
        return heights.is_empty();
    }
    match heights.len() {
        0 => true,
        1 => heights.contains(&allowed),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn report(min_height: u64, missing: &[u64], null_parents: &[u64]) -> ChainGapReport {
        ChainGapReport {
            min_height,
            max_height: min_height + 100,
            missing: missing.iter().copied().collect(),
            null_parents: null_parents.iter().copied().collect(),
        }
    }

    #[rstest]
    #[case::clean(0, &[], &[])]
    #[case::genesis_height_missing(0, &[0], &[])]
    #[case::genesis_null_parent(0, &[], &[1])]
    #[case::both_genesis_allowances(0, &[0], &[1])]
    #[case::clean_above_genesis(10, &[], &[])]
    fn test_consistent_ranges(
        #[case] min_height: u64,
        #[case] missing: &[u64],
        #[case] null_parents: &[u64],
    ) {
        let report = report(min_height, missing, null_parents);
        assert!(report.is_consistent());
        assert_eq!(report.into_result(), Ok(()));
    }

    #[rstest]
    #[case::genesis_wrong_missing(0, &[5], &[])]
    #[case::genesis_two_missing(0, &[0, 5], &[])]
    #[case::genesis_wrong_null_parent(0, &[], &[2])]
    #[case::genesis_two_null_parents(0, &[], &[1, 7])]
    #[case::missing_above_genesis(1, &[1], &[])]
    #[case::null_parent_above_genesis(2, &[], &[50])]
    #[case::both_above_genesis(20, &[21, 22], &[40])]
    fn test_inconsistent_ranges(
        #[case] min_height: u64,
        #[case] missing: &[u64],
        #[case] null_parents: &[u64],
    ) {
        let report = report(min_height, missing, null_parents);
        assert!(!report.is_consistent());

        let err = report.clone().into_result().unwrap_err();
        assert_eq!(err.missing, report.missing);
        assert_eq!(err.null_parents, report.null_parents);
        assert_eq!(err.min_height, min_height);
    }

    #[test]
    fn test_genesis_allowance_is_per_list() {
        let report = report(0, &[0], &[1, 2]);
        assert!(report.missing_tolerated());
        assert!(!report.null_parents_tolerated());
    }

    #[rstest]
    #[case(0, Some("1970-01-01T00:00:00.000Z"))]
    #[case(1_718_000_000_123, Some("2024-06-10T06:13:20.123Z"))]
    #[case(u64::MAX, None)]
    fn test_summary_datetime(#[case] timestamp: u64, #[case] expected: Option<&str>) {
        let summary = BlockSummary {
            height: 1,
            global_slot_since_genesis: 0,
            global_slot_since_hard_fork: 0,
            state_hash: String::new(),
            parent_hash: String::new(),
            ledger_hash: String::new(),
            timestamp,
        };
        assert_eq!(summary.datetime().as_deref(), expected);
    }

    #[test]
    fn test_epoch_block_range_bounds() {
        assert!(EpochBlockRange::default().is_empty());
        assert_eq!(EpochBlockRange::new(3, 9).bounds(), Some((3, 9)));
        let half = EpochBlockRange { min_height: Some(3), max_height: None };
        assert!(half.is_empty());
    }

    #[test]
    fn test_payout_block_serializes_flat() {
        let block = PayoutBlock {
            height: 7,
            state_hash: "3NK".to_string(),
            staking_ledger_hash: "jx".to_string(),
            timestamp: 0,
            global_slot_since_hard_fork: 1,
            global_slot_since_genesis: 2,
            creator: "B62creator".to_string(),
            winner: "B62winner".to_string(),
            rewards: BlockRewards { coinbase: 720_000_000_000, ..Default::default() },
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["coinbase"], 720_000_000_000u64);
        assert_eq!(json["stakingLedgerHash"], "jx");
        assert!(json.get("rewards").is_none());
    }
}
