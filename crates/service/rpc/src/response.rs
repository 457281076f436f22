use mpp_archive::BlockSummary;
use mpp_core::{ConsensusSnapshot, ResolvedEpochRange};
use serde::{Deserialize, Serialize};

/// Returned by `archive_ledgerEpoch` when no block references the ledger.
pub const NO_EPOCH: i64 = -1;

/// An informational note attached to a successful response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMessage {
    /// The data is valid but may still change.
    Warning(String),
}

/// Response of `archive_consensus`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusResponse {
    /// Index of the fork the head belongs to.
    pub fork: usize,
    /// Epoch of the head, counted from the start of its fork.
    pub epoch: u64,
    /// Slot of the head inside its epoch.
    pub slot: u64,
    /// Height of the head.
    pub block_height: u64,
    /// Slot of the head counted since genesis.
    pub global_slot_since_genesis: u64,
    /// Slot of the head counted since the most recent hard fork.
    pub global_slot_since_hard_fork: u64,
    /// State hash of the head.
    pub state_hash: String,
    /// State hash of the parent of the head.
    pub parent_hash: String,
    /// Staged ledger hash after the head.
    pub ledger_hash: String,
    /// Head timestamp in ISO-8601 UTC.
    pub datetime: Option<String>,
    /// Notes about the response.
    pub messages: Vec<ResponseMessage>,
}

impl From<ConsensusSnapshot> for ConsensusResponse {
    fn from(snapshot: ConsensusSnapshot) -> Self {
        let ConsensusSnapshot { position, block, datetime } = snapshot;
        let BlockSummary {
            height,
            global_slot_since_genesis,
            global_slot_since_hard_fork,
            state_hash,
            parent_hash,
            ledger_hash,
            ..
        } = block;
        Self {
            fork: position.fork.index(),
            epoch: position.epoch,
            slot: position.slot,
            block_height: height,
            global_slot_since_genesis,
            global_slot_since_hard_fork,
            state_hash,
            parent_hash,
            ledger_hash,
            datetime,
            messages: Vec::new(),
        }
    }
}

/// Response of `archive_epochBlockRange`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochRangeResponse {
    /// Lowest canonical height of the epoch.
    pub min_block_height: u64,
    /// Highest canonical height of the epoch.
    pub max_block_height: u64,
    /// Notes about the response. Carries a warning while the epoch is still in progress.
    pub messages: Vec<ResponseMessage>,
}

impl From<ResolvedEpochRange> for EpochRangeResponse {
    fn from(range: ResolvedEpochRange) -> Self {
        let mut messages = Vec::new();
        if range.in_progress {
            messages.push(ResponseMessage::Warning("Epoch is in progress".to_string()));
        }
        Self { min_block_height: range.min_height, max_block_height: range.max_height, messages }
    }
}

/// Response of `health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok` while the server answers.
    pub status: String,
    /// The application version.
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpp_consensus::Fork;

    #[test]
    fn test_in_progress_warning() {
        let range = ResolvedEpochRange {
            epoch: 4,
            fork: Fork::Berkeley,
            min_height: 10,
            max_height: 20,
            in_progress: true,
        };
        let json = serde_json::to_value(EpochRangeResponse::from(range)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "minBlockHeight": 10,
                "maxBlockHeight": 20,
                "messages": [{ "warning": "Epoch is in progress" }],
            })
        );

        let done = EpochRangeResponse::from(ResolvedEpochRange { in_progress: false, ..range });
        assert!(done.messages.is_empty());
    }
}
