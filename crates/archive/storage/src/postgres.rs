//! Postgres backed [`ArchiveReader`].

use crate::{
    ArchiveError, ArchiveReader, BlockRewards, BlockSummary, EpochBlockRange, ForkRangeQuery,
    PayoutBlock,
};
use async_trait::async_trait;
use mpp_consensus::SlotSpan;
use sqlx::{
    PgPool, Row,
    postgres::{PgPoolOptions, PgRow},
};
use std::collections::BTreeSet;
use tracing::{debug, info, trace};

const LATEST_BLOCK: &str = "
SELECT
    height,
    global_slot_since_genesis,
    global_slot_since_hard_fork,
    state_hash,
    parent_hash,
    ledger_hash,
    cast(timestamp AS bigint) AS timestamp
FROM blocks
ORDER BY height DESC, id DESC
LIMIT 1";

const MISSING_HEIGHTS: &str = "
SELECT h AS height
FROM generate_series($1::bigint, $2::bigint) h
LEFT JOIN blocks b ON b.height = h
WHERE b.height IS NULL
ORDER BY h";

const NULL_PARENT_HEIGHTS: &str = "
SELECT DISTINCT height
FROM blocks
WHERE parent_id IS NULL AND height BETWEEN $1 AND $2 AND height > 1
ORDER BY height";

const LEDGER_SLOT_SPAN: &str = "
SELECT
    min(b.global_slot_since_hard_fork) AS min_slot,
    max(b.global_slot_since_hard_fork) AS max_slot
FROM blocks b
INNER JOIN epoch_data ed ON b.staking_epoch_data_id = ed.id
INNER JOIN snarked_ledger_hashes slh ON ed.ledger_hash_id = slh.id
WHERE slh.value = $1";

const CANONICAL_BLOCKS: &str = concat!(
    "
WITH block_range AS (
    SELECT min(b.id) AS min_id, max(b.id) AS max_id
    FROM blocks b
    INNER JOIN public_keys pk ON b.creator_id = pk.id
    WHERE pk.value = $1 AND b.height BETWEEN $2 AND $3
),
internal AS (
    SELECT
        bic.block_id,
        cast(sum(CASE WHEN ic.command_type = 'coinbase' THEN cast(ic.fee AS bigint) ELSE 0 END) AS bigint) AS coinbase,
        cast(sum(CASE WHEN ic.command_type = 'fee_transfer_via_coinbase' THEN cast(ic.fee AS bigint) ELSE 0 END) AS bigint) AS fee_transfer_via_coinbase,
        max(CASE WHEN ic.command_type = 'coinbase' THEN ic.receiver_id END) AS coinbase_receiver_id
    FROM blocks_internal_commands bic
    INNER JOIN internal_commands ic ON bic.internal_command_id = ic.id
    WHERE bic.block_id BETWEEN (SELECT min_id FROM block_range) AND (SELECT max_id FROM block_range)
    GROUP BY bic.block_id
),
fee_transfers AS (
    SELECT
        bic.block_id,
        ic.receiver_id,
        cast(sum(CASE WHEN ic.command_type = 'fee_transfer' THEN cast(ic.fee AS bigint) ELSE 0 END) AS bigint) AS fee_transfer_to_receiver
    FROM blocks_internal_commands bic
    INNER JOIN internal_commands ic ON bic.internal_command_id = ic.id
    WHERE bic.block_id BETWEEN (SELECT min_id FROM block_range) AND (SELECT max_id FROM block_range)
    GROUP BY bic.block_id, ic.receiver_id
),
user_fees AS (
    SELECT
        buc.block_id,
        cast(sum(cast(uc.fee AS bigint)) AS bigint) AS user_command_fees
    FROM blocks_user_commands buc
    INNER JOIN user_commands uc ON buc.user_command_id = uc.id
    WHERE buc.block_id BETWEEN (SELECT min_id FROM block_range) AND (SELECT max_id FROM block_range)
    GROUP BY buc.block_id
)
SELECT
    b.height,
    b.state_hash,
    slh.value AS staking_ledger_hash,
    cast(b.timestamp AS bigint) AS timestamp,
    b.global_slot_since_hard_fork,
    b.global_slot_since_genesis,
    pkc.value AS creator,
    pkw.value AS winner,
    pkr.value AS coinbase_receiver,
    coalesce(i.coinbase, 0) AS coinbase,
    coalesce(ft.fee_transfer_to_receiver, 0) AS fee_transfer_to_receiver,
    coalesce(i.fee_transfer_via_coinbase, 0) AS fee_transfer_via_coinbase,
    coalesce(uf.user_command_fees, 0) AS user_command_fees
FROM blocks b
INNER JOIN public_keys pkc ON b.creator_id = pkc.id
INNER JOIN public_keys pkw ON b.block_winner_id = pkw.id
INNER JOIN epoch_data ed ON b.staking_epoch_data_id = ed.id
INNER JOIN snarked_ledger_hashes slh ON ed.ledger_hash_id = slh.id
LEFT JOIN internal i ON i.block_id = b.id
LEFT JOIN public_keys pkr ON pkr.id = i.coinbase_receiver_id
LEFT JOIN fee_transfers ft ON ft.block_id = b.id AND ft.receiver_id = i.coinbase_receiver_id
LEFT JOIN user_fees uf ON uf.block_id = b.id
WHERE ",
    canonical_chain_filter!(),
    "
AND pkc.value = $1
AND b.height BETWEEN $2 AND $3
ORDER BY b.height DESC"
);

/// An [`ArchiveReader`] over a Mina archive Postgres database.
///
/// Every statement is a single read. No transaction is opened.
#[derive(Debug, Clone)]
pub struct PgArchive {
    pool: PgPool,
}

impl PgArchive {
    /// Creates a new [`PgArchive`] from an existing pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool of at most `max_connections` to the archive at `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, ArchiveError> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
        info!(target: "archive", max_connections, "Connected to archive database");
        Ok(Self::new(pool))
    }

    /// Returns the underlying pool.
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ArchiveReader for PgArchive {
    async fn latest_block(&self) -> Result<BlockSummary, ArchiveError> {
        let row =
            sqlx::query(LATEST_BLOCK).fetch_optional(&self.pool).await?.ok_or(ArchiveError::Empty)?;

        let summary = BlockSummary {
            height: column(&row, "height")?,
            global_slot_since_genesis: column(&row, "global_slot_since_genesis")?,
            global_slot_since_hard_fork: column(&row, "global_slot_since_hard_fork")?,
            state_hash: row.try_get("state_hash")?,
            parent_hash: row.try_get("parent_hash")?,
            ledger_hash: row.try_get("ledger_hash")?,
            timestamp: column(&row, "timestamp")?,
        };
        trace!(target: "archive", height = summary.height, "Read latest block");
        Ok(summary)
    }

    async fn missing_heights(
        &self,
        min_height: u64,
        max_height: u64,
    ) -> Result<BTreeSet<u64>, ArchiveError> {
        let rows = sqlx::query(MISSING_HEIGHTS)
            .bind(parameter("min_height", min_height)?)
            .bind(parameter("max_height", max_height)?)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(|row| column(row, "height")).collect()
    }

    async fn null_parent_heights(
        &self,
        min_height: u64,
        max_height: u64,
    ) -> Result<BTreeSet<u64>, ArchiveError> {
        let rows = sqlx::query(NULL_PARENT_HEIGHTS)
            .bind(parameter("min_height", min_height)?)
            .bind(parameter("max_height", max_height)?)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(|row| column(row, "height")).collect()
    }

    async fn height_range(&self, query: &ForkRangeQuery) -> Result<EpochBlockRange, ArchiveError> {
        let slots = query.slots();
        let statement = sqlx::query(query.sql())
            .bind(parameter("min_slot", slots.min_slot)?)
            .bind(parameter("max_slot", slots.max_slot)?);

        let statement = match query {
            ForkRangeQuery::Genesis { next_fork_start, .. } => {
                statement.bind(optional_parameter("next_fork_start", *next_fork_start)?)
            }
            ForkRangeQuery::Berkeley { fork_start, next_fork_start, .. } => statement
                .bind(parameter("fork_start", *fork_start)?)
                .bind(optional_parameter("next_fork_start", *next_fork_start)?),
            ForkRangeQuery::Mesa { fork_start, .. } => {
                statement.bind(parameter("fork_start", *fork_start)?)
            }
        };

        let row = statement.fetch_one(&self.pool).await?;
        let range = EpochBlockRange {
            min_height: optional_column(&row, "min_height")?,
            max_height: optional_column(&row, "max_height")?,
        };
        debug!(
            target: "archive",
            fork = %query.fork(),
            slots = %slots,
            min_height = ?range.min_height,
            max_height = ?range.max_height,
            "Resolved canonical height range"
        );
        Ok(range)
    }

    async fn ledger_slot_span(&self, ledger_hash: &str) -> Result<Option<SlotSpan>, ArchiveError> {
        let row = sqlx::query(LEDGER_SLOT_SPAN).bind(ledger_hash).fetch_one(&self.pool).await?;
        let min_slot = optional_column(&row, "min_slot")?;
        let max_slot = optional_column(&row, "max_slot")?;
        Ok(min_slot.zip(max_slot).map(|(min_slot, max_slot)| SlotSpan { min_slot, max_slot }))
    }

    async fn canonical_blocks(
        &self,
        creator: &str,
        min_height: u64,
        max_height: u64,
    ) -> Result<Vec<PayoutBlock>, ArchiveError> {
        let rows = sqlx::query(CANONICAL_BLOCKS)
            .bind(creator)
            .bind(parameter("min_height", min_height)?)
            .bind(parameter("max_height", max_height)?)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(payout_block).collect()
    }
}

fn payout_block(row: &PgRow) -> Result<PayoutBlock, ArchiveError> {
    Ok(PayoutBlock {
        height: column(row, "height")?,
        state_hash: row.try_get("state_hash")?,
        staking_ledger_hash: row.try_get("staking_ledger_hash")?,
        timestamp: column(row, "timestamp")?,
        global_slot_since_hard_fork: column(row, "global_slot_since_hard_fork")?,
        global_slot_since_genesis: column(row, "global_slot_since_genesis")?,
        creator: row.try_get("creator")?,
        winner: row.try_get("winner")?,
        rewards: BlockRewards {
            coinbase_receiver: row.try_get("coinbase_receiver")?,
            coinbase: column(row, "coinbase")?,
            fee_transfer_to_receiver: column(row, "fee_transfer_to_receiver")?,
            fee_transfer_via_coinbase: column(row, "fee_transfer_via_coinbase")?,
            user_command_fees: column(row, "user_command_fees")?,
        },
    })
}

/// Reads a non-null `bigint` column as an unsigned value.
fn column(row: &PgRow, name: &'static str) -> Result<u64, ArchiveError> {
    let value: i64 = row.try_get(name)?;
    u64::try_from(value).map_err(|_| ArchiveError::ColumnOutOfRange { column: name, value })
}

/// Reads a nullable `bigint` column as an unsigned value.
fn optional_column(row: &PgRow, name: &'static str) -> Result<Option<u64>, ArchiveError> {
    let value: Option<i64> = row.try_get(name)?;
    value
        .map(|value| {
            u64::try_from(value).map_err(|_| ArchiveError::ColumnOutOfRange { column: name, value })
        })
        .transpose()
}

fn parameter(name: &'static str, value: u64) -> Result<i64, ArchiveError> {
    i64::try_from(value).map_err(|_| ArchiveError::ParameterOutOfRange { name, value })
}

fn optional_parameter(name: &'static str, value: Option<u64>) -> Result<Option<i64>, ArchiveError> {
    value.map(|value| parameter(name, value)).transpose()
}
