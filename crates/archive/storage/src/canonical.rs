//! Canonical chain membership.
//!
//! After a reorganization the archive keeps orphaned rows that share a height with the canonical
//! block. Every height bounded query only counts rows reachable from the current maximal height
//! by following parent links. The Postgres backend embeds the walk as a recursive `EXISTS` filter;
//! [`CanonicalChain`] performs the same walk over rows held in memory.

use crate::Block;
use std::collections::{HashMap, HashSet};

/// SQL predicate restricting the row aliased `b` to the chain ending at the maximal height.
///
/// Evaluated against the current maximal height on every execution.
macro_rules! canonical_chain_filter {
    () => {
        "EXISTS (
    WITH RECURSIVE chain AS (
        SELECT id, parent_id
        FROM blocks
        WHERE height = (SELECT max(height) FROM blocks)
        UNION ALL
        SELECT p.id, p.parent_id
        FROM blocks p
        INNER JOIN chain c ON p.id = c.parent_id
    )
    SELECT 1 FROM chain WHERE chain.id = b.id
)"
    };
}

/// The set of row identifiers on the canonical chain of a set of blocks.
///
/// Built once per query over a snapshot of the rows and then used as a membership test for every
/// row of that query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalChain {
    ids: HashSet<i64>,
    tip_height: Option<u64>,
}

impl CanonicalChain {
    /// Walks parent links back from every block at the maximal height.
    ///
    /// The walk stops at a block without a parent, at a parent that is not among `blocks`, or at
    /// a block already visited.
    pub fn from_blocks<'a>(blocks: impl IntoIterator<Item = &'a Block>) -> Self {
        let mut parents = HashMap::new();
        let mut tips = Vec::new();
        let mut tip_height = None;

        for block in blocks {
            parents.insert(block.id, block.parent_id);
            match tip_height {
                Some(height) if block.height < height => {}
                Some(height) if block.height == height => tips.push(block.id),
                _ => {
                    tip_height = Some(block.height);
                    tips.clear();
                    tips.push(block.id);
                }
            }
        }

        let mut ids = HashSet::with_capacity(parents.len());
        for tip in tips {
            let mut cursor = Some(tip);
            while let Some(id) = cursor {
                if !ids.insert(id) {
                    break;
                }
                cursor = parents
                    .get(&id)
                    .copied()
                    .flatten()
                    .filter(|parent| parents.contains_key(parent));
            }
        }

        Self { ids, tip_height }
    }

    /// Returns `true` if the row is on the canonical chain.
    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    /// Returns the maximal height the chain was walked from.
    pub const fn tip_height(&self) -> Option<u64> {
        self.tip_height
    }

    /// Returns the number of canonical rows.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if no row is canonical.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
