//! Gap and parent link checks over a height range.

use crate::{ArchiveError, ArchiveReader, ChainGapReport};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Checks that the archive holds a gap-free chain over a height range.
///
/// A range starting at genesis tolerates a single missing height `0` and a single null parent at
/// height `1`. A range starting above genesis tolerates nothing.
#[derive(Debug)]
pub struct ChainConsistencyValidator<'a, A: ?Sized> {
    archive: &'a A,
}

impl<'a, A> ChainConsistencyValidator<'a, A>
where
    A: ArchiveReader + ?Sized,
{
    /// Creates a validator reading from `archive`.
    pub const fn new(archive: &'a A) -> Self {
        Self { archive }
    }

    /// Returns every height in `[min_height, max_height]` without a block.
    pub async fn find_missing_heights(
        &self,
        min_height: u64,
        max_height: u64,
    ) -> Result<BTreeSet<u64>, ArchiveError> {
        self.archive.missing_heights(min_height, max_height).await
    }

    /// Returns every height above genesis in `[min_height, max_height]` whose block has no
    /// parent link.
    pub async fn find_null_parent_heights(
        &self,
        min_height: u64,
        max_height: u64,
    ) -> Result<BTreeSet<u64>, ArchiveError> {
        self.archive.null_parent_heights(min_height, max_height).await
    }

    /// Collects both lists for the range.
    pub async fn gap_report(
        &self,
        min_height: u64,
        max_height: u64,
    ) -> Result<ChainGapReport, ArchiveError> {
        let missing = self.find_missing_heights(min_height, max_height).await?;
        let null_parents = self.find_null_parent_heights(min_height, max_height).await?;
        Ok(ChainGapReport { min_height, max_height, missing, null_parents })
    }

    /// Fails with [`ArchiveError::Inconsistent`] naming every offending height if the range is
    /// not gap-free.
    pub async fn validate_consistency(
        &self,
        min_height: u64,
        max_height: u64,
    ) -> Result<(), ArchiveError> {
        let report = self.gap_report(min_height, max_height).await?;
        if !report.is_consistent() {
            warn!(
                target: "consistency",
                min_height,
                max_height,
                missing = ?report.missing,
                null_parents = ?report.null_parents,
                "Archive range failed consistency check"
            );
        }
        report.into_result()?;

        debug!(target: "consistency", min_height, max_height, "Archive range is consistent");
        Ok(())
    }
}
