use std::collections::BTreeSet;
use thiserror::Error;

/// Errors that may occur while reading the archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The archive holds no blocks at all.
    #[error("archive database has no blocks")]
    Empty,

    /// A stored value does not fit the expected unsigned range.
    #[error("column {column} holds out of range value {value}")]
    ColumnOutOfRange {
        /// The column name.
        column: &'static str,
        /// The stored value.
        value: i64,
    },

    /// A query parameter can not be represented by the database integer type.
    #[error("parameter {name} is out of range: {value}")]
    ParameterOutOfRange {
        /// The parameter name.
        name: &'static str,
        /// The requested value.
        value: u64,
    },

    /// The archive has gaps or broken parent links in the requested range.
    #[error(transparent)]
    Inconsistent(#[from] InconsistentArchive),
}

/// The archive failed the consistency check for a height range.
///
/// Both lists hold every offending height found in the range, so missing ingestion can be told
/// apart from broken chain links.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "archive database is inconsistent between heights {min_height} and {max_height}: missing blocks {}, blocks with null parents {}",
    height_list(.missing),
    height_list(.null_parents)
)]
pub struct InconsistentArchive {
    /// Lower bound of the checked range.
    pub min_height: u64,
    /// Upper bound of the checked range.
    pub max_height: u64,
    /// Heights without any block row.
    pub missing: BTreeSet<u64>,
    /// Heights whose block has no parent link.
    pub null_parents: BTreeSet<u64>,
}

/// Renders heights as a list, the same shape they take in JSON.
fn height_list(heights: &BTreeSet<u64>) -> String {
    format!("{:?}", heights.iter().collect::<Vec<_>>())
}
