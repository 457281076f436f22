use jsonrpsee::types::{
    ErrorObject, ErrorObjectOwned,
    error::{INTERNAL_ERROR_CODE, INTERNAL_ERROR_MSG, INVALID_PARAMS_CODE},
};
use mpp_archive::{ArchiveError, InconsistentArchive};
use mpp_consensus::ConsensusError;
use mpp_core::{EngineError, TrustError};
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::error;

/// The requested epoch has no blocks in the archive yet.
pub const NOT_FOUND_CODE: i32 = -32001;
/// The archive has gaps or broken parent links in the requested range.
pub const INCONSISTENT_ARCHIVE_CODE: i32 = -32002;
/// A ledger hash spans more than one epoch.
pub const AMBIGUOUS_EPOCH_CODE: i32 = -32003;
/// The archive is not trusted.
pub const SERVICE_UNAVAILABLE_CODE: i32 = -32004;

/// Failure of an API method.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request failed in the engine.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The trust gate rejected the request.
    #[error(transparent)]
    Untrusted(#[from] TrustError),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InconsistentData<'a> {
    min_height: u64,
    max_height: u64,
    missing: &'a BTreeSet<u64>,
    null_parents: &'a BTreeSet<u64>,
}

impl<'a> From<&'a InconsistentArchive> for InconsistentData<'a> {
    fn from(err: &'a InconsistentArchive) -> Self {
        Self {
            min_height: err.min_height,
            max_height: err.max_height,
            missing: &err.missing,
            null_parents: &err.null_parents,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AmbiguousEpochData {
    epoch: u64,
    next_epoch: u64,
    user_specified_epoch: Option<u64>,
    min_slot: u64,
    max_slot: u64,
}

impl From<ApiError> for ErrorObjectOwned {
    fn from(err: ApiError) -> Self {
        let message = err.to_string();
        match err {
            ApiError::Untrusted(_) => {
                ErrorObject::owned(SERVICE_UNAVAILABLE_CODE, message, None::<()>)
            }
            ApiError::Engine(EngineError::Archive(ArchiveError::Inconsistent(inconsistent))) => {
                ErrorObject::owned(
                    INCONSISTENT_ARCHIVE_CODE,
                    message,
                    Some(InconsistentData::from(&inconsistent)),
                )
            }
            ApiError::Engine(EngineError::Consensus(ConsensusError::AmbiguousEpoch {
                epoch,
                next_epoch,
                user_specified_epoch,
                min_slot,
                max_slot,
            })) => ErrorObject::owned(
                AMBIGUOUS_EPOCH_CODE,
                message,
                Some(AmbiguousEpochData {
                    epoch,
                    next_epoch,
                    user_specified_epoch,
                    min_slot,
                    max_slot,
                }),
            ),
            ApiError::Engine(
                EngineError::Consensus(
                    ConsensusError::UnknownFork(_)
                    | ConsensusError::ForkNotActivated(_)
                    | ConsensusError::EpochOutOfRange(_),
                )
                | EngineError::InvalidHeightRange { .. }
                | EngineError::Archive(ArchiveError::ParameterOutOfRange { .. }),
            ) => ErrorObject::owned(INVALID_PARAMS_CODE, message, None::<()>),
            ApiError::Engine(EngineError::EpochNotReached { .. }) => {
                ErrorObject::owned(NOT_FOUND_CODE, message, None::<()>)
            }
            ApiError::Engine(err) => {
                error!(target: "archive_rpc", %err, "Request failed");
                ErrorObject::owned(INTERNAL_ERROR_CODE, INTERNAL_ERROR_MSG, None::<()>)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpp_consensus::Fork;

    fn object(err: impl Into<ApiError>) -> ErrorObjectOwned {
        err.into().into()
    }

    #[test]
    fn test_untrusted() {
        let err = object(TrustError::Untrusted { threshold: 30 });
        assert_eq!(err.code(), SERVICE_UNAVAILABLE_CODE);
        assert_eq!(
            err.message(),
            "Service Unavailable: Archive database height not trusted since it is off by more than 30 blocks"
        );
    }

    #[test]
    fn test_inconsistent_archive_lists_heights() {
        let inconsistent = InconsistentArchive {
            min_height: 10,
            max_height: 20,
            missing: BTreeSet::from([12, 13]),
            null_parents: BTreeSet::from([15]),
        };
        let err = object(EngineError::from(ArchiveError::from(inconsistent)));
        assert_eq!(err.code(), INCONSISTENT_ARCHIVE_CODE);
        assert!(err.message().contains("missing blocks [12, 13]"));
        assert!(err.message().contains("blocks with null parents [15]"));

        let data: serde_json::Value = serde_json::from_str(err.data().unwrap().get()).unwrap();
        assert_eq!(
            data,
            serde_json::json!({
                "minHeight": 10,
                "maxHeight": 20,
                "missing": [12, 13],
                "nullParents": [15],
            })
        );
    }

    #[test]
    fn test_fork_errors_are_invalid_params() {
        let err = object(EngineError::from(ConsensusError::UnknownFork(3)));
        assert_eq!(err.code(), INVALID_PARAMS_CODE);
        assert_eq!(err.message(), "Fork 3 not supported");

        let err = object(EngineError::from(ConsensusError::ForkNotActivated(Fork::Mesa)));
        assert_eq!(err.code(), INVALID_PARAMS_CODE);
        assert_eq!(err.message(), "Fork 2 not activated");
    }

    #[test]
    fn test_epoch_not_reached() {
        let err = object(EngineError::EpochNotReached { epoch: 90, fork: Fork::Berkeley });
        assert_eq!(err.code(), NOT_FOUND_CODE);
    }

    #[test]
    fn test_ambiguous_epoch_carries_slots() {
        let err = object(EngineError::from(ConsensusError::AmbiguousEpoch {
            epoch: 3,
            next_epoch: 5,
            user_specified_epoch: Some(7),
            min_slot: 21_000,
            max_slot: 35_000,
        }));
        assert_eq!(err.code(), AMBIGUOUS_EPOCH_CODE);
        let data: serde_json::Value = serde_json::from_str(err.data().unwrap().get()).unwrap();
        assert_eq!(data["nextEpoch"], 5);
        assert_eq!(data["userSpecifiedEpoch"], 7);
    }

    #[test]
    fn test_database_errors_are_hidden() {
        let err = object(EngineError::from(ArchiveError::Empty));
        assert_eq!(err.code(), INTERNAL_ERROR_CODE);
        assert_eq!(err.message(), INTERNAL_ERROR_MSG);
    }
}
