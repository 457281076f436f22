use crate::TrustHandle;
use thiserror::Error;
use tracing::debug;

/// Rejection returned by the [`TrustGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TrustError {
    /// The monitor does not trust the archive.
    #[error(
        "Service Unavailable: Archive database height not trusted since it is off by more than {threshold} blocks"
    )]
    Untrusted {
        /// The configured recency threshold, in blocks.
        threshold: u64,
    },
}

/// Request time check of the trust state.
///
/// Only requests whose answer depends on the archive being close to the chain head go through
/// the gate. Lookups of fixed historical data stay available while the archive is untrusted.
#[derive(Debug, Clone)]
pub struct TrustGate {
    trust: TrustHandle,
    recency_threshold: u64,
}

impl TrustGate {
    /// Creates a new [`TrustGate`].
    pub const fn new(trust: TrustHandle, recency_threshold: u64) -> Self {
        Self { trust, recency_threshold }
    }

    /// Fails if the archive is not trusted. Never touches the archive.
    pub fn check(&self) -> Result<(), TrustError> {
        if self.trust.is_trusted() {
            return Ok(());
        }
        debug!(target: "trust_gate", "Rejected request, archive is not trusted");
        Err(TrustError::Untrusted { threshold: self.recency_threshold })
    }
}
