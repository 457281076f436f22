//! The process wide trust flag.
//!
//! There is exactly one [`TrustWriter`], owned by the monitor, and any number of [`TrustHandle`]
//! readers. The flag itself is an atomic so the request path never takes a lock; the details of
//! the last evaluation travel over a `watch` channel.

use derive_more::Display;
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::SystemTime,
};
use tokio::sync::watch;
use tracing::{info, warn};

/// Which checks failed in a monitor cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckFailures {
    /// The archive is behind the network by at least the recency threshold.
    pub behind: bool,
    /// The trailing window has missing heights.
    pub missing_blocks: bool,
    /// The trailing window has blocks without a parent.
    pub null_parents: bool,
}

impl CheckFailures {
    /// Returns `true` if any check failed.
    pub const fn any(&self) -> bool {
        self.behind || self.missing_blocks || self.null_parents
    }
}

/// Why the trust flag holds its value.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum TrustReason {
    /// The configured startup value. No cycle has completed yet.
    #[display("bootstrap")]
    Bootstrap,
    /// Every check passed.
    #[display("verified")]
    Verified,
    /// No node returned a height, so freshness can not be verified.
    #[display("nodes unreachable")]
    NodesUnreachable,
    /// At least one check failed.
    #[display(
        "checks failed (behind: {}, missing blocks: {}, null parents: {})",
        _0.behind,
        _0.missing_blocks,
        _0.null_parents
    )]
    ChecksFailed(CheckFailures),
}

/// The outcome of the last evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustEvaluation {
    /// Whether recency sensitive requests may be served.
    pub trusted: bool,
    /// Why.
    pub reason: TrustReason,
    /// When the evaluation was made.
    pub evaluated_at: SystemTime,
}

impl TrustEvaluation {
    /// Creates an evaluation made now.
    pub fn now(trusted: bool, reason: TrustReason) -> Self {
        Self { trusted, reason, evaluated_at: SystemTime::now() }
    }
}

/// Creates the trust state with its bootstrap value.
pub fn trust_state(initial: bool) -> (TrustWriter, TrustHandle) {
    let flag = Arc::new(AtomicBool::new(initial));
    let (tx, rx) = watch::channel(TrustEvaluation::now(initial, TrustReason::Bootstrap));
    (TrustWriter { flag: Arc::clone(&flag), tx }, TrustHandle { flag, rx })
}

/// The single writer of the trust state.
#[derive(Debug)]
pub struct TrustWriter {
    flag: Arc<AtomicBool>,
    tx: watch::Sender<TrustEvaluation>,
}

impl TrustWriter {
    /// Publishes a new evaluation.
    pub fn record(&self, evaluation: TrustEvaluation) {
        let previous = self.flag.swap(evaluation.trusted, Ordering::AcqRel);
        if previous != evaluation.trusted {
            if evaluation.trusted {
                info!(target: "trust_state", reason = %evaluation.reason, "Archive became trusted");
            } else {
                warn!(target: "trust_state", reason = %evaluation.reason, "Archive became untrusted");
            }
        }
        self.tx.send_replace(evaluation);
    }

    /// Returns a new reader.
    pub fn handle(&self) -> TrustHandle {
        TrustHandle { flag: Arc::clone(&self.flag), rx: self.tx.subscribe() }
    }
}

/// A reader of the trust state.
#[derive(Debug, Clone)]
pub struct TrustHandle {
    flag: Arc<AtomicBool>,
    rx: watch::Receiver<TrustEvaluation>,
}

impl TrustHandle {
    /// Returns the current verdict without blocking.
    pub fn is_trusted(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Returns the last published evaluation.
    pub fn last_evaluation(&self) -> TrustEvaluation {
        *self.rx.borrow()
    }

    /// Waits for the next evaluation. Returns `None` once the writer is gone.
    pub async fn changed(&mut self) -> Option<TrustEvaluation> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_value() {
        let (_writer, handle) = trust_state(true);
        assert!(handle.is_trusted());
        assert_eq!(handle.last_evaluation().reason, TrustReason::Bootstrap);

        let (_writer, handle) = trust_state(false);
        assert!(!handle.is_trusted());
    }

    #[tokio::test]
    async fn test_readers_observe_writes() {
        let (writer, mut handle) = trust_state(true);
        let other = writer.handle();

        writer.record(TrustEvaluation::now(false, TrustReason::NodesUnreachable));

        assert!(!handle.is_trusted());
        assert!(!other.is_trusted());
        let evaluation = handle.changed().await.unwrap();
        assert_eq!(evaluation.reason, TrustReason::NodesUnreachable);
        assert_eq!(other.last_evaluation().reason, TrustReason::NodesUnreachable);
    }

    #[tokio::test]
    async fn test_changed_ends_with_writer() {
        let (writer, mut handle) = trust_state(true);
        drop(writer);
        assert_eq!(handle.changed().await, None);
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(TrustReason::NodesUnreachable.to_string(), "nodes unreachable");
        let failures = CheckFailures { behind: true, ..Default::default() };
        assert_eq!(
            TrustReason::ChecksFailed(failures).to_string(),
            "checks failed (behind: true, missing blocks: false, null parents: false)"
        );
    }

    #[test]
    fn test_check_failures() {
        assert!(!CheckFailures::default().any());
        assert!(CheckFailures { null_parents: true, ..Default::default() }.any());
    }
}
