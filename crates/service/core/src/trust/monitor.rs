//! Periodic evaluation of the archive against live nodes.

use crate::{
    CheckFailures, NodeHeightError, NodeHeightSource, TrustEvaluation, TrustHandle, TrustReason,
    TrustWriter, trust::Metrics,
};
use futures::future::join_all;
use mpp_archive::{ArchiveError, ArchiveReader, ChainConsistencyValidator};
use std::{sync::Arc, time::Duration};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Settings of the [`TrustStateMonitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Time between two cycles.
    pub interval: Duration,
    /// The archive is untrusted once the network is this many blocks ahead of it.
    pub recency_threshold: u64,
    /// Number of heights below the archive head checked for gaps.
    pub window: u64,
    /// Deadline of a single node request.
    pub node_timeout: Duration,
}

impl MonitorConfig {
    /// Heights checked below the archive head by default.
    pub const DEFAULT_WINDOW: u64 = 7_500;
}

/// Keeps the trust state current.
///
/// Each cycle reads the archive head, asks every node for its best chain height and checks the
/// trailing window below the head for gaps. Cycles run back to back on the interval and never
/// overlap. A cycle that fails to read the archive leaves the previous verdict in place.
#[derive(Debug)]
pub struct TrustStateMonitor<A: ?Sized> {
    archive: Arc<A>,
    nodes: Vec<Arc<dyn NodeHeightSource>>,
    writer: TrustWriter,
    config: MonitorConfig,
    cancel_token: CancellationToken,
}

impl<A> TrustStateMonitor<A>
where
    A: ArchiveReader + ?Sized,
{
    /// Creates a new [`TrustStateMonitor`] owning the single writer of the trust state.
    pub fn new(
        archive: Arc<A>,
        nodes: Vec<Arc<dyn NodeHeightSource>>,
        writer: TrustWriter,
        config: MonitorConfig,
        cancel_token: CancellationToken,
    ) -> Self {
        Metrics::init(writer.handle().is_trusted());
        Self { archive, nodes, writer, config, cancel_token }
    }

    /// Returns a reader of the state this monitor maintains.
    pub fn handle(&self) -> TrustHandle {
        self.writer.handle()
    }

    /// Runs cycles until cancelled. The first cycle starts immediately.
    pub async fn run(self) {
        info!(
            target: "trust_monitor",
            interval = ?self.config.interval,
            recency_threshold = self.config.recency_threshold,
            nodes = self.nodes.len(),
            "Started archive trust monitor"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!(target: "trust_monitor", "Canceled archive trust monitor");
                    break;
                }

                _ = async {
                    ticker.tick().await;
                    self.run_cycle().await;
                } => {}
            }
        }

        info!(target: "trust_monitor", "Stopped archive trust monitor");
    }

    /// Runs one cycle and publishes its verdict.
    ///
    /// Returns `None` if the archive could not be read, in which case nothing is published.
    pub async fn run_cycle(&self) -> Option<TrustEvaluation> {
        match self.evaluate().await {
            Ok(evaluation) => {
                self.writer.record(evaluation);
                Metrics::record_cycle(Some(&evaluation));
                Some(evaluation)
            }
            Err(err) => {
                error!(
                    target: "trust_monitor",
                    %err,
                    trusted = self.writer.handle().is_trusted(),
                    "Failed to evaluate archive, keeping previous trust state"
                );
                Metrics::record_cycle(None);
                None
            }
        }
    }

    async fn evaluate(&self) -> Result<TrustEvaluation, ArchiveError> {
        let local_height = self.archive.latest_block().await?.height;
        let remote_height = self.best_chain_height().await;
        Metrics::record_heights(local_height, remote_height);

        let Some(remote_height) = remote_height else {
            error!(
                target: "trust_monitor",
                local_height,
                nodes = self.nodes.len(),
                "No node returned a best chain height, archive is not trusted"
            );
            return Ok(TrustEvaluation::now(false, TrustReason::NodesUnreachable));
        };

        let behind = remote_height
            .checked_sub(self.config.recency_threshold)
            .is_some_and(|floor| floor >= local_height);

        let min_height = local_height.saturating_sub(self.config.window);
        let report = ChainConsistencyValidator::new(&*self.archive)
            .gap_report(min_height, local_height)
            .await?;

        let failures = CheckFailures {
            behind,
            missing_blocks: !report.missing_tolerated(),
            null_parents: !report.null_parents_tolerated(),
        };

        if failures.any() {
            error!(
                target: "trust_monitor",
                local_height,
                remote_height,
                threshold = self.config.recency_threshold,
                behind,
                missing = ?report.missing,
                null_parents = ?report.null_parents,
                "Archive is not trusted"
            );
            return Ok(TrustEvaluation::now(false, TrustReason::ChecksFailed(failures)));
        }

        info!(
            target: "trust_monitor",
            local_height,
            remote_height,
            min_height,
            "Archive is trusted"
        );
        Ok(TrustEvaluation::now(true, TrustReason::Verified))
    }

    /// Highest height any node returned. Nodes are queried concurrently.
    ///
    /// A node reporting height 0 has no best chain yet and counts as not answering.
    async fn best_chain_height(&self) -> Option<u64> {
        let timeout = self.config.node_timeout;
        let answers = join_all(self.nodes.iter().map(|node| async move {
            let answer = tokio::time::timeout(timeout, node.best_chain_height())
                .await
                .unwrap_or(Err(NodeHeightError::Timeout(timeout)));
            (node, answer)
        }))
        .await;

        answers
            .into_iter()
            .filter_map(|(node, answer)| match answer {
                Ok(0) => {
                    warn!(target: "trust_monitor", node = %node.url(), "Node reported no best chain");
                    Metrics::record_node_failure(node.url());
                    None
                }
                Ok(height) => {
                    debug!(target: "trust_monitor", node = %node.url(), height, "Got best chain height");
                    Some(height)
                }
                Err(err) => {
                    warn!(
                        target: "trust_monitor",
                        node = %node.url(),
                        %err,
                        "Failed to get best chain height"
                    );
                    Metrics::record_node_failure(node.url());
                    None
                }
            })
            .max()
    }
}
