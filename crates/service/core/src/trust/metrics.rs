use crate::TrustEvaluation;

#[derive(Debug, Clone)]
pub(crate) struct Metrics;

impl Metrics {
    pub(crate) const ARCHIVE_TRUSTED: &'static str = "mpp_archive_trusted";
    pub(crate) const TRUST_CYCLES_TOTAL: &'static str = "mpp_trust_cycles_total";
    pub(crate) const ARCHIVE_LOCAL_HEIGHT: &'static str = "mpp_archive_local_height";
    pub(crate) const ARCHIVE_REMOTE_HEIGHT: &'static str = "mpp_archive_remote_height";
    pub(crate) const CHECK_NODE_FAILURES_TOTAL: &'static str = "mpp_check_node_failures_total";

    pub(crate) fn init(initial: bool) {
        Self::describe();
        Self::zero(initial);
    }

    fn describe() {
        metrics::describe_gauge!(
            Self::ARCHIVE_TRUSTED,
            "Whether the archive is trusted to serve recency sensitive requests (1) or not (0)",
        );

        metrics::describe_counter!(
            Self::TRUST_CYCLES_TOTAL,
            metrics::Unit::Count,
            "Total number of archive trust cycles by outcome",
        );

        metrics::describe_gauge!(
            Self::ARCHIVE_LOCAL_HEIGHT,
            metrics::Unit::Count,
            "Maximal block height in the archive at the last trust cycle",
        );

        metrics::describe_gauge!(
            Self::ARCHIVE_REMOTE_HEIGHT,
            metrics::Unit::Count,
            "Maximal best chain height reported by the check nodes at the last trust cycle",
        );

        metrics::describe_counter!(
            Self::CHECK_NODE_FAILURES_TOTAL,
            metrics::Unit::Count,
            "Total number of failed best chain height requests by node",
        );
    }

    fn zero(initial: bool) {
        metrics::gauge!(Self::ARCHIVE_TRUSTED).set(if initial { 1.0 } else { 0.0 });

        for outcome in ["trusted", "untrusted", "error"] {
            metrics::counter!(Self::TRUST_CYCLES_TOTAL, "outcome" => outcome).increment(0);
        }

        metrics::gauge!(Self::ARCHIVE_LOCAL_HEIGHT).set(0.0);

        metrics::gauge!(Self::ARCHIVE_REMOTE_HEIGHT).set(0.0);
    }

    pub(crate) fn record_heights(local: u64, remote: Option<u64>) {
        metrics::gauge!(Self::ARCHIVE_LOCAL_HEIGHT).set(local as f64);
        if let Some(remote) = remote {
            metrics::gauge!(Self::ARCHIVE_REMOTE_HEIGHT).set(remote as f64);
        }
    }

    pub(crate) fn record_node_failure(node: &url::Url) {
        metrics::counter!(Self::CHECK_NODE_FAILURES_TOTAL, "node" => node.to_string())
            .increment(1);
    }

    pub(crate) fn record_cycle(result: Option<&TrustEvaluation>) {
        let outcome = match result {
            Some(evaluation) if evaluation.trusted => "trusted",
            Some(_) => "untrusted",
            None => "error",
        };
        metrics::counter!(Self::TRUST_CYCLES_TOTAL, "outcome" => outcome).increment(1);

        if let Some(evaluation) = result {
            metrics::gauge!(Self::ARCHIVE_TRUSTED).set(if evaluation.trusted { 1.0 } else { 0.0 });
        }
    }
}
