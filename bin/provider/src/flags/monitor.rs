use clap::{ArgAction, Args};
use mpp_core::MonitorConfig;
use std::time::Duration;
use url::Url;

/// Archive trust monitor arguments.
#[derive(Args, Debug, Clone)]
pub struct MonitorArgs {
    /// Comma separated GraphQL endpoints of the nodes the archive is compared against.
    #[arg(long = "check-nodes", env = "CHECK_NODES", value_delimiter = ',')]
    pub check_nodes: Vec<Url>,

    /// Minutes between two archive checks.
    #[arg(
        long = "archive-db-check-interval",
        env = "ARCHIVE_DB_CHECK_INTERVAL",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub check_interval_minutes: u64,

    /// Number of blocks the archive may fall behind the check nodes and still be trusted.
    #[arg(
        long = "archive-db-recency-threshold",
        env = "ARCHIVE_DB_RECENCY_THRESHOLD",
        default_value_t = 30
    )]
    pub recency_threshold: u64,

    /// Number of heights below the archive head checked for missing blocks and null parents.
    #[arg(
        long = "archive-db-window",
        env = "ARCHIVE_DB_CHECK_WINDOW",
        default_value_t = MonitorConfig::DEFAULT_WINDOW,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub window: u64,

    /// Seconds to wait for a check node before counting it as failed.
    #[arg(
        long = "node-timeout-secs",
        env = "CHECK_NODE_TIMEOUT_SECS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub node_timeout_secs: u64,

    /// Whether the archive is trusted before the first check completes.
    #[arg(
        long = "trust-archive-database-height",
        env = "TRUST_ARCHIVE_DATABASE_HEIGHT",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub trust_archive_database_height: bool,
}

impl MonitorArgs {
    /// Returns the [`MonitorConfig`] described by the arguments.
    pub const fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            interval: Duration::from_secs(self.check_interval_minutes.saturating_mul(60)),
            recency_threshold: self.recency_threshold,
            window: self.window,
            node_timeout: Duration::from_secs(self.node_timeout_secs),
        }
    }
}
